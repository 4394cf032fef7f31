//! # Named Ranges
//!
//! Owner-authored `{min, max, label}` ranges, stored in creation order and
//! addressed by their position. Deactivated ranges keep their id; lookups
//! treat them as absent.

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Position of a named range in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RangeId(pub u32);

impl std::fmt::Display for RangeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "range:{}", self.0)
    }
}

/// An inclusive attribute range with a human-readable label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedRange {
    /// Inclusive lower bound.
    pub min: u8,
    /// Inclusive upper bound.
    pub max: u8,
    /// Label, e.g. `"WorkingAge"`.
    pub label: String,
    /// Whether the range can still be used.
    pub active: bool,
}

/// List-backed store of named ranges.
#[derive(Debug, Clone, Default)]
pub struct RangeRegistry {
    ranges: Vec<NamedRange>,
}

impl RangeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The id the next created range will receive.
    pub fn next_id(&self) -> RangeId {
        RangeId(self.ranges.len() as u32)
    }

    /// Append a range. Bounds must already be validated by the caller.
    pub fn create(&mut self, min: u8, max: u8, label: String) -> RangeId {
        let id = self.next_id();
        self.ranges.push(NamedRange {
            min,
            max,
            label,
            active: true,
        });
        id
    }

    /// Look up an active range.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for unknown or deactivated ids.
    pub fn active(&self, id: RangeId) -> Result<&NamedRange, EngineError> {
        match self.ranges.get(id.0 as usize) {
            Some(range) if range.active => Ok(range),
            _ => Err(EngineError::NotFound(format!("active {id}"))),
        }
    }

    /// Look up a range whether active or not.
    pub fn get(&self, id: RangeId) -> Option<&NamedRange> {
        self.ranges.get(id.0 as usize)
    }

    /// Deactivate a range.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for unknown or already inactive ids.
    pub fn deactivate(&mut self, id: RangeId) -> Result<(), EngineError> {
        match self.ranges.get_mut(id.0 as usize) {
            Some(range) if range.active => {
                range.active = false;
                Ok(())
            }
            _ => Err(EngineError::NotFound(format!("active {id}"))),
        }
    }

    /// Every range with its id, in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (RangeId, &NamedRange)> {
        self.ranges
            .iter()
            .enumerate()
            .map(|(i, r)| (RangeId(i as u32), r))
    }

    /// Number of ranges ever created.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether no range was ever created.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn ids_follow_creation_order() {
        let mut reg = RangeRegistry::new();
        assert_eq!(reg.create(18, 65, "WorkingAge".into()), RangeId(0));
        assert_eq!(reg.create(65, 120, "Senior".into()), RangeId(1));
        assert_eq!(reg.active(RangeId(1)).unwrap().label, "Senior");
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn deactivated_range_is_not_found() {
        let mut reg = RangeRegistry::new();
        let id = reg.create(18, 65, "WorkingAge".into());
        reg.deactivate(id).unwrap();
        assert_eq!(reg.active(id).unwrap_err().kind(), ErrorKind::NotFound);
        assert_eq!(reg.deactivate(id).unwrap_err().kind(), ErrorKind::NotFound);
        assert!(!reg.get(id).unwrap().active);
    }

    #[test]
    fn unknown_range_is_not_found() {
        let reg = RangeRegistry::new();
        assert!(reg.active(RangeId(3)).is_err());
        assert!(reg.get(RangeId(3)).is_none());
    }
}
