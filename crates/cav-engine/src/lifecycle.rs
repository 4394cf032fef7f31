//! # Lifecycle Gate
//!
//! One pause flag consulted by every mutating entry point. Only the owner
//! flips it; the engine checks the role before calling in here.

use crate::error::EngineError;

/// Engine-wide pause flag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleGate {
    paused: bool,
}

impl LifecycleGate {
    /// A gate that starts open.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the gate is engaged.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Fail with [`EngineError::Paused`] while engaged.
    pub fn ensure_open(&self) -> Result<(), EngineError> {
        if self.paused {
            Err(EngineError::Paused)
        } else {
            Ok(())
        }
    }

    /// Engage the gate.
    ///
    /// # Errors
    ///
    /// [`EngineError::Paused`] if already engaged.
    pub fn pause(&mut self) -> Result<(), EngineError> {
        self.ensure_open()?;
        self.paused = true;
        Ok(())
    }

    /// Release the gate.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidInput`] if the gate is not engaged.
    pub fn unpause(&mut self) -> Result<(), EngineError> {
        if !self.paused {
            return Err(EngineError::InvalidInput("engine is not paused".into()));
        }
        self.paused = false;
        Ok(())
    }
}
