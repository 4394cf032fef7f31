//! # Identity Newtypes
//!
//! Distinct types for the identities that touch the engine. A
//! [`PrincipalId`] submits attributes and holds roles; a [`ContextId`]
//! names an engine instance that handles are bound to. [`Actor`] is the
//! sum of the two, used wherever either may appear (compute grants, audit
//! entries).
//!
//! ## Validation
//!
//! String-based identifiers validate format at construction time.
//! UUID-based identifiers are always valid by construction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Identity of a principal: an account that submits attributes, is the
/// subject of verification, or holds an authority role.
///
/// Format: 1-128 printable ASCII characters without whitespace. Addresses
/// (`0x...`) and DIDs (`did:method:id`) both fit.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PrincipalId(String);

impl PrincipalId {
    /// Maximum accepted length in bytes.
    pub const MAX_LEN: usize = 128;

    /// Create a principal identifier, validating format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidPrincipal`] if the value is empty,
    /// too long, or contains whitespace or non-printable characters.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        if s.is_empty() || s.len() > Self::MAX_LEN || !s.chars().all(|c| c.is_ascii_graphic()) {
            return Err(ValidationError::InvalidPrincipal(s));
        }
        Ok(Self(s))
    }

    /// Access the identifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for PrincipalId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PrincipalId> for String {
    fn from(value: PrincipalId) -> Self {
        value.0
    }
}

impl std::fmt::Display for PrincipalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of an engine instance. Every encrypted handle is bound to
/// exactly one context and is meaningless outside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContextId(Uuid);

impl ContextId {
    /// Create a new random context identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a context identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContextId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "context:{}", self.0)
    }
}

/// Either a principal or an engine context.
///
/// Compute capability is normally held by a context; audit entries record
/// whichever actor caused the action.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum Actor {
    /// A principal acting on its own behalf.
    Principal(PrincipalId),
    /// An engine instance acting as the invoking context.
    Context(ContextId),
}

impl From<PrincipalId> for Actor {
    fn from(p: PrincipalId) -> Self {
        Actor::Principal(p)
    }
}

impl From<&PrincipalId> for Actor {
    fn from(p: &PrincipalId) -> Self {
        Actor::Principal(p.clone())
    }
}

impl From<ContextId> for Actor {
    fn from(c: ContextId) -> Self {
        Actor::Context(c)
    }
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Actor::Principal(p) => write!(f, "principal:{p}"),
            Actor::Context(c) => write!(f, "{c}"),
        }
    }
}

/// Name of a per-principal attribute slot (e.g. `age`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AttributeSlot(String);

impl AttributeSlot {
    /// Create a slot name, validating format.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidSlot`] unless the name is 1-32
    /// characters of `[a-z0-9_]`.
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let s = value.into();
        let ok = !s.is_empty()
            && s.len() <= 32
            && s
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
        if !ok {
            return Err(ValidationError::InvalidSlot(s));
        }
        Ok(Self(s))
    }

    /// The `age` slot.
    pub fn age() -> Self {
        Self("age".to_string())
    }

    /// Access the slot name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AttributeSlot {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AttributeSlot> for String {
    fn from(value: AttributeSlot) -> Self {
        value.0
    }
}

impl std::fmt::Display for AttributeSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn principal_accepts_address_and_did() {
        assert!(PrincipalId::new("0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_ok());
        assert!(PrincipalId::new("did:key:z6MkhaXgBZDvotDkL5257faiztiGiC2QtKLGpbnnEGta2doK").is_ok());
    }

    #[test]
    fn principal_rejects_empty_whitespace_and_overlong() {
        assert!(PrincipalId::new("").is_err());
        assert!(PrincipalId::new("alice bob").is_err());
        assert!(PrincipalId::new("tab\there").is_err());
        assert!(PrincipalId::new("a".repeat(PrincipalId::MAX_LEN + 1)).is_err());
        assert!(PrincipalId::new("a".repeat(PrincipalId::MAX_LEN)).is_ok());
    }

    #[test]
    fn principal_serde_validates() {
        let ok: PrincipalId = serde_json::from_str("\"alice\"").unwrap();
        assert_eq!(ok.as_str(), "alice");
        assert!(serde_json::from_str::<PrincipalId>("\"\"").is_err());
    }

    #[test]
    fn context_ids_are_unique() {
        assert_ne!(ContextId::new(), ContextId::new());
    }

    #[test]
    fn actor_display_distinguishes_kinds() {
        let p = PrincipalId::new("alice").unwrap();
        assert_eq!(Actor::from(&p).to_string(), "principal:alice");
        let c = ContextId::new();
        assert!(Actor::from(c).to_string().starts_with("context:"));
    }

    #[test]
    fn actor_serde_roundtrip() {
        let actor = Actor::Principal(PrincipalId::new("bob").unwrap());
        let json = serde_json::to_string(&actor).unwrap();
        assert_eq!(json, r#"{"type":"principal","id":"bob"}"#);
        let back: Actor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, actor);
    }

    #[test]
    fn slot_validation() {
        assert_eq!(AttributeSlot::age().as_str(), "age");
        assert!(AttributeSlot::new("credit_score").is_ok());
        assert!(AttributeSlot::new("Age").is_err());
        assert!(AttributeSlot::new("").is_err());
    }
}
