//! # Error Hierarchy
//!
//! Errors owned by the leaf crate, built with `thiserror`. Each carries the
//! offending input so that operators can diagnose a rejection without
//! re-running the call.

use thiserror::Error;

/// Errors during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed during canonicalization.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Validation errors for identity newtypes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Principal identifiers must be 1-128 printable ASCII characters.
    #[error("invalid principal id: \"{0}\" (expected 1-128 printable ASCII characters, no whitespace)")]
    InvalidPrincipal(String),

    /// Attribute slot names must be non-empty lowercase identifiers.
    #[error("invalid attribute slot: \"{0}\" (expected lowercase [a-z0-9_], 1-32 characters)")]
    InvalidSlot(String),

    /// Timestamp string is not valid UTC ISO 8601.
    #[error("invalid timestamp: \"{value}\" ({reason})")]
    InvalidTimestamp {
        /// The string that failed to parse.
        value: String,
        /// Why it was rejected.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_rejected_display() {
        let err = CanonicalizationError::FloatRejected(2.5);
        let msg = err.to_string();
        assert!(msg.contains("float values are not permitted"));
        assert!(msg.contains("2.5"));
    }

    #[test]
    fn invalid_principal_display() {
        let err = ValidationError::InvalidPrincipal("a b".to_string());
        assert!(err.to_string().contains("a b"));
    }

    #[test]
    fn invalid_timestamp_display() {
        let err = ValidationError::InvalidTimestamp {
            value: "yesterday".to_string(),
            reason: "not RFC 3339".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("yesterday"));
        assert!(msg.contains("not RFC 3339"));
    }
}
