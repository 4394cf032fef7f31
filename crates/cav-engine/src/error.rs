//! # Engine Error Types
//!
//! Every engine entry point returns [`EngineError`]. A returned error means
//! the operation was aborted as a whole: no handle was stored, no grant was
//! made, and nothing was appended to the audit ledger.

use cav_core::{Actor, PrincipalId, ValidationError};
use cav_fhe::{CoprocessorError, HandleId, PolicyError};
use thiserror::Error;

use crate::authority::Role;
use crate::permissions::Capability;

/// Errors returned by engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Out-of-bound value, malformed range, rejected proof, or an empty or
    /// oversized batch.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The principal already has an active submission for the slot.
    #[error("attribute already submitted by {principal}")]
    AlreadySubmitted {
        /// The submitting principal.
        principal: PrincipalId,
    },

    /// The principal's verification was already finalized.
    #[error("verification for {principal} already finalized")]
    AlreadyFinalized {
        /// The subject principal.
        principal: PrincipalId,
    },

    /// The member or entry already exists.
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Missing principal record, range, or ledger index.
    #[error("not found: {0}")]
    NotFound(String),

    /// The actor lacks a capability on a handle. Raised at first use of the
    /// handle, never at grant time.
    #[error("access denied: {actor} lacks {capability} capability on {handle}")]
    AccessDenied {
        /// The actor that attempted the operation.
        actor: Actor,
        /// The missing capability.
        capability: Capability,
        /// The handle involved.
        handle: HandleId,
    },

    /// The caller lacks the role the operation requires.
    #[error("unauthorized: {caller} is not {role}")]
    Unauthorized {
        /// The rejected caller.
        caller: Actor,
        /// The role that was required.
        role: Role,
    },

    /// A mutating call was made while the engine is paused.
    #[error("engine is paused")]
    Paused,
}

/// Fieldless discriminant of [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`EngineError::InvalidInput`].
    InvalidInput,
    /// See [`EngineError::AlreadySubmitted`].
    AlreadySubmitted,
    /// See [`EngineError::AlreadyFinalized`].
    AlreadyFinalized,
    /// See [`EngineError::AlreadyExists`].
    AlreadyExists,
    /// See [`EngineError::NotFound`].
    NotFound,
    /// See [`EngineError::AccessDenied`].
    AccessDenied,
    /// See [`EngineError::Unauthorized`].
    Unauthorized,
    /// See [`EngineError::Paused`].
    Paused,
}

impl EngineError {
    /// The error's kind, for matching without fields.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::AlreadySubmitted { .. } => ErrorKind::AlreadySubmitted,
            Self::AlreadyFinalized { .. } => ErrorKind::AlreadyFinalized,
            Self::AlreadyExists(_) => ErrorKind::AlreadyExists,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::AccessDenied { .. } => ErrorKind::AccessDenied,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Paused => ErrorKind::Paused,
        }
    }
}

impl From<CoprocessorError> for EngineError {
    fn from(err: CoprocessorError) -> Self {
        match err {
            CoprocessorError::UnknownHandle(id) => Self::NotFound(format!("ciphertext {id}")),
            other => Self::InvalidInput(other.to_string()),
        }
    }
}

impl From<PolicyError> for EngineError {
    fn from(err: PolicyError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidInput(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cav_fhe::ValueKind;

    #[test]
    fn coprocessor_rejections_are_invalid_input() {
        let err: EngineError = CoprocessorError::ProofRejected("bad".into()).into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err: EngineError = CoprocessorError::BoundViolation { min: 1, max: 120 }.into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(err.to_string().contains("[1, 120]"));
    }

    #[test]
    fn policy_rejection_is_invalid_input() {
        let err: EngineError = PolicyError::MockBackendRejected {
            backend: "mock-plaintext".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn kind_mismatch_message_names_both_kinds() {
        let mock = cav_fhe::MockCoprocessor::new();
        let ctx = cav_core::ContextId::new();
        let handle = cav_fhe::Coprocessor::trivial_bool(&mock, &ctx, true).unwrap();
        let err: EngineError = CoprocessorError::KindMismatch {
            handle: handle.id(),
            expected: ValueKind::Uint8,
            actual: ValueKind::Bool,
        }
        .into();
        let msg = err.to_string();
        assert!(msg.contains("uint8"));
        assert!(msg.contains("bool"));
    }

    #[test]
    fn unauthorized_message() {
        let caller = PrincipalId::new("mallory").unwrap();
        let err = EngineError::Unauthorized {
            caller: Actor::from(caller),
            role: Role::Verifier,
        };
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        assert_eq!(err.to_string(), "unauthorized: principal:mallory is not verifier");
    }

    #[test]
    fn paused_message() {
        assert_eq!(EngineError::Paused.to_string(), "engine is paused");
    }
}
