//! # Coprocessor Trait (Sealed)
//!
//! The two primitives the engine consumes from the encryption coprocessor:
//! validation of an external ciphertext + proof into a trusted handle, and
//! evaluation of homomorphic operations over handles.
//!
//! ## Sealed Trait
//!
//! Only backends defined within `cav-fhe` can implement [`Coprocessor`].
//! An external crate cannot inject a backend that mints handles for
//! ciphertexts it never validated.
//!
//! ## Contract
//!
//! - Calls are synchronous and complete within the caller's atomic step.
//! - Every operand must be bound to the `ctx` argument; otherwise the call
//!   fails with [`CoprocessorError::ContextMismatch`] and mints nothing.
//! - Each successful call returns a freshly minted handle. Handles are never
//!   reused or mutated.

use cav_core::ContextId;
use thiserror::Error;

use crate::handle::{Ebool, EncryptedHandle, Euint8, HandleId, ValueKind};
use crate::ops::{ArithOp, CompareOp, EncryptedInput, InputConstraint, LogicOp};
use crate::policy::CoprocessorBackend;

/// Errors reported by the coprocessor.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoprocessorError {
    /// The input proof did not verify against the ciphertext and context.
    #[error("input proof rejected: {0}")]
    ProofRejected(String),

    /// The plaintext fell outside the declared public bound.
    #[error("value outside declared bound [{min}, {max}]")]
    BoundViolation {
        /// Inclusive lower bound.
        min: u8,
        /// Inclusive upper bound.
        max: u8,
    },

    /// An operand is bound to a different context than the caller's.
    #[error("handle {handle} is bound to another context")]
    ContextMismatch {
        /// The offending handle.
        handle: HandleId,
    },

    /// The coprocessor has no ciphertext for this handle.
    #[error("unknown handle {0}")]
    UnknownHandle(HandleId),

    /// The ciphertext behind a handle is not of the expected kind.
    #[error("handle {handle} holds {actual}, expected {expected}")]
    KindMismatch {
        /// The offending handle.
        handle: HandleId,
        /// Kind the operation required.
        expected: ValueKind,
        /// Kind actually stored.
        actual: ValueKind,
    },
}

mod private {
    pub trait Sealed {}
}

/// Sealed interface to an encryption coprocessor.
pub trait Coprocessor: private::Sealed + Send + Sync {
    /// Which backend this is, for policy enforcement.
    fn backend(&self) -> CoprocessorBackend;

    /// Validate an externally supplied ciphertext and proof, enforcing the
    /// public bound during typed conversion, and mint a handle bound to `ctx`.
    ///
    /// # Errors
    ///
    /// [`CoprocessorError::ProofRejected`] if the proof does not bind the
    /// ciphertext to `ctx`; [`CoprocessorError::BoundViolation`] if the
    /// plaintext falls outside `constraint`.
    fn validate_input(
        &self,
        ctx: &ContextId,
        input: &EncryptedInput,
        constraint: InputConstraint,
    ) -> Result<EncryptedHandle<Euint8>, CoprocessorError>;

    /// Encode a public integer as a ciphertext usable as an operand.
    fn trivial_u8(&self, ctx: &ContextId, value: u8)
        -> Result<EncryptedHandle<Euint8>, CoprocessorError>;

    /// Encode a public boolean as a ciphertext.
    fn trivial_bool(
        &self,
        ctx: &ContextId,
        value: bool,
    ) -> Result<EncryptedHandle<Ebool>, CoprocessorError>;

    /// Homomorphic comparison.
    fn compare(
        &self,
        ctx: &ContextId,
        op: CompareOp,
        lhs: &EncryptedHandle<Euint8>,
        rhs: &EncryptedHandle<Euint8>,
    ) -> Result<EncryptedHandle<Ebool>, CoprocessorError>;

    /// Homomorphic boolean combination.
    fn logic(
        &self,
        ctx: &ContextId,
        op: LogicOp,
        lhs: &EncryptedHandle<Ebool>,
        rhs: &EncryptedHandle<Ebool>,
    ) -> Result<EncryptedHandle<Ebool>, CoprocessorError>;

    /// Homomorphic negation.
    fn not(
        &self,
        ctx: &ContextId,
        operand: &EncryptedHandle<Ebool>,
    ) -> Result<EncryptedHandle<Ebool>, CoprocessorError>;

    /// Homomorphic wrapping arithmetic.
    fn arith(
        &self,
        ctx: &ContextId,
        op: ArithOp,
        lhs: &EncryptedHandle<Euint8>,
        rhs: &EncryptedHandle<Euint8>,
    ) -> Result<EncryptedHandle<Euint8>, CoprocessorError>;
}

#[cfg(feature = "mock")]
impl private::Sealed for crate::mock::MockCoprocessor {}
