//! # Mock Coprocessor
//!
//! A deterministic, transparent coprocessor for development and testing.
//! Plaintexts live in an in-memory table keyed by handle id; every
//! homomorphic operation is evaluated on those plaintexts and the result is
//! stored under a freshly minted handle.
//!
//! ## Input Format
//!
//! [`MockCoprocessor::encrypt_input`] plays the client: it masks the value
//! with a random nonce and produces a proof that is the SHA-256 digest of
//! the canonical `{context, ciphertext}` pair. Validation recomputes that
//! digest, so a ciphertext replayed into another context, or altered in
//! flight, is rejected.
//!
//! ## Security Notice
//!
//! No confidentiality. [`BackendPolicy`](crate::BackendPolicy) rejects this
//! backend in production mode.

use std::collections::HashMap;

use cav_core::{sha256_digest, CanonicalBytes, ContextId};
use parking_lot::RwLock;
use serde::Serialize;
use uuid::Uuid;

use crate::handle::{Ebool, EncryptedHandle, Euint8, HandleId, HandleRef, ValueKind, Width};
use crate::ops::{ArithOp, CompareOp, EncryptedInput, InputConstraint, LogicOp};
use crate::policy::CoprocessorBackend;
use crate::traits::{Coprocessor, CoprocessorError};

const CIPHERTEXT_TAG: u8 = 0x01;
const NONCE_LEN: usize = 16;
const CIPHERTEXT_LEN: usize = 1 + NONCE_LEN + 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Plaintext {
    Uint8(u8),
    Bool(bool),
}

impl Plaintext {
    fn kind(self) -> ValueKind {
        match self {
            Self::Uint8(_) => ValueKind::Uint8,
            Self::Bool(_) => ValueKind::Bool,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    context: ContextId,
    value: Plaintext,
}

#[derive(Serialize)]
struct ProofBinding<'a> {
    context: &'a ContextId,
    ciphertext: String,
}

/// Deterministic plaintext-backed coprocessor.
#[derive(Debug, Default)]
pub struct MockCoprocessor {
    table: RwLock<HashMap<HandleId, Slot>>,
}

impl MockCoprocessor {
    /// Create an empty coprocessor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Client-side encryption of `value` for submission into `ctx`.
    pub fn encrypt_input(ctx: &ContextId, value: u8) -> EncryptedInput {
        let nonce = *Uuid::new_v4().as_bytes();
        let mut ciphertext = Vec::with_capacity(CIPHERTEXT_LEN);
        ciphertext.push(CIPHERTEXT_TAG);
        ciphertext.extend_from_slice(&nonce);
        ciphertext.push(value ^ nonce[0] ^ nonce[NONCE_LEN - 1]);
        // Binding cannot fail: the payload holds no floats.
        let proof = proof_for(ctx, &ciphertext).unwrap_or_default();
        EncryptedInput { ciphertext, proof }
    }

    /// Test oracle: decrypt an integer handle.
    pub fn decrypt_u8(&self, handle: &EncryptedHandle<Euint8>) -> Option<u8> {
        match self.table.read().get(&handle.id())?.value {
            Plaintext::Uint8(v) => Some(v),
            Plaintext::Bool(_) => None,
        }
    }

    /// Test oracle: decrypt a boolean handle.
    pub fn decrypt_bool(&self, handle: &EncryptedHandle<Ebool>) -> Option<bool> {
        match self.table.read().get(&handle.id())?.value {
            Plaintext::Bool(v) => Some(v),
            Plaintext::Uint8(_) => None,
        }
    }

    /// Number of ciphertexts held.
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    /// Whether no ciphertext has been minted yet.
    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }

    fn store<W: Width>(&self, ctx: &ContextId, value: Plaintext) -> EncryptedHandle<W> {
        let handle = EncryptedHandle::<W>::mint(*ctx);
        self.table.write().insert(
            handle.id(),
            Slot {
                context: *ctx,
                value,
            },
        );
        tracing::trace!(handle = %handle.id(), kind = W::KIND.as_str(), "mock ciphertext minted");
        handle
    }

    fn load(&self, ctx: &ContextId, handle: HandleRef) -> Result<Plaintext, CoprocessorError> {
        if handle.context != *ctx {
            return Err(CoprocessorError::ContextMismatch { handle: handle.id });
        }
        let slot = self
            .table
            .read()
            .get(&handle.id)
            .copied()
            .ok_or(CoprocessorError::UnknownHandle(handle.id))?;
        if slot.context != *ctx {
            return Err(CoprocessorError::ContextMismatch { handle: handle.id });
        }
        if slot.value.kind() != handle.kind {
            return Err(CoprocessorError::KindMismatch {
                handle: handle.id,
                expected: handle.kind,
                actual: slot.value.kind(),
            });
        }
        Ok(slot.value)
    }

    fn load_u8(&self, ctx: &ContextId, h: &EncryptedHandle<Euint8>) -> Result<u8, CoprocessorError> {
        match self.load(ctx, h.untyped())? {
            Plaintext::Uint8(v) => Ok(v),
            other => Err(CoprocessorError::KindMismatch {
                handle: h.id(),
                expected: ValueKind::Uint8,
                actual: other.kind(),
            }),
        }
    }

    fn load_bool(&self, ctx: &ContextId, h: &EncryptedHandle<Ebool>) -> Result<bool, CoprocessorError> {
        match self.load(ctx, h.untyped())? {
            Plaintext::Bool(v) => Ok(v),
            other => Err(CoprocessorError::KindMismatch {
                handle: h.id(),
                expected: ValueKind::Bool,
                actual: other.kind(),
            }),
        }
    }
}

fn proof_for(ctx: &ContextId, ciphertext: &[u8]) -> Result<Vec<u8>, CoprocessorError> {
    let binding = ProofBinding {
        context: ctx,
        ciphertext: ciphertext.iter().map(|b| format!("{b:02x}")).collect(),
    };
    let canonical = CanonicalBytes::new(&binding)
        .map_err(|e| CoprocessorError::ProofRejected(e.to_string()))?;
    Ok(sha256_digest(&canonical).as_bytes().to_vec())
}

impl Coprocessor for MockCoprocessor {
    fn backend(&self) -> CoprocessorBackend {
        CoprocessorBackend::Mock
    }

    fn validate_input(
        &self,
        ctx: &ContextId,
        input: &EncryptedInput,
        constraint: InputConstraint,
    ) -> Result<EncryptedHandle<Euint8>, CoprocessorError> {
        let ct = &input.ciphertext;
        if ct.len() != CIPHERTEXT_LEN || ct[0] != CIPHERTEXT_TAG {
            return Err(CoprocessorError::ProofRejected(
                "malformed ciphertext".to_string(),
            ));
        }
        if proof_for(ctx, ct)? != input.proof {
            return Err(CoprocessorError::ProofRejected(
                "proof does not bind ciphertext to context".to_string(),
            ));
        }
        let value = ct[CIPHERTEXT_LEN - 1] ^ ct[1] ^ ct[NONCE_LEN];
        if !constraint.admits(value) {
            return Err(CoprocessorError::BoundViolation {
                min: constraint.min,
                max: constraint.max,
            });
        }
        Ok(self.store(ctx, Plaintext::Uint8(value)))
    }

    fn trivial_u8(
        &self,
        ctx: &ContextId,
        value: u8,
    ) -> Result<EncryptedHandle<Euint8>, CoprocessorError> {
        Ok(self.store(ctx, Plaintext::Uint8(value)))
    }

    fn trivial_bool(
        &self,
        ctx: &ContextId,
        value: bool,
    ) -> Result<EncryptedHandle<Ebool>, CoprocessorError> {
        Ok(self.store(ctx, Plaintext::Bool(value)))
    }

    fn compare(
        &self,
        ctx: &ContextId,
        op: CompareOp,
        lhs: &EncryptedHandle<Euint8>,
        rhs: &EncryptedHandle<Euint8>,
    ) -> Result<EncryptedHandle<Ebool>, CoprocessorError> {
        let a = self.load_u8(ctx, lhs)?;
        let b = self.load_u8(ctx, rhs)?;
        Ok(self.store(ctx, Plaintext::Bool(op.apply(a, b))))
    }

    fn logic(
        &self,
        ctx: &ContextId,
        op: LogicOp,
        lhs: &EncryptedHandle<Ebool>,
        rhs: &EncryptedHandle<Ebool>,
    ) -> Result<EncryptedHandle<Ebool>, CoprocessorError> {
        let a = self.load_bool(ctx, lhs)?;
        let b = self.load_bool(ctx, rhs)?;
        Ok(self.store(ctx, Plaintext::Bool(op.apply(a, b))))
    }

    fn not(
        &self,
        ctx: &ContextId,
        operand: &EncryptedHandle<Ebool>,
    ) -> Result<EncryptedHandle<Ebool>, CoprocessorError> {
        let a = self.load_bool(ctx, operand)?;
        Ok(self.store(ctx, Plaintext::Bool(!a)))
    }

    fn arith(
        &self,
        ctx: &ContextId,
        op: ArithOp,
        lhs: &EncryptedHandle<Euint8>,
        rhs: &EncryptedHandle<Euint8>,
    ) -> Result<EncryptedHandle<Euint8>, CoprocessorError> {
        let a = self.load_u8(ctx, lhs)?;
        let b = self.load_u8(ctx, rhs)?;
        Ok(self.store(ctx, Plaintext::Uint8(op.apply(a, b))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AGES: InputConstraint = InputConstraint { min: 1, max: 120 };

    fn submit(cp: &MockCoprocessor, ctx: &ContextId, v: u8) -> EncryptedHandle<Euint8> {
        let input = MockCoprocessor::encrypt_input(ctx, v);
        cp.validate_input(ctx, &input, AGES).unwrap()
    }

    #[test]
    fn validate_roundtrips_value() {
        let cp = MockCoprocessor::new();
        let ctx = ContextId::new();
        let h = submit(&cp, &ctx, 42);
        assert_eq!(cp.decrypt_u8(&h), Some(42));
        assert_eq!(h.context(), ctx);
    }

    #[test]
    fn ciphertexts_of_equal_values_differ() {
        let ctx = ContextId::new();
        let a = MockCoprocessor::encrypt_input(&ctx, 30);
        let b = MockCoprocessor::encrypt_input(&ctx, 30);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn proof_bound_to_context() {
        let cp = MockCoprocessor::new();
        let input = MockCoprocessor::encrypt_input(&ContextId::new(), 30);
        let err = cp.validate_input(&ContextId::new(), &input, AGES).unwrap_err();
        assert!(matches!(err, CoprocessorError::ProofRejected(_)));
        assert!(cp.is_empty());
    }

    #[test]
    fn tampered_ciphertext_rejected() {
        let cp = MockCoprocessor::new();
        let ctx = ContextId::new();
        let mut input = MockCoprocessor::encrypt_input(&ctx, 30);
        input.ciphertext[CIPHERTEXT_LEN - 1] ^= 0xff;
        assert!(matches!(
            cp.validate_input(&ctx, &input, AGES),
            Err(CoprocessorError::ProofRejected(_))
        ));
    }

    #[test]
    fn malformed_ciphertext_rejected() {
        let cp = MockCoprocessor::new();
        let input = EncryptedInput {
            ciphertext: vec![1, 2, 3],
            proof: vec![],
        };
        assert!(cp.validate_input(&ContextId::new(), &input, AGES).is_err());
    }

    #[test]
    fn bound_enforced_during_conversion() {
        let cp = MockCoprocessor::new();
        let ctx = ContextId::new();
        for v in [0u8, 121, 255] {
            let input = MockCoprocessor::encrypt_input(&ctx, v);
            assert_eq!(
                cp.validate_input(&ctx, &input, AGES),
                Err(CoprocessorError::BoundViolation { min: 1, max: 120 })
            );
        }
    }

    #[test]
    fn compare_and_combine() {
        let cp = MockCoprocessor::new();
        let ctx = ContextId::new();
        let age = submit(&cp, &ctx, 25);
        let lo = cp.trivial_u8(&ctx, 18).unwrap();
        let hi = cp.trivial_u8(&ctx, 65).unwrap();
        let ge = cp.compare(&ctx, CompareOp::Ge, &age, &lo).unwrap();
        let le = cp.compare(&ctx, CompareOp::Le, &age, &hi).unwrap();
        let both = cp.logic(&ctx, LogicOp::And, &ge, &le).unwrap();
        assert_eq!(cp.decrypt_bool(&both), Some(true));
        let negated = cp.not(&ctx, &both).unwrap();
        assert_eq!(cp.decrypt_bool(&negated), Some(false));
    }

    #[test]
    fn arith_wraps_like_uint8() {
        let cp = MockCoprocessor::new();
        let ctx = ContextId::new();
        let a = cp.trivial_u8(&ctx, 250).unwrap();
        let b = cp.trivial_u8(&ctx, 10).unwrap();
        let sum = cp.arith(&ctx, ArithOp::Add, &a, &b).unwrap();
        let diff = cp.arith(&ctx, ArithOp::Sub, &b, &a).unwrap();
        assert_eq!(cp.decrypt_u8(&sum), Some(4));
        assert_eq!(cp.decrypt_u8(&diff), Some(16));
    }

    #[test]
    fn operands_from_foreign_context_rejected() {
        let cp = MockCoprocessor::new();
        let ours = ContextId::new();
        let theirs = ContextId::new();
        let a = cp.trivial_u8(&ours, 1).unwrap();
        let b = cp.trivial_u8(&theirs, 1).unwrap();
        let before = cp.len();
        let err = cp.compare(&ours, CompareOp::Eq, &a, &b).unwrap_err();
        assert_eq!(err, CoprocessorError::ContextMismatch { handle: b.id() });
        assert_eq!(cp.len(), before);
    }

    #[test]
    fn handles_from_another_coprocessor_are_unknown() {
        let ctx = ContextId::new();
        let other = MockCoprocessor::new();
        let h = other.trivial_bool(&ctx, true).unwrap();
        let cp = MockCoprocessor::new();
        assert!(matches!(
            cp.not(&ctx, &h),
            Err(CoprocessorError::UnknownHandle(_))
        ));
    }

    #[test]
    fn oracle_reads_integers_and_reports_mock_backend() {
        let cp = MockCoprocessor::new();
        let ctx = ContextId::new();
        let h = cp.trivial_u8(&ctx, 9).unwrap();
        assert_eq!(cp.decrypt_u8(&h), Some(9));
        assert_eq!(cp.backend(), CoprocessorBackend::Mock);
    }
}
