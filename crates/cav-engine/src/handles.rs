//! # Handle Store
//!
//! Maps `(principal, slot)` to the handle of the submitted ciphertext.
//! At most one active record exists per key; `submitted` flips to true
//! exactly once until an owner-authorized reset clears the record.
//!
//! The slot state machine is derived from the record:
//!
//! ```text
//! Empty -> Submitted -> Verified{n} -> Finalized
//!   ^__________ reset ____________________|
//! ```
//!
//! Checks keep counting after finalization; finalization only blocks a
//! second finalize.

use std::collections::HashMap;

use cav_core::{Actor, AttributeSlot, ContextId, PrincipalId, Timestamp};
use cav_fhe::{Coprocessor, EncryptedHandle, EncryptedInput, Euint8, InputConstraint};
use serde::Serialize;

use crate::authority::{AuthorityRegistry, Role};
use crate::error::EngineError;

/// Per-principal record of a submitted attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributeRecord {
    /// Handle to the submitted ciphertext.
    pub handle: EncryptedHandle<Euint8>,
    /// When the submission was accepted.
    pub submitted_at: Timestamp,
    /// Always true for a stored record.
    pub submitted: bool,
    /// Whether a verifier finalized this principal.
    pub finalized: bool,
    /// Completed verification checks since submission.
    pub checks: u32,
}

/// Derived lifecycle state of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SlotState {
    /// Nothing submitted.
    Empty,
    /// Submitted, not yet checked.
    Submitted,
    /// Submitted and checked `checks` times.
    Verified {
        /// Completed checks.
        checks: u32,
    },
    /// Finalized by a verifier.
    Finalized {
        /// Completed checks.
        checks: u32,
    },
}

impl std::fmt::Display for SlotState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => f.write_str("empty"),
            Self::Submitted => f.write_str("submitted"),
            Self::Verified { checks } => write!(f, "verified({checks})"),
            Self::Finalized { checks } => write!(f, "finalized({checks})"),
        }
    }
}

/// Owner of all attribute records.
#[derive(Debug, Default)]
pub struct HandleStore {
    records: HashMap<(PrincipalId, AttributeSlot), AttributeRecord>,
}

impl HandleStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a submission without storing it: the slot must be vacant
    /// and the coprocessor must accept the ciphertext, its proof and the
    /// public bound. Returns the handle for [`HandleStore::insert`].
    ///
    /// # Errors
    ///
    /// [`EngineError::AlreadySubmitted`] for an occupied slot;
    /// [`EngineError::InvalidInput`] if the coprocessor rejects the input.
    pub fn admit<C: Coprocessor>(
        &self,
        coprocessor: &C,
        ctx: &ContextId,
        principal: &PrincipalId,
        slot: &AttributeSlot,
        input: &EncryptedInput,
        constraint: InputConstraint,
    ) -> Result<EncryptedHandle<Euint8>, EngineError> {
        if self.contains(principal, slot) {
            return Err(EngineError::AlreadySubmitted {
                principal: principal.clone(),
            });
        }
        Ok(coprocessor.validate_input(ctx, input, constraint)?)
    }

    /// Store an admitted handle.
    pub fn insert(
        &mut self,
        principal: PrincipalId,
        slot: AttributeSlot,
        handle: EncryptedHandle<Euint8>,
        submitted_at: Timestamp,
    ) {
        self.records.insert(
            (principal, slot),
            AttributeRecord {
                handle,
                submitted_at,
                submitted: true,
                finalized: false,
                checks: 0,
            },
        );
    }

    /// Whether an active record exists.
    pub fn contains(&self, principal: &PrincipalId, slot: &AttributeSlot) -> bool {
        self.records.contains_key(&key(principal, slot))
    }

    /// The active record.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if nothing was submitted.
    pub fn record(
        &self,
        principal: &PrincipalId,
        slot: &AttributeSlot,
    ) -> Result<&AttributeRecord, EngineError> {
        self.records
            .get(&key(principal, slot))
            .ok_or_else(|| EngineError::NotFound(format!("{slot} submission by {principal}")))
    }

    /// The handle of the active record.
    pub fn get(
        &self,
        principal: &PrincipalId,
        slot: &AttributeSlot,
    ) -> Result<EncryptedHandle<Euint8>, EngineError> {
        self.record(principal, slot).map(|r| r.handle)
    }

    /// Count one completed check. No-op for a missing record.
    pub fn mark_checked(&mut self, principal: &PrincipalId, slot: &AttributeSlot) {
        if let Some(record) = self.records.get_mut(&key(principal, slot)) {
            record.checks = record.checks.saturating_add(1);
        }
    }

    /// Fail unless the record exists and is not yet finalized.
    pub fn ensure_finalizable(
        &self,
        principal: &PrincipalId,
        slot: &AttributeSlot,
    ) -> Result<(), EngineError> {
        if self.record(principal, slot)?.finalized {
            return Err(EngineError::AlreadyFinalized {
                principal: principal.clone(),
            });
        }
        Ok(())
    }

    /// Mark the record finalized. No-op for a missing record.
    pub fn mark_finalized(&mut self, principal: &PrincipalId, slot: &AttributeSlot) {
        if let Some(record) = self.records.get_mut(&key(principal, slot)) {
            record.finalized = true;
        }
    }

    /// Clear a record so the principal may submit again. Owner only.
    ///
    /// # Errors
    ///
    /// [`EngineError::Unauthorized`] unless `caller` owns the engine;
    /// [`EngineError::NotFound`] if there is nothing to reset.
    pub fn reset(
        &mut self,
        authority: &AuthorityRegistry,
        caller: &Actor,
        principal: &PrincipalId,
        slot: &AttributeSlot,
    ) -> Result<AttributeRecord, EngineError> {
        authority.require(caller, Role::Owner)?;
        self.records
            .remove(&key(principal, slot))
            .ok_or_else(|| EngineError::NotFound(format!("{slot} submission by {principal}")))
    }

    /// Derived state of a slot.
    pub fn state(&self, principal: &PrincipalId, slot: &AttributeSlot) -> SlotState {
        match self.records.get(&key(principal, slot)) {
            None => SlotState::Empty,
            Some(r) if r.finalized => SlotState::Finalized { checks: r.checks },
            Some(r) if r.checks > 0 => SlotState::Verified { checks: r.checks },
            Some(_) => SlotState::Submitted,
        }
    }

    /// Number of active records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn key(principal: &PrincipalId, slot: &AttributeSlot) -> (PrincipalId, AttributeSlot) {
    (principal.clone(), slot.clone())
}
