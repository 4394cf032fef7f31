//! # Permission Registry
//!
//! Two capability sets per handle: compute (may use the handle as an
//! operand) and disclose (may read the value off-engine).
//!
//! ## Late Binding
//!
//! The registry never validates that a handle was granted anything. A
//! missing grant surfaces as [`EngineError::AccessDenied`] the first time
//! the ungranted actor tries to use or disclose the handle. Eager checking
//! at creation time would change observable error timing.
//!
//! ## Transient Scope
//!
//! Intermediates produced inside one engine operation (the two comparisons
//! of a range check, encoded thresholds) are usable by the invoking context
//! only until that operation ends. [`PermissionRegistry::allow_transient`]
//! records such an allowance; [`PermissionRegistry::end_operation`] drops
//! every one of them. Transient allowances are never visible through
//! [`PermissionRegistry::check_compute`].

use std::collections::{BTreeSet, HashMap, HashSet};

use cav_core::{Actor, PrincipalId};
use cav_fhe::{HandleId, HandleRef};
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// The two capabilities a handle can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Use as an operand.
    Compute,
    /// Read the plaintext off-engine.
    Disclose,
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Compute => "compute",
            Self::Disclose => "disclose",
        })
    }
}

/// Capability sets attached to one handle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PermissionGrant {
    /// Actors allowed to use the handle as an operand.
    pub compute: BTreeSet<Actor>,
    /// Principals allowed to read the handle's value.
    pub disclose: BTreeSet<PrincipalId>,
}

/// Per-handle capability registry.
#[derive(Debug, Default)]
pub struct PermissionRegistry {
    grants: HashMap<HandleId, PermissionGrant>,
    transient: HashSet<(HandleId, Actor)>,
}

impl PermissionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Grant compute capability. Returns `false` if it was already held.
    pub fn grant_compute(&mut self, handle: &HandleRef, actor: Actor) -> bool {
        self.grants.entry(handle.id).or_default().compute.insert(actor)
    }

    /// Grant disclose capability. Returns `false` if it was already held.
    pub fn grant_disclose(&mut self, handle: &HandleRef, principal: PrincipalId) -> bool {
        self.grants
            .entry(handle.id)
            .or_default()
            .disclose
            .insert(principal)
    }

    /// Whether `actor` holds a persistent compute grant on `handle`.
    pub fn check_compute(&self, handle: &HandleRef, actor: &Actor) -> bool {
        self.grants
            .get(&handle.id)
            .is_some_and(|g| g.compute.contains(actor))
    }

    /// Whether `principal` holds disclose capability on `handle`.
    pub fn check_disclose(&self, handle: &HandleRef, principal: &PrincipalId) -> bool {
        self.grants
            .get(&handle.id)
            .is_some_and(|g| g.disclose.contains(principal))
    }

    /// The grant sets for `handle`, if anything was ever granted.
    pub fn grants(&self, handle: &HandleRef) -> Option<&PermissionGrant> {
        self.grants.get(&handle.id)
    }

    /// Require compute capability, persistent or transient.
    ///
    /// # Errors
    ///
    /// [`EngineError::AccessDenied`] if `actor` holds neither.
    pub fn require_compute(&self, handle: &HandleRef, actor: &Actor) -> Result<(), EngineError> {
        if self.check_compute(handle, actor)
            || self.transient.contains(&(handle.id, actor.clone()))
        {
            return Ok(());
        }
        Err(EngineError::AccessDenied {
            actor: actor.clone(),
            capability: Capability::Compute,
            handle: handle.id,
        })
    }

    /// Require disclose capability.
    ///
    /// # Errors
    ///
    /// [`EngineError::AccessDenied`] if `principal` does not hold it.
    pub fn require_disclose(
        &self,
        handle: &HandleRef,
        principal: &PrincipalId,
    ) -> Result<(), EngineError> {
        if self.check_disclose(handle, principal) {
            return Ok(());
        }
        Err(EngineError::AccessDenied {
            actor: Actor::from(principal),
            capability: Capability::Disclose,
            handle: handle.id,
        })
    }

    /// Drop every grant on `handle`. Returns the grant sets it held.
    pub fn revoke(&mut self, handle: &HandleRef) -> Option<PermissionGrant> {
        self.transient.retain(|(id, _)| *id != handle.id);
        self.grants.remove(&handle.id)
    }

    /// Let `actor` compute on `handle` until the current operation ends.
    pub fn allow_transient(&mut self, handle: &HandleRef, actor: Actor) {
        self.transient.insert((handle.id, actor));
    }

    /// Drop every transient allowance.
    pub fn end_operation(&mut self) {
        self.transient.clear();
    }

    /// Number of handles with at least one grant entry.
    pub fn len(&self) -> usize {
        self.grants.len()
    }

    /// Whether no handle has ever been granted anything.
    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}
