//! # Verification Engine
//!
//! Orchestrates the handle store, permission registry, role registry,
//! named ranges, audit ledger and pause gate around an encryption
//! coprocessor. The engine never observes a plaintext: every check is a
//! coprocessor operation over handles, and the caller reads the outcome
//! off-engine through its disclose capability.
//!
//! ## Atomicity
//!
//! Each entry point runs in three phases:
//!
//! 1. validation (pause gate, roles, bounds, record lookups),
//! 2. coprocessor evaluation, with intermediates usable only inside the
//!    operation,
//! 3. commit: store updates, grants and the audit append.
//!
//! Every fallible step happens in phases 1 and 2, including preparing the
//! audit entry. Phase 3 cannot fail, so an error leaves the engine exactly
//! as it was.
//!
//! ## Grants
//!
//! Every handle returned to a caller is granted compute to the engine
//! context and disclose to the originating principal. Intermediates receive
//! no grant and become unusable once the operation ends.

use cav_core::{Actor, AttributeSlot, ContextId, PrincipalId, Timestamp};
use cav_fhe::{
    Coprocessor, CompareOp, Ebool, EncryptedHandle, EncryptedInput, Euint8, LogicOp, Width,
};
use serde::Serialize;

use crate::audit::{ActionKind, AuditEntry, AuditLedger, AuditWindow, LedgerIntegrityError};
use crate::authority::{AuthorityRegistry, Role};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::handles::{AttributeRecord, HandleStore, SlotState};
use crate::lifecycle::LifecycleGate;
use crate::permissions::PermissionRegistry;
use crate::ranges::{NamedRange, RangeId, RangeRegistry};

/// A finalized verification, as asserted by a verifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationResult {
    /// The verified principal.
    pub subject: PrincipalId,
    /// Encrypted outcome, disclosable by the subject.
    pub outcome: EncryptedHandle<Ebool>,
    /// When the result was recorded.
    pub timestamp: Timestamp,
    /// Always true once recorded.
    pub finalized: bool,
}

/// Authorization for `requester` to decrypt `handle` off-engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(bound = "")]
pub struct Disclosure<W: Width> {
    /// The disclosed handle.
    pub handle: EncryptedHandle<W>,
    /// The principal the value is released to.
    pub requester: PrincipalId,
    /// When the disclosure was recorded.
    pub disclosed_at: Timestamp,
    /// Index of the audit entry recording it.
    pub audit_index: u64,
}

/// The confidential attribute verification engine.
pub struct VerificationEngine<C: Coprocessor> {
    config: EngineConfig,
    context: ContextId,
    coprocessor: C,
    store: HandleStore,
    permissions: PermissionRegistry,
    authority: AuthorityRegistry,
    ranges: RangeRegistry,
    ledger: AuditLedger,
    gate: LifecycleGate,
    results: Vec<VerificationResult>,
}

impl<C: Coprocessor> VerificationEngine<C> {
    /// Create an engine owned by `owner` with a fresh binding context.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidInput`] if the configuration is invalid or the
    /// backend policy rejects the coprocessor.
    pub fn new(config: EngineConfig, coprocessor: C, owner: PrincipalId) -> Result<Self, EngineError> {
        config
            .validate()
            .map_err(|e| EngineError::InvalidInput(e.to_string()))?;
        config.policy().validate(coprocessor.backend())?;

        let context = ContextId::new();
        tracing::info!(
            %context,
            %owner,
            backend = coprocessor.backend().name(),
            slot = %config.attribute_slot,
            "verification engine created"
        );
        Ok(Self {
            config,
            context,
            coprocessor,
            store: HandleStore::new(),
            permissions: PermissionRegistry::new(),
            authority: AuthorityRegistry::new(Actor::from(owner)),
            ranges: RangeRegistry::new(),
            ledger: AuditLedger::new(),
            gate: LifecycleGate::new(),
            results: Vec::new(),
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    /// The context every handle of this engine is bound to.
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// The coprocessor backing this engine.
    pub fn coprocessor(&self) -> &C {
        &self.coprocessor
    }

    /// The active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read access to role membership.
    pub fn authority(&self) -> &AuthorityRegistry {
        &self.authority
    }

    /// Read access to handle permissions.
    pub fn permissions(&self) -> &PermissionRegistry {
        &self.permissions
    }

    /// Whether the lifecycle gate is engaged.
    pub fn is_paused(&self) -> bool {
        self.gate.is_paused()
    }

    /// Handle of `principal`'s active submission.
    pub fn get(&self, principal: &PrincipalId) -> Result<EncryptedHandle<Euint8>, EngineError> {
        self.store.get(principal, &self.config.attribute_slot)
    }

    /// `principal`'s active record.
    pub fn record(&self, principal: &PrincipalId) -> Result<&AttributeRecord, EngineError> {
        self.store.record(principal, &self.config.attribute_slot)
    }

    /// Derived lifecycle state of `principal`'s slot.
    pub fn slot_state(&self, principal: &PrincipalId) -> SlotState {
        self.store.state(principal, &self.config.attribute_slot)
    }

    /// A named range, active or not.
    pub fn named_range(&self, id: RangeId) -> Option<&NamedRange> {
        self.ranges.get(id)
    }

    /// Every named range with its id.
    pub fn named_ranges(&self) -> Vec<(RangeId, &NamedRange)> {
        self.ranges.iter().collect()
    }

    /// All finalized results, in order.
    pub fn verification_results(&self) -> &[VerificationResult] {
        &self.results
    }

    /// Finalized results for `subject`.
    pub fn results_for(&self, subject: &PrincipalId) -> Vec<&VerificationResult> {
        self.results.iter().filter(|r| &r.subject == subject).collect()
    }

    // -----------------------------------------------------------------------
    // Submission
    // -----------------------------------------------------------------------

    /// Submit `caller`'s encrypted attribute. Once per slot until reset.
    ///
    /// # Errors
    ///
    /// [`EngineError::Paused`], [`EngineError::AlreadySubmitted`], or
    /// [`EngineError::InvalidInput`] when the coprocessor rejects the proof
    /// or the value falls outside the public bound.
    pub fn submit(
        &mut self,
        caller: &PrincipalId,
        input: &EncryptedInput,
    ) -> Result<EncryptedHandle<Euint8>, EngineError> {
        self.scoped("submit", caller, |engine| {
            engine.gate.ensure_open()?;
            let slot = engine.config.attribute_slot.clone();
            let handle = engine.store.admit(
                &engine.coprocessor,
                &engine.context,
                caller,
                &slot,
                input,
                engine.config.constraint(),
            )?;
            let now = Timestamp::now();
            let entry = engine
                .ledger
                .prepare(caller, ActionKind::Submitted, &Actor::from(caller), now)?;

            engine.store.insert(caller.clone(), slot, handle, now);
            engine.grant_result(&handle, caller);
            engine.ledger.commit(entry);
            tracing::info!(principal = %caller, handle = %handle.id(), "attribute submitted");
            Ok(handle)
        })
    }

    // -----------------------------------------------------------------------
    // Checks
    // -----------------------------------------------------------------------

    /// Encrypted `value >= threshold` over `caller`'s submission.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] without a submission.
    pub fn is_at_least(
        &mut self,
        caller: &PrincipalId,
        threshold: u8,
    ) -> Result<EncryptedHandle<Ebool>, EngineError> {
        self.scoped("is_at_least", caller, |engine| {
            engine.gate.ensure_open()?;
            let value = engine.get(caller)?;
            let encoded = engine.encode(threshold)?;
            let outcome = engine.compare(CompareOp::Ge, &value, &encoded)?;
            let entry = engine.prepare_entry(caller, ActionKind::ThresholdChecked, caller)?;

            engine.commit_checks(caller, &[outcome], entry);
            tracing::info!(principal = %caller, result = %outcome.id(), "threshold checked");
            Ok(outcome)
        })
    }

    /// Encrypted `min <= value <= max` over `caller`'s submission.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidInput`] if `min > max` or either bound lies
    /// outside the public bound; [`EngineError::NotFound`] without a
    /// submission.
    pub fn is_in_range(
        &mut self,
        caller: &PrincipalId,
        min: u8,
        max: u8,
    ) -> Result<EncryptedHandle<Ebool>, EngineError> {
        self.scoped("is_in_range", caller, |engine| {
            engine.gate.ensure_open()?;
            engine.validate_bounds(min, max)?;
            let value = engine.get(caller)?;
            let outcome = engine.range_check(&value, min, max)?;
            let entry = engine.prepare_entry(caller, ActionKind::RangeChecked, caller)?;

            engine.commit_checks(caller, &[outcome], entry);
            tracing::info!(principal = %caller, result = %outcome.id(), "range checked");
            Ok(outcome)
        })
    }

    /// Range check against an active named range.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown or inactive range or a
    /// missing submission.
    pub fn is_in_named_range(
        &mut self,
        caller: &PrincipalId,
        id: RangeId,
    ) -> Result<EncryptedHandle<Ebool>, EngineError> {
        let mut outcomes = self.is_in_named_ranges(caller, &[id])?;
        outcomes
            .pop()
            .ok_or_else(|| EngineError::NotFound(format!("result for {id}")))
    }

    /// One independently granted range check per id, in input order.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidInput`] for an empty list or one longer than
    /// `max_batch`; [`EngineError::NotFound`] if any id is unknown or
    /// inactive, in which case no check is committed.
    pub fn is_in_named_ranges(
        &mut self,
        caller: &PrincipalId,
        ids: &[RangeId],
    ) -> Result<Vec<EncryptedHandle<Ebool>>, EngineError> {
        self.scoped("is_in_named_ranges", caller, |engine| {
            engine.gate.ensure_open()?;
            engine.validate_batch(ids.len())?;
            let bounds = ids
                .iter()
                .map(|id| engine.ranges.active(*id).map(|r| (r.min, r.max)))
                .collect::<Result<Vec<_>, _>>()?;
            let value = engine.get(caller)?;
            let outcomes = bounds
                .into_iter()
                .map(|(min, max)| engine.range_check(&value, min, max))
                .collect::<Result<Vec<_>, _>>()?;
            let entry = engine.prepare_entry(caller, ActionKind::NamedRangeChecked, caller)?;

            engine.commit_checks(caller, &outcomes, entry);
            tracing::info!(principal = %caller, ranges = ids.len(), "named ranges checked");
            Ok(outcomes)
        })
    }

    /// Encrypted "caller is older than `other`" (`caller > other`).
    /// Comparing a principal with itself yields false.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] if either principal has no submission.
    pub fn compare_to(
        &mut self,
        caller: &PrincipalId,
        other: &PrincipalId,
    ) -> Result<EncryptedHandle<Ebool>, EngineError> {
        let mut outcomes = self.compare_to_many(caller, std::slice::from_ref(other))?;
        outcomes
            .pop()
            .ok_or_else(|| EngineError::NotFound(format!("comparison with {other}")))
    }

    /// One independently granted comparison per other principal.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidInput`] for an empty or oversized list;
    /// [`EngineError::NotFound`] if any principal has no submission.
    pub fn compare_to_many(
        &mut self,
        caller: &PrincipalId,
        others: &[PrincipalId],
    ) -> Result<Vec<EncryptedHandle<Ebool>>, EngineError> {
        self.scoped("compare_to", caller, |engine| {
            engine.gate.ensure_open()?;
            engine.validate_batch(others.len())?;
            let mine = engine.get(caller)?;
            let theirs = others
                .iter()
                .map(|other| engine.get(other))
                .collect::<Result<Vec<_>, _>>()?;
            let outcomes = theirs
                .iter()
                .map(|other| engine.compare(CompareOp::Gt, &mine, other))
                .collect::<Result<Vec<_>, _>>()?;
            let entry = engine.prepare_entry(caller, ActionKind::Compared, caller)?;

            engine.commit_checks(caller, &outcomes, entry);
            tracing::info!(principal = %caller, peers = others.len(), "peer comparison");
            Ok(outcomes)
        })
    }

    // -----------------------------------------------------------------------
    // Finalization and disclosure
    // -----------------------------------------------------------------------

    /// Record a verifier-asserted outcome for `subject`.
    ///
    /// The outcome is the verifier's own assertion, encoded as a public
    /// ciphertext; it is not derived from any encrypted check.
    ///
    /// # Errors
    ///
    /// [`EngineError::Unauthorized`] unless `caller` is a verifier;
    /// [`EngineError::NotFound`] without a submission;
    /// [`EngineError::AlreadyFinalized`] on repeat.
    pub fn finalize(
        &mut self,
        caller: &PrincipalId,
        subject: &PrincipalId,
        outcome: bool,
    ) -> Result<VerificationResult, EngineError> {
        self.scoped("finalize", caller, |engine| {
            engine.gate.ensure_open()?;
            engine.authority.require(&Actor::from(caller), Role::Verifier)?;
            let slot = engine.config.attribute_slot.clone();
            engine.store.ensure_finalizable(subject, &slot)?;
            let handle = engine.coprocessor.trivial_bool(&engine.context, outcome)?;
            let now = Timestamp::now();
            let entry = engine
                .ledger
                .prepare(subject, ActionKind::Finalized, &Actor::from(caller), now)?;

            let result = VerificationResult {
                subject: subject.clone(),
                outcome: handle,
                timestamp: now,
                finalized: true,
            };
            engine.grant_result(&handle, subject);
            engine.store.mark_finalized(subject, &slot);
            engine.results.push(result.clone());
            engine.ledger.commit(entry);
            tracing::info!(verifier = %caller, principal = %subject, "verification finalized");
            Ok(result)
        })
    }

    /// Release `handle` to `requester` for off-engine decryption.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidInput`] for a handle bound to another context;
    /// [`EngineError::AccessDenied`] unless the engine holds compute and
    /// `requester` holds disclose capability.
    pub fn disclose<W: Width>(
        &mut self,
        requester: &PrincipalId,
        handle: &EncryptedHandle<W>,
    ) -> Result<Disclosure<W>, EngineError> {
        self.scoped("disclose", requester, |engine| {
            engine.gate.ensure_open()?;
            engine.ensure_bound(handle)?;
            let reference = handle.untyped();
            engine
                .permissions
                .require_compute(&reference, &engine.actor())?;
            engine.permissions.require_disclose(&reference, requester)?;
            let now = Timestamp::now();
            let entry = engine
                .ledger
                .prepare(requester, ActionKind::Disclosed, &Actor::from(requester), now)?;

            let audit_index = engine.ledger.commit(entry).index;
            tracing::info!(principal = %requester, handle = %handle.id(), "handle disclosed");
            Ok(Disclosure {
                handle: *handle,
                requester: requester.clone(),
                disclosed_at: now,
                audit_index,
            })
        })
    }

    /// Share disclose capability on `handle` with `grantee`. Repeating a
    /// share leaves the permissions unchanged.
    ///
    /// # Errors
    ///
    /// [`EngineError::AccessDenied`] unless `caller` holds disclose.
    pub fn share<W: Width>(
        &mut self,
        caller: &PrincipalId,
        handle: &EncryptedHandle<W>,
        grantee: &PrincipalId,
    ) -> Result<(), EngineError> {
        self.scoped("share", caller, |engine| {
            engine.gate.ensure_open()?;
            engine.ensure_bound(handle)?;
            let reference = handle.untyped();
            engine.permissions.require_disclose(&reference, caller)?;
            let entry = engine.prepare_entry(grantee, ActionKind::Shared, caller)?;

            engine.permissions.grant_disclose(&reference, grantee.clone());
            engine.ledger.commit(entry);
            tracing::info!(principal = %caller, grantee = %grantee, handle = %handle.id(), "disclosure shared");
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Owner administration
    // -----------------------------------------------------------------------

    /// Register a named range. Owner only.
    ///
    /// # Errors
    ///
    /// [`EngineError::Unauthorized`]; [`EngineError::InvalidInput`] for a
    /// malformed range or an empty label.
    pub fn create_named_range(
        &mut self,
        caller: &PrincipalId,
        min: u8,
        max: u8,
        label: impl Into<String>,
    ) -> Result<RangeId, EngineError> {
        let label = label.into();
        self.scoped("create_named_range", caller, |engine| {
            engine.gate.ensure_open()?;
            engine.authority.require(&Actor::from(caller), Role::Owner)?;
            engine.validate_bounds(min, max)?;
            if label.trim().is_empty() {
                return Err(EngineError::InvalidInput("range label must not be empty".into()));
            }
            let entry = engine.prepare_entry(caller, ActionKind::RangeCreated, caller)?;

            let id = engine.ranges.create(min, max, label);
            engine.ledger.commit(entry);
            tracing::info!(owner = %caller, range = %id, "named range created");
            Ok(id)
        })
    }

    /// Deactivate a named range. Owner only.
    ///
    /// # Errors
    ///
    /// [`EngineError::NotFound`] for an unknown or already inactive range.
    pub fn deactivate_named_range(
        &mut self,
        caller: &PrincipalId,
        id: RangeId,
    ) -> Result<(), EngineError> {
        self.scoped("deactivate_named_range", caller, |engine| {
            engine.gate.ensure_open()?;
            engine.authority.require(&Actor::from(caller), Role::Owner)?;
            engine.ranges.active(id)?;
            let entry = engine.prepare_entry(caller, ActionKind::RangeDeactivated, caller)?;

            engine.ranges.deactivate(id)?;
            engine.ledger.commit(entry);
            tracing::info!(owner = %caller, range = %id, "named range deactivated");
            Ok(())
        })
    }

    /// Add a verifier. Owner only.
    pub fn add_verifier(&mut self, caller: &PrincipalId, member: &PrincipalId) -> Result<(), EngineError> {
        self.scoped("add_verifier", caller, |engine| {
            engine.gate.ensure_open()?;
            let entry = engine.prepare_entry(member, ActionKind::RoleGranted, caller)?;
            engine
                .authority
                .add_verifier(&Actor::from(caller), Actor::from(member))?;
            engine.ledger.commit(entry);
            tracing::info!(owner = %caller, member = %member, role = %Role::Verifier, "role granted");
            Ok(())
        })
    }

    /// Remove a verifier. Owner only; never the owner itself.
    pub fn remove_verifier(
        &mut self,
        caller: &PrincipalId,
        member: &PrincipalId,
    ) -> Result<(), EngineError> {
        self.scoped("remove_verifier", caller, |engine| {
            engine.gate.ensure_open()?;
            let entry = engine.prepare_entry(member, ActionKind::RoleRevoked, caller)?;
            engine
                .authority
                .remove_verifier(&Actor::from(caller), &Actor::from(member))?;
            engine.ledger.commit(entry);
            tracing::info!(owner = %caller, member = %member, role = %Role::Verifier, "role revoked");
            Ok(())
        })
    }

    /// Add an auditor. Owner only.
    pub fn add_auditor(&mut self, caller: &PrincipalId, member: &PrincipalId) -> Result<(), EngineError> {
        self.scoped("add_auditor", caller, |engine| {
            engine.gate.ensure_open()?;
            let entry = engine.prepare_entry(member, ActionKind::RoleGranted, caller)?;
            engine
                .authority
                .add_auditor(&Actor::from(caller), Actor::from(member))?;
            engine.ledger.commit(entry);
            tracing::info!(owner = %caller, member = %member, role = %Role::Auditor, "role granted");
            Ok(())
        })
    }

    /// Remove an auditor. Owner only.
    pub fn remove_auditor(
        &mut self,
        caller: &PrincipalId,
        member: &PrincipalId,
    ) -> Result<(), EngineError> {
        self.scoped("remove_auditor", caller, |engine| {
            engine.gate.ensure_open()?;
            let entry = engine.prepare_entry(member, ActionKind::RoleRevoked, caller)?;
            engine
                .authority
                .remove_auditor(&Actor::from(caller), &Actor::from(member))?;
            engine.ledger.commit(entry);
            tracing::info!(owner = %caller, member = %member, role = %Role::Auditor, "role revoked");
            Ok(())
        })
    }

    /// Hand ownership to `new_owner`. Owner only.
    pub fn transfer_ownership(
        &mut self,
        caller: &PrincipalId,
        new_owner: &PrincipalId,
    ) -> Result<(), EngineError> {
        self.scoped("transfer_ownership", caller, |engine| {
            engine.gate.ensure_open()?;
            let entry = engine.prepare_entry(new_owner, ActionKind::OwnershipTransferred, caller)?;
            engine
                .authority
                .transfer_ownership(&Actor::from(caller), Actor::from(new_owner))?;
            engine.ledger.commit(entry);
            tracing::info!(former = %caller, owner = %new_owner, "ownership transferred");
            Ok(())
        })
    }

    /// Clear `principal`'s submission so it may submit again. Owner only.
    /// Every grant on the cleared handle is revoked.
    ///
    /// # Errors
    ///
    /// [`EngineError::Unauthorized`]; [`EngineError::NotFound`] if there is
    /// nothing to reset.
    pub fn reset(&mut self, caller: &PrincipalId, principal: &PrincipalId) -> Result<(), EngineError> {
        self.scoped("reset", caller, |engine| {
            engine.gate.ensure_open()?;
            let entry = engine.prepare_entry(principal, ActionKind::Reset, caller)?;
            let slot = engine.config.attribute_slot.clone();
            let cleared = engine
                .store
                .reset(&engine.authority, &Actor::from(caller), principal, &slot)?;
            engine.permissions.revoke(&cleared.handle.untyped());
            engine.ledger.commit(entry);
            tracing::info!(owner = %caller, principal = %principal, "submission reset");
            Ok(())
        })
    }

    /// Engage the lifecycle gate. Owner only.
    ///
    /// # Errors
    ///
    /// [`EngineError::Unauthorized`]; [`EngineError::Paused`] if already
    /// paused.
    pub fn pause(&mut self, caller: &PrincipalId) -> Result<(), EngineError> {
        self.scoped("pause", caller, |engine| {
            engine.authority.require(&Actor::from(caller), Role::Owner)?;
            engine.gate.ensure_open()?;
            let entry = engine.prepare_entry(caller, ActionKind::Paused, caller)?;
            engine.gate.pause()?;
            engine.ledger.commit(entry);
            tracing::info!(owner = %caller, "engine paused");
            Ok(())
        })
    }

    /// Release the lifecycle gate. Owner only; the one mutating entry
    /// point the gate does not block.
    ///
    /// # Errors
    ///
    /// [`EngineError::Unauthorized`]; [`EngineError::InvalidInput`] if not
    /// paused.
    pub fn unpause(&mut self, caller: &PrincipalId) -> Result<(), EngineError> {
        self.scoped("unpause", caller, |engine| {
            engine.authority.require(&Actor::from(caller), Role::Owner)?;
            let entry = engine.prepare_entry(caller, ActionKind::Unpaused, caller)?;
            engine.gate.unpause()?;
            engine.ledger.commit(entry);
            tracing::info!(owner = %caller, "engine unpaused");
            Ok(())
        })
    }

    // -----------------------------------------------------------------------
    // Audit reads
    // -----------------------------------------------------------------------

    /// Ledger entries about `subject` within `window`. Auditors only.
    pub fn query_audit_trail(
        &self,
        caller: &PrincipalId,
        subject: &PrincipalId,
        window: AuditWindow,
    ) -> Result<Vec<AuditEntry>, EngineError> {
        let hits = self
            .ledger
            .query(&self.authority, &Actor::from(caller), subject, window)?;
        Ok(hits.into_iter().cloned().collect())
    }

    /// The ledger entry at `index`. Auditors only.
    pub fn audit_entry(&self, caller: &PrincipalId, index: u64) -> Result<AuditEntry, EngineError> {
        self.ledger
            .entry(&self.authority, &Actor::from(caller), index)
            .cloned()
    }

    /// Every ledger entry, for persistence. Auditors only.
    pub fn export_audit_trail(&self, caller: &PrincipalId) -> Result<Vec<AuditEntry>, EngineError> {
        self.authority.require(&Actor::from(caller), Role::Auditor)?;
        Ok(self.ledger.entries().to_vec())
    }

    /// Number of ledger entries.
    pub fn audit_len(&self) -> usize {
        self.ledger.len()
    }

    /// Latest chain hash.
    pub fn audit_head(&self) -> cav_core::ContentDigest {
        self.ledger.head()
    }

    /// Recompute the audit chain from genesis.
    pub fn verify_audit_chain(&self) -> Result<(), LedgerIntegrityError> {
        self.ledger.verify_chain()
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn actor(&self) -> Actor {
        Actor::Context(self.context)
    }

    /// Run one operation, then drop its transient allowances whatever the
    /// outcome.
    fn scoped<R>(
        &mut self,
        op: &'static str,
        caller: &PrincipalId,
        f: impl FnOnce(&mut Self) -> Result<R, EngineError>,
    ) -> Result<R, EngineError> {
        let result = f(self);
        self.permissions.end_operation();
        if let Err(ref err) = result {
            tracing::debug!(op, principal = %caller, error = %err, "operation rejected");
        }
        result
    }

    fn prepare_entry(
        &self,
        subject: &PrincipalId,
        action: ActionKind,
        actor: &PrincipalId,
    ) -> Result<AuditEntry, EngineError> {
        self.ledger
            .prepare(subject, action, &Actor::from(actor), Timestamp::now())
    }

    fn ensure_bound<W: Width>(&self, handle: &EncryptedHandle<W>) -> Result<(), EngineError> {
        if handle.context() != self.context {
            return Err(EngineError::InvalidInput(format!(
                "handle {} is bound to {}, not {}",
                handle.id(),
                handle.context(),
                self.context
            )));
        }
        Ok(())
    }

    fn validate_bounds(&self, min: u8, max: u8) -> Result<(), EngineError> {
        if min > max {
            return Err(EngineError::InvalidInput(format!(
                "range minimum {min} exceeds maximum {max}"
            )));
        }
        let bound = self.config.constraint();
        if !bound.admits(min) || !bound.admits(max) {
            return Err(EngineError::InvalidInput(format!(
                "range [{min}, {max}] outside public bound [{}, {}]",
                bound.min, bound.max
            )));
        }
        Ok(())
    }

    fn validate_batch(&self, len: usize) -> Result<(), EngineError> {
        if len == 0 {
            return Err(EngineError::InvalidInput("batch must not be empty".into()));
        }
        if len > self.config.max_batch {
            return Err(EngineError::InvalidInput(format!(
                "batch of {len} exceeds maximum {}",
                self.config.max_batch
            )));
        }
        Ok(())
    }

    fn encode(&mut self, value: u8) -> Result<EncryptedHandle<Euint8>, EngineError> {
        let handle = self.coprocessor.trivial_u8(&self.context, value)?;
        self.permissions
            .allow_transient(&handle.untyped(), self.actor());
        Ok(handle)
    }

    fn compare(
        &mut self,
        op: CompareOp,
        lhs: &EncryptedHandle<Euint8>,
        rhs: &EncryptedHandle<Euint8>,
    ) -> Result<EncryptedHandle<Ebool>, EngineError> {
        let engine = self.actor();
        self.permissions.require_compute(&lhs.untyped(), &engine)?;
        self.permissions.require_compute(&rhs.untyped(), &engine)?;
        let out = self.coprocessor.compare(&self.context, op, lhs, rhs)?;
        self.permissions.allow_transient(&out.untyped(), engine);
        Ok(out)
    }

    fn logic(
        &mut self,
        op: LogicOp,
        lhs: &EncryptedHandle<Ebool>,
        rhs: &EncryptedHandle<Ebool>,
    ) -> Result<EncryptedHandle<Ebool>, EngineError> {
        let engine = self.actor();
        self.permissions.require_compute(&lhs.untyped(), &engine)?;
        self.permissions.require_compute(&rhs.untyped(), &engine)?;
        let out = self.coprocessor.logic(&self.context, op, lhs, rhs)?;
        self.permissions.allow_transient(&out.untyped(), engine);
        Ok(out)
    }

    fn range_check(
        &mut self,
        value: &EncryptedHandle<Euint8>,
        min: u8,
        max: u8,
    ) -> Result<EncryptedHandle<Ebool>, EngineError> {
        let lo = self.encode(min)?;
        let hi = self.encode(max)?;
        let above = self.compare(CompareOp::Ge, value, &lo)?;
        let below = self.compare(CompareOp::Le, value, &hi)?;
        self.logic(LogicOp::And, &above, &below)
    }

    fn grant_result<W: Width>(&mut self, handle: &EncryptedHandle<W>, principal: &PrincipalId) {
        let reference = handle.untyped();
        self.permissions.grant_compute(&reference, self.actor());
        self.permissions.grant_disclose(&reference, principal.clone());
    }

    fn commit_checks(
        &mut self,
        principal: &PrincipalId,
        outcomes: &[EncryptedHandle<Ebool>],
        entry: AuditEntry,
    ) {
        let slot: AttributeSlot = self.config.attribute_slot.clone();
        for outcome in outcomes {
            self.grant_result(outcome, principal);
            self.store.mark_checked(principal, &slot);
        }
        self.ledger.commit(entry);
    }
}

impl<C: Coprocessor> std::fmt::Debug for VerificationEngine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerificationEngine")
            .field("context", &self.context)
            .field("backend", &self.coprocessor.backend())
            .field("records", &self.store.len())
            .field("ranges", &self.ranges.len())
            .field("audit_entries", &self.ledger.len())
            .field("paused", &self.gate.is_paused())
            .finish()
    }
}
