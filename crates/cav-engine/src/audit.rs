//! # Audit Ledger
//!
//! Append-only, hash-chained log of every committed engine action.
//!
//! ## Security Invariant
//!
//! Entry `i` carries `chain_hash = SHA256(JCS({prev, index, subject, action,
//! actor, timestamp}))` where `prev` is entry `i-1`'s chain hash, or
//! [`GENESIS`] for the first entry. Mutating any field of any historical
//! entry changes its recomputed hash and breaks every later link, which
//! [`AuditLedger::verify_chain`] reports.
//!
//! Appending is split into [`AuditLedger::prepare`] (pure, may fail on
//! canonicalization) and [`AuditLedger::commit`] (infallible), so engine
//! operations can finish every fallible step before mutating anything.
//!
//! Reads go through the [`AuthorityRegistry`]: only auditors may query.

use cav_core::{sha256_digest, Actor, CanonicalBytes, ContentDigest, PrincipalId, Timestamp};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::authority::{AuthorityRegistry, Role};
use crate::error::EngineError;

/// Chain value preceding the first entry.
pub const GENESIS: ContentDigest = ContentDigest::ZERO;

// ---------------------------------------------------------------------------
// ActionKind
// ---------------------------------------------------------------------------

/// The action an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// An encrypted attribute was accepted.
    Submitted,
    /// A threshold check produced a result handle.
    ThresholdChecked,
    /// An ad-hoc range check produced a result handle.
    RangeChecked,
    /// One or more named range checks produced result handles.
    NamedRangeChecked,
    /// One or more peer comparisons produced result handles.
    Compared,
    /// A verifier finalized a subject.
    Finalized,
    /// A handle was disclosed to its requester.
    Disclosed,
    /// Disclose capability was shared with another principal.
    Shared,
    /// A submission was cleared by the owner.
    Reset,
    /// A named range was created.
    RangeCreated,
    /// A named range was deactivated.
    RangeDeactivated,
    /// A principal joined a role set.
    RoleGranted,
    /// A principal left a role set.
    RoleRevoked,
    /// Ownership moved to a new principal.
    OwnershipTransferred,
    /// The lifecycle gate was engaged.
    Paused,
    /// The lifecycle gate was released.
    Unpaused,
}

impl ActionKind {
    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::ThresholdChecked => "threshold_checked",
            Self::RangeChecked => "range_checked",
            Self::NamedRangeChecked => "named_range_checked",
            Self::Compared => "compared",
            Self::Finalized => "finalized",
            Self::Disclosed => "disclosed",
            Self::Shared => "shared",
            Self::Reset => "reset",
            Self::RangeCreated => "range_created",
            Self::RangeDeactivated => "range_deactivated",
            Self::RoleGranted => "role_granted",
            Self::RoleRevoked => "role_revoked",
            Self::OwnershipTransferred => "ownership_transferred",
            Self::Paused => "paused",
            Self::Unpaused => "unpaused",
        }
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// AuditEntry
// ---------------------------------------------------------------------------

/// A single ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Position in the ledger, from 0.
    pub index: u64,
    /// The principal the action concerns.
    pub subject: PrincipalId,
    /// What happened.
    pub action: ActionKind,
    /// Who caused it.
    pub actor: Actor,
    /// When it was committed.
    pub timestamp: Timestamp,
    /// Chain hash over the previous hash and this entry's fields.
    pub chain_hash: ContentDigest,
}

/// The canonical preimage of a chain hash.
#[derive(Serialize)]
struct ChainLink<'a> {
    prev: String,
    index: u64,
    subject: &'a PrincipalId,
    action: ActionKind,
    actor: &'a Actor,
    timestamp: Timestamp,
}

fn chain_hash(
    prev: &ContentDigest,
    index: u64,
    subject: &PrincipalId,
    action: ActionKind,
    actor: &Actor,
    timestamp: Timestamp,
) -> Result<ContentDigest, cav_core::CanonicalizationError> {
    let link = ChainLink {
        prev: prev.to_hex(),
        index,
        subject,
        action,
        actor,
        timestamp,
    };
    Ok(sha256_digest(&CanonicalBytes::new(&link)?))
}

// ---------------------------------------------------------------------------
// AuditWindow
// ---------------------------------------------------------------------------

/// Inclusive time window for ledger queries. Open ends are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AuditWindow {
    /// Earliest timestamp included.
    pub from: Option<Timestamp>,
    /// Latest timestamp included.
    pub until: Option<Timestamp>,
}

impl AuditWindow {
    /// Every entry.
    pub fn all() -> Self {
        Self::default()
    }

    /// Entries between `from` and `until`, inclusive.
    pub fn between(from: Timestamp, until: Timestamp) -> Self {
        Self {
            from: Some(from),
            until: Some(until),
        }
    }

    /// Entries at or after `from`.
    pub fn since(from: Timestamp) -> Self {
        Self {
            from: Some(from),
            until: None,
        }
    }

    /// Entries within `span` before `now`, inclusive. A span reaching past
    /// the representable range leaves the lower end open.
    pub fn trailing(now: Timestamp, span: chrono::Duration) -> Self {
        Self {
            from: now
                .as_datetime()
                .checked_sub_signed(span)
                .map(Timestamp::from_utc),
            until: Some(now),
        }
    }

    /// Whether `ts` falls in the window.
    pub fn contains(&self, ts: &Timestamp) -> bool {
        self.from.map_or(true, |from| &from <= ts) && self.until.map_or(true, |until| ts <= &until)
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failure of [`AuditLedger::verify_chain`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerIntegrityError {
    /// The entry's stored hash or index does not match its recomputation.
    #[error("audit chain broken at entry {index}")]
    ChainBroken {
        /// First entry that fails.
        index: u64,
    },
    /// The entry could not be canonicalized for rehashing.
    #[error("audit entry {index} could not be rehashed: {reason}")]
    Unhashable {
        /// The offending entry.
        index: u64,
        /// Canonicalization failure.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// AuditLedger
// ---------------------------------------------------------------------------

/// Append-only hash-chained ledger.
#[derive(Clone)]
pub struct AuditLedger {
    entries: Vec<AuditEntry>,
    head: ContentDigest,
}

impl AuditLedger {
    /// Create an empty ledger anchored at [`GENESIS`].
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            head: GENESIS,
        }
    }

    /// Rebuild a ledger from previously exported entries. The entries are
    /// taken as-is; run [`AuditLedger::verify_chain`] before trusting them.
    pub fn from_entries(entries: Vec<AuditEntry>) -> Self {
        let head = entries.last().map_or(GENESIS, |e| e.chain_hash);
        Self { entries, head }
    }

    /// Build the next entry without appending it.
    ///
    /// # Errors
    ///
    /// [`EngineError::InvalidInput`] if the entry cannot be canonicalized.
    pub fn prepare(
        &self,
        subject: &PrincipalId,
        action: ActionKind,
        actor: &Actor,
        timestamp: Timestamp,
    ) -> Result<AuditEntry, EngineError> {
        let index = self.entries.len() as u64;
        let chain_hash = chain_hash(&self.head, index, subject, action, actor, timestamp)
            .map_err(|e| EngineError::InvalidInput(format!("audit entry: {e}")))?;
        Ok(AuditEntry {
            index,
            subject: subject.clone(),
            action,
            actor: actor.clone(),
            timestamp,
            chain_hash,
        })
    }

    /// Append an entry produced by [`AuditLedger::prepare`] on this ledger
    /// with no commit in between.
    pub fn commit(&mut self, entry: AuditEntry) -> &AuditEntry {
        debug_assert_eq!(entry.index, self.entries.len() as u64);
        self.head = entry.chain_hash;
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    /// Prepare and commit an entry stamped now.
    pub fn record(
        &mut self,
        subject: &PrincipalId,
        action: ActionKind,
        actor: &Actor,
    ) -> Result<&AuditEntry, EngineError> {
        let entry = self.prepare(subject, action, actor, Timestamp::now())?;
        Ok(self.commit(entry))
    }

    /// Entries concerning `subject` inside `window`. Auditors only.
    ///
    /// # Errors
    ///
    /// [`EngineError::Unauthorized`] for non-auditors.
    pub fn query(
        &self,
        authority: &AuthorityRegistry,
        caller: &Actor,
        subject: &PrincipalId,
        window: AuditWindow,
    ) -> Result<Vec<&AuditEntry>, EngineError> {
        authority.require(caller, Role::Auditor)?;
        Ok(self
            .entries
            .iter()
            .filter(|e| &e.subject == subject && window.contains(&e.timestamp))
            .collect())
    }

    /// The entry at `index`. Auditors only.
    ///
    /// # Errors
    ///
    /// [`EngineError::Unauthorized`] for non-auditors;
    /// [`EngineError::NotFound`] past the end.
    pub fn entry(
        &self,
        authority: &AuthorityRegistry,
        caller: &Actor,
        index: u64,
    ) -> Result<&AuditEntry, EngineError> {
        authority.require(caller, Role::Auditor)?;
        usize::try_from(index)
            .ok()
            .and_then(|i| self.entries.get(i))
            .ok_or_else(|| EngineError::NotFound(format!("audit entry {index}")))
    }

    /// All entries, unfiltered. Callers enforce the auditor check.
    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Chain hash of the latest entry, or [`GENESIS`].
    pub fn head(&self) -> ContentDigest {
        self.head
    }

    /// Recompute every chain hash from genesis.
    ///
    /// # Errors
    ///
    /// [`LedgerIntegrityError::ChainBroken`] at the first entry whose index
    /// or hash does not match.
    pub fn verify_chain(&self) -> Result<(), LedgerIntegrityError> {
        let mut prev = GENESIS;
        for (i, entry) in self.entries.iter().enumerate() {
            let index = i as u64;
            if entry.index != index {
                tracing::warn!(index, stored = entry.index, "audit entry index out of sequence");
                return Err(LedgerIntegrityError::ChainBroken { index });
            }
            let expected = chain_hash(
                &prev,
                index,
                &entry.subject,
                entry.action,
                &entry.actor,
                entry.timestamp,
            )
            .map_err(|e| LedgerIntegrityError::Unhashable {
                index,
                reason: e.to_string(),
            })?;
            if expected != entry.chain_hash {
                tracing::warn!(index, "audit chain hash mismatch");
                return Err(LedgerIntegrityError::ChainBroken { index });
            }
            prev = expected;
        }
        if prev != self.head {
            let index = self.entries.len().saturating_sub(1) as u64;
            tracing::warn!(index, "audit ledger head does not match last entry");
            return Err(LedgerIntegrityError::ChainBroken { index });
        }
        Ok(())
    }
}

impl Default for AuditLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AuditLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLedger")
            .field("entries", &self.entries.len())
            .field("head", &self.head.to_hex())
            .finish()
    }
}
