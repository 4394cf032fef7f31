//! # cav-engine: Confidential Attribute Verification
//!
//! Stores encrypted scalar attributes per principal, runs threshold, range
//! and peer checks over them through an encryption coprocessor, and keeps a
//! tamper-evident record of every action. The engine orchestrates handles;
//! it never sees a plaintext.
//!
//! ## Components
//!
//! - [`handles::HandleStore`]: `(principal, slot)` to submitted handle.
//! - [`permissions::PermissionRegistry`]: compute and disclose capability
//!   sets per handle, checked late at each use.
//! - [`ranges::RangeRegistry`]: owner-authored named ranges.
//! - [`authority::AuthorityRegistry`]: owner, verifiers, auditors.
//! - [`audit::AuditLedger`]: append-only hash-chained log.
//! - [`lifecycle::LifecycleGate`]: pause flag.
//! - [`engine::VerificationEngine`]: the entry points.
//! - [`shared::SharedEngine`]: serialized multi-threaded access.
//!
//! ## Example
//!
//! ```
//! use cav_core::PrincipalId;
//! use cav_engine::{EngineConfig, VerificationEngine};
//! use cav_fhe::MockCoprocessor;
//!
//! let owner = PrincipalId::new("registry").unwrap();
//! let alice = PrincipalId::new("alice").unwrap();
//! let mut engine =
//!     VerificationEngine::new(EngineConfig::development(), MockCoprocessor::new(), owner.clone())
//!         .unwrap();
//!
//! let input = MockCoprocessor::encrypt_input(&engine.context(), 25);
//! engine.submit(&alice, &input).unwrap();
//!
//! let working_age = engine.create_named_range(&owner, 18, 65, "WorkingAge").unwrap();
//! let result = engine.is_in_named_range(&alice, working_age).unwrap();
//! let disclosure = engine.disclose(&alice, &result).unwrap();
//! assert_eq!(engine.coprocessor().decrypt_bool(&disclosure.handle), Some(true));
//! ```

pub mod audit;
pub mod authority;
pub mod config;
pub mod engine;
pub mod error;
pub mod handles;
pub mod lifecycle;
pub mod permissions;
pub mod ranges;
pub mod shared;

pub use audit::{ActionKind, AuditEntry, AuditLedger, AuditWindow, LedgerIntegrityError, GENESIS};
pub use authority::{AuthorityRegistry, Role};
pub use config::{ConfigError, EngineConfig};
pub use engine::{Disclosure, VerificationEngine, VerificationResult};
pub use error::{EngineError, ErrorKind};
pub use handles::{AttributeRecord, HandleStore, SlotState};
pub use lifecycle::LifecycleGate;
pub use permissions::{Capability, PermissionGrant, PermissionRegistry};
pub use ranges::{NamedRange, RangeId, RangeRegistry};
pub use shared::SharedEngine;
