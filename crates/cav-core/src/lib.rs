#![deny(missing_docs)]

//! # cav-core: Foundational Types for Confidential Attribute Verification
//!
//! This crate is the leaf of the workspace DAG. It defines the type-system
//! primitives shared by the coprocessor boundary (`cav-fhe`) and the
//! verification engine (`cav-engine`).
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for identities.** A [`PrincipalId`] is not a
//!    [`ContextId`]; an [`Actor`] names either one explicitly. No bare
//!    strings cross a crate boundary as an identity.
//!
//! 2. **[`CanonicalBytes`] is the sole path to digest computation.** The
//!    audit chain hash and the mock coprocessor's input proofs both flow
//!    through `CanonicalBytes::new()` and [`sha256_digest()`].
//!
//! 3. **UTC-only timestamps.** [`Timestamp`] is truncated to seconds so that
//!    hashed records are byte-for-byte reproducible.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `cav-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, sha256_hex, ContentDigest};
pub use error::{CanonicalizationError, ValidationError};
pub use identity::{Actor, AttributeSlot, ContextId, PrincipalId};
pub use temporal::Timestamp;
