//! # cav-fhe: Encryption Coprocessor Boundary
//!
//! The verification engine never holds plaintext. It holds opaque
//! [`EncryptedHandle`]s and asks a [`Coprocessor`] to validate submitted
//! ciphertexts and to evaluate homomorphic operations over handles.
//!
//! ## Architecture
//!
//! - **Handles** (`handle.rs`): `EncryptedHandle<W>` carries an id, its
//!   value kind and the context it is bound to. The width parameter `W` is a
//!   sealed marker (`Euint8`, `Ebool`). Handles can only be minted inside
//!   this crate, i.e. by a coprocessor.
//!
//! - **Operations** (`ops.rs`): comparison, logical and arithmetic op kinds,
//!   plus the `EncryptedInput` / `InputConstraint` pair consumed by input
//!   validation.
//!
//! - **Traits** (`traits.rs`): the sealed [`Coprocessor`] trait. Only
//!   backends defined here can exist.
//!
//! - **Policy** (`policy.rs`): [`BackendPolicy`] rejects the mock backend in
//!   production mode.
//!
//! - **Mock** (`mock.rs`): [`MockCoprocessor`] keeps plaintexts in a private
//!   table and provides a test-only decryption oracle. No confidentiality.
//!
//! ## Crate Policy
//!
//! - Depends on `cav-core` only.
//! - No `unsafe`.

pub mod handle;
#[cfg(feature = "mock")]
pub mod mock;
pub mod ops;
pub mod policy;
pub mod traits;

pub use handle::{Ebool, EncryptedHandle, Euint8, HandleId, HandleRef, ValueKind, Width};
#[cfg(feature = "mock")]
pub use mock::MockCoprocessor;
pub use ops::{ArithOp, CompareOp, EncryptedInput, InputConstraint, LogicOp};
pub use policy::{BackendPolicy, CoprocessorBackend, PolicyError, PolicyMode};
pub use traits::{Coprocessor, CoprocessorError};
