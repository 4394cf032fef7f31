//! # Encrypted Handles
//!
//! An [`EncryptedHandle`] is an opaque reference to a ciphertext held by the
//! coprocessor. It is never mutated, carries no plaintext, and is bound to a
//! single [`ContextId`].
//!
//! ## Security Invariant
//!
//! `EncryptedHandle::mint` is `pub(crate)` and the type does not implement
//! `Deserialize`. Code outside this crate can clone, compare and serialize
//! handles it was given, but cannot fabricate one. Equality is identity
//! (id + context), never value equality.

use std::marker::PhantomData;

use cav_core::ContextId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier of a ciphertext inside the coprocessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HandleId(Uuid);

impl HandleId {
    pub(crate) fn fresh() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl std::fmt::Display for HandleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "handle:{}", self.0)
    }
}

/// The declared kind of an encrypted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// 8-bit unsigned integer.
    Uint8,
    /// Boolean.
    Bool,
}

impl ValueKind {
    /// Return the string value for serialization.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uint8 => "uint8",
            Self::Bool => "bool",
        }
    }
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

mod private {
    pub trait Sealed {}
}

/// Sealed marker for the width of an encrypted value.
pub trait Width:
    private::Sealed + Copy + Eq + std::hash::Hash + Send + Sync + std::fmt::Debug + 'static
{
    /// The plaintext type this width encrypts.
    type Plain: Copy + std::fmt::Debug + PartialEq;
    /// The runtime kind tag.
    const KIND: ValueKind;
}

/// Encrypted 8-bit unsigned integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Euint8;

/// Encrypted boolean.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ebool;

impl private::Sealed for Euint8 {}
impl private::Sealed for Ebool {}

impl Width for Euint8 {
    type Plain = u8;
    const KIND: ValueKind = ValueKind::Uint8;
}

impl Width for Ebool {
    type Plain = bool;
    const KIND: ValueKind = ValueKind::Bool;
}

/// Opaque, context-bound reference to a ciphertext of width `W`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(bound = "")]
pub struct EncryptedHandle<W: Width> {
    id: HandleId,
    kind: ValueKind,
    context: ContextId,
    #[serde(skip)]
    _width: PhantomData<W>,
}

impl<W: Width> EncryptedHandle<W> {
    pub(crate) fn mint(context: ContextId) -> Self {
        Self {
            id: HandleId::fresh(),
            kind: W::KIND,
            context,
            _width: PhantomData,
        }
    }

    /// The handle's unique identifier.
    pub fn id(&self) -> HandleId {
        self.id
    }

    /// The declared value kind.
    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// The context this handle is bound to.
    pub fn context(&self) -> ContextId {
        self.context
    }

    /// Erase the width parameter.
    pub fn untyped(&self) -> HandleRef {
        HandleRef {
            id: self.id,
            kind: self.kind,
            context: self.context,
        }
    }
}

/// Width-erased handle reference, used as a key for permission lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct HandleRef {
    /// The handle's unique identifier.
    pub id: HandleId,
    /// The declared value kind.
    pub kind: ValueKind,
    /// The binding context.
    pub context: ContextId,
}

impl<W: Width> From<&EncryptedHandle<W>> for HandleRef {
    fn from(h: &EncryptedHandle<W>) -> Self {
        h.untyped()
    }
}

impl std::fmt::Display for HandleRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}<{}>@{}", self.id, self.kind, self.context)
    }
}
