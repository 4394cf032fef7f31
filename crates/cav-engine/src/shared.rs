//! # Shared Engine Handle
//!
//! The engine assumes operations arrive one at a time, each applied
//! atomically. [`SharedEngine`] provides that order inside one process:
//! every closure passed to [`SharedEngine::execute`] runs under a
//! `parking_lot::Mutex`, so operations from different threads are applied
//! in a total order and never interleave.

use std::sync::Arc;

use cav_fhe::Coprocessor;
use parking_lot::Mutex;

use crate::engine::VerificationEngine;

/// Clone-friendly, serialized access to one [`VerificationEngine`].
pub struct SharedEngine<C: Coprocessor> {
    inner: Arc<Mutex<VerificationEngine<C>>>,
}

impl<C: Coprocessor> Clone for SharedEngine<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Coprocessor> SharedEngine<C> {
    /// Wrap an engine.
    pub fn new(engine: VerificationEngine<C>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
        }
    }

    /// Apply one operation with exclusive access.
    pub fn execute<R>(&self, op: impl FnOnce(&mut VerificationEngine<C>) -> R) -> R {
        let mut engine = self.inner.lock();
        op(&mut engine)
    }

    /// Read engine state with exclusive access.
    pub fn read<R>(&self, op: impl FnOnce(&VerificationEngine<C>) -> R) -> R {
        let engine = self.inner.lock();
        op(&engine)
    }
}

impl<C: Coprocessor> std::fmt::Debug for SharedEngine<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedEngine")
            .field("handles", &Arc::strong_count(&self.inner))
            .finish()
    }
}
