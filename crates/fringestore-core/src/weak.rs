//! A generic non-owning wrapper, used anywhere the engine needs to hold a
//! reference without extending an object's or a store's lifetime — the
//! Rust counterpart to the original `FringeWeakObject`.

use std::sync::{Arc, Weak};

/// Wraps a `T` behind a weak reference. `target()` returns `None` once
/// every strong owner has dropped its `Arc<T>`.
pub struct WeakHolder<T> {
    target: Weak<T>,
}

impl<T> WeakHolder<T> {
    #[must_use]
    pub fn wrap(target: &Arc<T>) -> Self {
        Self {
            target: Arc::downgrade(target),
        }
    }

    #[must_use]
    pub fn target(&self) -> Option<Arc<T>> {
        self.target.upgrade()
    }
}

impl<T> Clone for WeakHolder<T> {
    fn clone(&self) -> Self {
        Self {
            target: self.target.clone(),
        }
    }
}
