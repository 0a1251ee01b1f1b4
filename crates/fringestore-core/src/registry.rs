//! Process-wide registry mapping commit paths to live stores (spec §3).
//!
//! Opening the same path twice from the same process returns the same
//! `Store` handle rather than two independent views of one file — this is
//! what makes `set_root`'s "already root of another live store" check and
//! `Store::open`'s idempotence possible. Entries are weak: a store with no
//! remaining external handle is simply gone from the map, it does not keep
//! itself alive. The registry lock is always acquired before, and released
//! before acquiring, any per-store lock — never the other way around — so
//! registry lookups can never deadlock against a store's reader/writer lock.

use crate::store::{Store, StoreHandle};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, Weak};

static REGISTRY: RwLock<Option<HashMap<PathBuf, Weak<StoreHandle>>>> = RwLock::new(None);

fn with_registry<R>(f: impl FnOnce(&mut HashMap<PathBuf, Weak<StoreHandle>>) -> R) -> R {
    let mut guard = REGISTRY.write().expect("store registry poisoned");
    f(guard.get_or_insert_with(HashMap::new))
}

/// Look up the live store committed at `path`, if this process already
/// holds one.
pub(crate) fn lookup(path: &Path) -> Option<Store> {
    with_registry(|map| {
        let handle = map.get(path)?.upgrade();
        if handle.is_none() {
            map.remove(path);
        }
        handle
    })
    .map(Store::from_handle)
}

pub(crate) fn register(path: &Path, store: &Store) {
    with_registry(|map| {
        map.insert(path.to_path_buf(), Arc::downgrade(&store.handle));
    });
}

pub(crate) fn unregister(path: &Path) {
    with_registry(|map| {
        map.remove(path);
    });
}
