//! The store: a transactional unit holding one root object and its
//! descendant graph, with an on-disk commit artifact and an in-memory
//! identity map (spec §3, §4.3, §5).

pub mod commit;
pub mod lock;
pub mod transaction;

use crate::index;
use crate::object::{Object, ObjectRecord, PropertyBag};
use crate::registry;
use crate::types::type_descriptor;
use crate::value::Value;
use fringestore_error::Error;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, RwLock};
use uuid::Uuid;

pub(crate) use lock::WriteWorker;

/// Extension every commit artifact carries on disk.
pub const STORE_FILE_EXTENSION: &str = "fringe";

/// Lifecycle state of a store (spec §4.3). `Quarantined` is entered once,
/// from `Clean` or `Dirty`, on a consistency error, and like `Deleted` is
/// terminal: every further operation but inspection fails.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StoreState {
    /// Constructed in memory, never committed.
    Fresh,
    /// On disk and in memory agree.
    Clean,
    /// In memory has uncommitted changes.
    Dirty,
    /// `delete` has run; terminal.
    Deleted,
    /// A consistency error was detected; terminal, read-only.
    Quarantined,
}

/// A point-in-time copy of a store's root and identity map, taken by
/// `begin-transaction` and restored by `rollback`.
pub struct Snapshot {
    pub root: Option<Uuid>,
    pub identity_map: HashMap<Uuid, ObjectRecord>,
}

/// The data a store's reader/writer lock guards. Public only so that
/// `Store::lock_read`/`lock_write` can hand it straight to their caller's
/// closure — going back through `Object`/`Store` methods from inside one
/// of those closures would try to reacquire this same lock and deadlock.
pub struct StoreInner {
    pub state: StoreState,
    pub commit_path: Option<PathBuf>,
    pub root: Option<Uuid>,
    pub identity_map: HashMap<Uuid, ObjectRecord>,
    pub transaction_stack: Vec<Snapshot>,
    pub quarantine_reason: Option<String>,
}

impl StoreInner {
    pub(crate) fn check_live(&self) -> Result<(), Error> {
        match self.state {
            StoreState::Deleted => Err(Error::StoreDeleted {
                path: self.commit_path.clone().unwrap_or_default(),
            }),
            StoreState::Quarantined => Err(Error::CodecError {
                offset: None,
                message: self
                    .quarantine_reason
                    .clone()
                    .unwrap_or_else(|| "store is quarantined".to_string()),
            }),
            _ => Ok(()),
        }
    }

    pub(crate) fn mark_dirty(&mut self) {
        if matches!(self.state, StoreState::Clean | StoreState::Fresh) {
            self.state = StoreState::Dirty;
        }
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot {
            root: self.root,
            identity_map: self.identity_map.clone(),
        }
    }
}

/// Bag a newly constructed object should start with: the registered type's
/// defaults, with the caller's explicit `properties` layered on top so any
/// key they specify wins (spec §4.2 "set-default-values", invoked once at
/// construction, before the first user mutation).
fn seeded_properties(type_tag: &str, properties: PropertyBag) -> PropertyBag {
    let mut bag = type_descriptor(type_tag)
        .map(|descriptor| descriptor.default_values())
        .unwrap_or_default();
    bag.extend(properties);
    bag
}

/// Remove every `Value::Ref` marker pointing at `target`, recursing into
/// aggregates so a reference nested in a `List`/`Set`/`OrderedSet`/`Map` is
/// stripped too. A top-level scalar `Ref` becomes `Null`; a `Ref` inside an
/// aggregate is dropped from it entirely.
fn strip_value(value: &mut Value, target: Uuid) {
    match value {
        Value::Ref(object_ref) if object_ref.uuid == target => *value = Value::Null,
        Value::List(items) | Value::OrderedSet(items) | Value::Set(items) => {
            items.retain(|item| !matches!(item, Value::Ref(object_ref) if object_ref.uuid == target));
            for item in items.iter_mut() {
                strip_value(item, target);
            }
        }
        Value::Map(map) => strip_references(map, target),
        _ => {}
    }
}

fn strip_references(bag: &mut PropertyBag, target: Uuid) {
    for value in bag.values_mut() {
        strip_value(value, target);
    }
}

/// The shared, lockable state behind every [`Object`] and [`Store`] handle
/// for one store. Never exposed to callers directly.
pub struct StoreHandle {
    pub(crate) inner: RwLock<StoreInner>,
    pub(crate) worker: OnceLock<WriteWorker>,
}

impl StoreHandle {
    fn new(state: StoreState, commit_path: Option<PathBuf>, root: Option<Uuid>, identity_map: HashMap<Uuid, ObjectRecord>) -> Arc<Self> {
        Arc::new(Self {
            inner: RwLock::new(StoreInner {
                state,
                commit_path,
                root,
                identity_map,
                transaction_stack: Vec::new(),
                quarantine_reason: None,
            }),
            worker: OnceLock::new(),
        })
    }

    pub(crate) fn type_tag_of(&self, uuid: Uuid) -> Result<String, Error> {
        let guard = self.inner.read().expect("store lock poisoned");
        guard.check_live()?;
        guard
            .identity_map
            .get(&uuid)
            .map(|record| record.type_tag.clone())
            .ok_or_else(|| Error::ObjectNotFound { uuid: uuid.to_string() })
    }

    pub(crate) fn read_property(&self, uuid: Uuid, name: &str) -> Result<crate::value::Value, Error> {
        let guard = self.inner.read().expect("store lock poisoned");
        guard.check_live()?;
        let record = guard
            .identity_map
            .get(&uuid)
            .ok_or_else(|| Error::ObjectNotFound { uuid: uuid.to_string() })?;
        Ok(record.properties.get(name).cloned().unwrap_or(crate::value::Value::Null))
    }

    pub(crate) fn write_property(&self, uuid: Uuid, name: &str, value: crate::value::Value) -> Result<(), Error> {
        let mut guard = self.inner.write().expect("store lock poisoned");
        guard.check_live()?;
        {
            let record = guard
                .identity_map
                .get_mut(&uuid)
                .ok_or_else(|| Error::ObjectNotFound { uuid: uuid.to_string() })?;
            record.properties.insert(name.to_string(), value);
        }
        guard.mark_dirty();
        Ok(())
    }

    pub(crate) fn properties_of(&self, uuid: Uuid) -> Result<PropertyBag, Error> {
        let guard = self.inner.read().expect("store lock poisoned");
        guard.check_live()?;
        guard
            .identity_map
            .get(&uuid)
            .map(|record| record.properties.clone())
            .ok_or_else(|| Error::ObjectNotFound { uuid: uuid.to_string() })
    }
}

/// A handle to one store. Clonable and cheap: clones share the same
/// underlying lock and identity map.
#[derive(Clone)]
pub struct Store {
    pub(crate) handle: Arc<StoreHandle>,
}

impl Store {
    pub(crate) fn from_handle(handle: Arc<StoreHandle>) -> Self {
        Self { handle }
    }

    /// Open the store committed at `path`, reading and decoding its
    /// artifact. Fails with `Error::Io` if the file is missing or
    /// unreadable, or `Error::CodecError` if its contents don't decode.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        if let Some(existing) = registry::lookup(&path) {
            return Ok(existing);
        }
        let (root, identity_map) = commit::read_artifact(&path)?;
        let handle = StoreHandle::new(StoreState::Clean, Some(path.clone()), Some(root), identity_map);
        let store = Self::from_handle(handle);
        registry::register(&path, &store);
        Ok(store)
    }

    /// Construct a brand-new in-memory store with one root object of the
    /// given type, seeded with `properties`. Stands in for the original's
    /// "adopt a pre-built root" entry point: in this model an `Object`
    /// has no existence apart from an owning store, so adoption and
    /// construction are the same operation (see design notes).
    ///
    /// If `commit_path` is `None`, the registered type's
    /// `default_commit_path` is consulted: a type that declares one gets a
    /// store instantiated at that path with this object as root (spec §3).
    pub fn adopt(type_tag: &str, properties: PropertyBag, commit_path: Option<PathBuf>) -> Result<Self, Error> {
        let commit_path =
            commit_path.or_else(|| type_descriptor(type_tag).and_then(|descriptor| descriptor.default_commit_path()));
        if let Some(path) = &commit_path {
            if registry::lookup(path).is_some() {
                return Err(Error::PathConflict { path: path.clone() });
            }
        }
        let uuid = Uuid::new_v4();
        let mut identity_map = HashMap::new();
        identity_map.insert(
            uuid,
            ObjectRecord {
                type_tag: type_tag.to_string(),
                properties: seeded_properties(type_tag, properties),
            },
        );
        let handle = StoreHandle::new(StoreState::Fresh, commit_path.clone(), Some(uuid), identity_map);
        let store = Self::from_handle(handle);
        if let Some(path) = &commit_path {
            registry::register(path, &store);
        }
        Ok(store)
    }

    /// The store's root object, if one has been set.
    #[must_use]
    pub fn root(&self) -> Option<Object> {
        let guard = self.handle.inner.read().expect("store lock poisoned");
        guard.root.map(|uuid| Object::new(uuid, &self.handle))
    }

    /// Replace the root object. `object` must already belong to this
    /// store's identity map (construct it with [`Store::new_object`]
    /// first).
    pub fn set_root(&self, object: &Object) -> Result<(), Error> {
        let mut guard = self.handle.inner.write().expect("store lock poisoned");
        guard.check_live()?;
        if !guard.identity_map.contains_key(&object.uuid()) {
            return Err(Error::ObjectNotFound {
                uuid: object.uuid().to_string(),
            });
        }
        guard.root = Some(object.uuid());
        guard.mark_dirty();
        Ok(())
    }

    /// Construct a new descendant object in this store's identity map. It
    /// is reachable only once a reference to it is written into another
    /// object's property bag (or it becomes root via [`Store::set_root`]).
    pub fn new_object(&self, type_tag: &str, properties: PropertyBag) -> Result<Object, Error> {
        let mut guard = self.handle.inner.write().expect("store lock poisoned");
        guard.check_live()?;
        let uuid = Uuid::new_v4();
        guard.identity_map.insert(
            uuid,
            ObjectRecord {
                type_tag: type_tag.to_string(),
                properties: seeded_properties(type_tag, properties),
            },
        );
        guard.mark_dirty();
        Ok(Object::new(uuid, &self.handle))
    }

    /// Look up a live object by UUID. Identities remain valid across a
    /// rollback (spec §4.3): a UUID either resolves to the record current
    /// at the time of the call, or not at all.
    #[must_use]
    pub fn lookup(&self, uuid: Uuid) -> Option<Object> {
        let guard = self.handle.inner.read().expect("store lock poisoned");
        guard
            .identity_map
            .contains_key(&uuid)
            .then(|| Object::new(uuid, &self.handle))
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> StoreState {
        self.handle.inner.read().expect("store lock poisoned").state
    }

    /// The path this store commits to, if any.
    #[must_use]
    pub fn commit_path(&self) -> Option<PathBuf> {
        self.handle.inner.read().expect("store lock poisoned").commit_path.clone()
    }

    /// Assign or change the commit path. Fails if another live store is
    /// already registered at `path`.
    pub fn set_commit_path(&self, path: impl AsRef<Path>) -> Result<(), Error> {
        let path = path.as_ref().to_path_buf();
        if registry::lookup(&path).is_some() {
            return Err(Error::PathConflict { path });
        }
        let mut guard = self.handle.inner.write().expect("store lock poisoned");
        guard.check_live()?;
        let previous = guard.commit_path.replace(path.clone());
        drop(guard);
        if let Some(previous) = previous {
            registry::unregister(&previous);
        }
        registry::register(&path, self);
        Ok(())
    }

    /// Remove an object from the identity map and strip every `Value::Ref`
    /// elsewhere in the store that pointed at it (spec §4.5 non-root
    /// delete: "remove it from every property bag that references it
    /// within the same store, remove it from the identity map"). If `uuid`
    /// is the current root, the store is left with no root (a subsequent
    /// `commit` fails with `Error::NoRootObject` until a new one is set).
    /// Does not commit; callers that want the spec's full "... and commit"
    /// behavior should call [`Store::commit`] afterward (see
    /// `util::delete_object`).
    pub fn forget(&self, uuid: Uuid) -> Result<(), Error> {
        let mut guard = self.handle.inner.write().expect("store lock poisoned");
        guard.check_live()?;
        if !guard.identity_map.contains_key(&uuid) {
            return Err(Error::ObjectNotFound { uuid: uuid.to_string() });
        }
        for (other_uuid, record) in guard.identity_map.iter_mut() {
            if *other_uuid != uuid {
                strip_references(&mut record.properties, uuid);
            }
        }
        guard.identity_map.remove(&uuid);
        if guard.root == Some(uuid) {
            guard.root = None;
        }
        guard.mark_dirty();
        Ok(())
    }

    /// Current transaction nesting depth; `0` outside any transaction.
    #[must_use]
    pub fn transaction_depth(&self) -> usize {
        self.handle.inner.read().expect("store lock poisoned").transaction_stack.len()
    }

    /// Remove every index artifact with no corresponding live store commit
    /// path. A maintenance sweep, not part of ordinary commit (spec §3).
    pub fn clean_indexes(under: impl AsRef<Path>) -> Result<(), Error> {
        index::clean_indexes(under.as_ref())
    }

    /// Every root object committed under `dir` whose indexed property
    /// `property` currently equals `value`, up to `limit` (`None` or
    /// `Some(0)` means unbounded).
    pub fn root_objects_at(
        dir: impl AsRef<Path>,
        type_tag: &str,
        property: &str,
        value: &Value,
        limit: Option<usize>,
    ) -> Result<Vec<Self>, Error> {
        index::root_objects_at(dir.as_ref(), type_tag, property, value, normalize_limit(limit))
    }

    /// The union of [`Store::root_objects_at`] over every directory in
    /// `dirs`, deduplicated by commit path, capped at `limit` globally
    /// (`None` or `Some(0)` means unbounded) rather than per directory
    /// (spec §4.4, §6 Utilities).
    pub fn root_objects_at_all(
        dirs: impl IntoIterator<Item = impl AsRef<Path>>,
        type_tag: &str,
        property: &str,
        value: &Value,
        limit: Option<usize>,
    ) -> Result<Vec<Self>, Error> {
        let dirs: Vec<PathBuf> = dirs.into_iter().map(|dir| dir.as_ref().to_path_buf()).collect();
        index::root_objects_at_all(&dirs, type_tag, property, value, normalize_limit(limit))
    }
}

/// Spec convention: `limit = 0` means the same thing as `limit = None`,
/// unbounded.
fn normalize_limit(limit: Option<usize>) -> Option<usize> {
    limit.filter(|&n| n != 0)
}
