//! The runtime object record and its handle type.
//!
//! An [`Object`] is a lightweight, clonable handle: `{uuid, owning store}`.
//! It never carries the property bag directly — all reads and writes go
//! through the owning store's reader/writer lock (spec §5), so a clone of an
//! `Object` and the handle returned from `Store::lookup` for the same UUID
//! always observe the same state. This is the idiomatic Rust rendering of
//! what the original expresses via a single mutable, reference-counted
//! Objective-C instance: shared mutable state lives behind one lock, handles
//! are freely copyable references to it.

use crate::store::StoreHandle;
use crate::value::{ObjectRef, Value};
use fringestore_error::Error;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use uuid::Uuid;

/// A property bag: name to value. `BTreeMap` keeps encode output
/// deterministically ordered by key, which is convenient for tests and
/// artifact diffing even though the spec does not require byte-identical
/// output across encoders.
pub type PropertyBag = BTreeMap<String, Value>;

/// In-memory record held by a store's identity map. `Object` is the handle
/// ordinary callers use instead; this type is public only so that
/// `Store::lock_read`/`lock_write` can hand the locked state straight to
/// their caller's closure without reacquiring the store's lock.
#[derive(Clone, Debug)]
pub struct ObjectRecord {
    pub type_tag: String,
    pub properties: PropertyBag,
}

/// A runtime record with a stable UUID, a type tag, a mutable property bag,
/// and a non-owning back-reference to its owning store (spec §3).
#[derive(Clone)]
pub struct Object {
    uuid: Uuid,
    store: Weak<StoreHandle>,
}

impl Object {
    pub(crate) fn new(uuid: Uuid, store: &Arc<StoreHandle>) -> Self {
        Self {
            uuid,
            store: Arc::downgrade(store),
        }
    }

    #[must_use]
    pub const fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// The store this object currently belongs to, or `None` if the store
    /// has been dropped from memory (the back-reference is non-owning).
    #[must_use]
    pub fn owning_store(&self) -> Option<crate::store::Store> {
        self.store.upgrade().map(crate::store::Store::from_handle)
    }

    fn handle(&self) -> Result<Arc<StoreHandle>, Error> {
        self.store
            .upgrade()
            .ok_or_else(|| Error::ObjectNotFound {
                uuid: self.uuid.to_string(),
            })
    }

    /// The object's type tag, as recorded in the owning store.
    pub fn type_tag(&self) -> Result<String, Error> {
        self.handle()?.type_tag_of(self.uuid)
    }

    /// Read one property. Missing properties read as `Value::Null`.
    pub fn get(&self, name: &str) -> Result<Value, Error> {
        self.handle()?.read_property(self.uuid, name)
    }

    /// Write one property, marking the owning store dirty.
    pub fn set(&self, name: &str, value: impl Into<Value>) -> Result<(), Error> {
        self.handle()?.write_property(self.uuid, name, value.into())
    }

    /// The serialization hook: a snapshot of the full property bag, suitable
    /// for the codec.
    pub fn to_serializable(&self) -> Result<PropertyBag, Error> {
        self.handle()?.properties_of(self.uuid)
    }

    /// A reference marker pointing at this object, for embedding in another
    /// object's property bag.
    pub fn as_ref_value(&self) -> Result<Value, Error> {
        Ok(Value::Ref(ObjectRef {
            type_tag: self.type_tag()?,
            uuid: self.uuid,
        }))
    }

    // ------------------------------------------------------------------
    // Ordered aggregates (List / OrderedSet): shared positional mutators.
    // ------------------------------------------------------------------

    fn read_ordered(&self, name: &str, ordered_set: bool) -> Result<Vec<Value>, Error> {
        match self.get(name)? {
            Value::Null => Ok(Vec::new()),
            Value::List(items) if !ordered_set => Ok(items),
            Value::OrderedSet(items) if ordered_set => Ok(items),
            other => Err(Error::CodecError {
                offset: None,
                message: format!("property {name:?} is not the expected aggregate kind: {other:?}"),
            }),
        }
    }

    fn write_ordered(&self, name: &str, items: Vec<Value>, ordered_set: bool) -> Result<(), Error> {
        let value = if ordered_set {
            Value::OrderedSet(items)
        } else {
            Value::List(items)
        };
        self.set(name, value)
    }

    fn ordered_len(&self, name: &str, ordered_set: bool) -> Result<usize, Error> {
        Ok(self.read_ordered(name, ordered_set)?.len())
    }

    fn ordered_get(&self, name: &str, index: usize, ordered_set: bool) -> Result<Option<Value>, Error> {
        Ok(self.read_ordered(name, ordered_set)?.into_iter().nth(index))
    }

    fn ordered_insert(
        &self,
        name: &str,
        index: usize,
        value: Value,
        ordered_set: bool,
    ) -> Result<(), Error> {
        let mut items = self.read_ordered(name, ordered_set)?;
        if ordered_set && items.contains(&value) {
            return Ok(());
        }
        let index = index.min(items.len());
        items.insert(index, value);
        self.write_ordered(name, items, ordered_set)
    }

    fn ordered_replace_range(
        &self,
        name: &str,
        range: std::ops::Range<usize>,
        values: Vec<Value>,
        ordered_set: bool,
    ) -> Result<(), Error> {
        let mut items = self.read_ordered(name, ordered_set)?;
        let end = range.end.min(items.len());
        let start = range.start.min(end);
        items.splice(start..end, values);
        self.write_ordered(name, items, ordered_set)
    }

    fn ordered_remove(&self, name: &str, index: usize, ordered_set: bool) -> Result<(), Error> {
        let mut items = self.read_ordered(name, ordered_set)?;
        if index < items.len() {
            items.remove(index);
        }
        self.write_ordered(name, items, ordered_set)
    }

    fn ordered_remove_range(
        &self,
        name: &str,
        range: std::ops::Range<usize>,
        ordered_set: bool,
    ) -> Result<(), Error> {
        let mut items = self.read_ordered(name, ordered_set)?;
        let end = range.end.min(items.len());
        let start = range.start.min(end);
        items.drain(start..end);
        self.write_ordered(name, items, ordered_set)
    }

    fn ordered_add(&self, name: &str, value: Value, ordered_set: bool) -> Result<(), Error> {
        let len = self.ordered_len(name, ordered_set)?;
        self.ordered_insert(name, len, value, ordered_set)
    }

    /// Position of the descendant with the given UUID within an ordered
    /// `List`/`OrderedSet` property, or `None` if absent. Restored from the
    /// original `-indexOfFringeObject:` helper (see SPEC_FULL §4.2).
    fn ordered_index_of(&self, name: &str, target: Uuid, ordered_set: bool) -> Result<Option<usize>, Error> {
        let items = self.read_ordered(name, ordered_set)?;
        Ok(items.iter().position(|v| matches!(v, Value::Ref(r) if r.uuid == target)))
    }

    // List (ordered, duplicates allowed)

    pub fn list_len(&self, name: &str) -> Result<usize, Error> {
        self.ordered_len(name, false)
    }
    pub fn list_get(&self, name: &str, index: usize) -> Result<Option<Value>, Error> {
        self.ordered_get(name, index, false)
    }
    pub fn list_insert(&self, name: &str, index: usize, value: impl Into<Value>) -> Result<(), Error> {
        self.ordered_insert(name, index, value.into(), false)
    }
    pub fn list_replace_range(
        &self,
        name: &str,
        range: std::ops::Range<usize>,
        values: Vec<Value>,
    ) -> Result<(), Error> {
        self.ordered_replace_range(name, range, values, false)
    }
    pub fn list_remove(&self, name: &str, index: usize) -> Result<(), Error> {
        self.ordered_remove(name, index, false)
    }
    pub fn list_remove_range(&self, name: &str, range: std::ops::Range<usize>) -> Result<(), Error> {
        self.ordered_remove_range(name, range, false)
    }
    pub fn list_add(&self, name: &str, value: impl Into<Value>) -> Result<(), Error> {
        self.ordered_add(name, value.into(), false)
    }
    pub fn index_of(&self, name: &str, target: Uuid) -> Result<Option<usize>, Error> {
        self.ordered_index_of(name, target, false)
    }

    // OrderedSet (ordered, unique)

    pub fn ordered_set_len(&self, name: &str) -> Result<usize, Error> {
        self.ordered_len(name, true)
    }
    pub fn ordered_set_get(&self, name: &str, index: usize) -> Result<Option<Value>, Error> {
        self.ordered_get(name, index, true)
    }
    pub fn ordered_set_insert(&self, name: &str, index: usize, value: impl Into<Value>) -> Result<(), Error> {
        self.ordered_insert(name, index, value.into(), true)
    }
    pub fn ordered_set_replace_range(
        &self,
        name: &str,
        range: std::ops::Range<usize>,
        values: Vec<Value>,
    ) -> Result<(), Error> {
        self.ordered_replace_range(name, range, values, true)
    }
    pub fn ordered_set_remove(&self, name: &str, index: usize) -> Result<(), Error> {
        self.ordered_remove(name, index, true)
    }
    pub fn ordered_set_remove_range(&self, name: &str, range: std::ops::Range<usize>) -> Result<(), Error> {
        self.ordered_remove_range(name, range, true)
    }
    pub fn ordered_set_add(&self, name: &str, value: impl Into<Value>) -> Result<(), Error> {
        self.ordered_add(name, value.into(), true)
    }
    pub fn ordered_set_index_of(&self, name: &str, target: Uuid) -> Result<Option<usize>, Error> {
        self.ordered_index_of(name, target, true)
    }

    // ------------------------------------------------------------------
    // Set (unordered, unique): whole-collection mutators only.
    // ------------------------------------------------------------------

    fn read_set(&self, name: &str) -> Result<Vec<Value>, Error> {
        match self.get(name)? {
            Value::Null => Ok(Vec::new()),
            Value::Set(items) => Ok(items),
            other => Err(Error::CodecError {
                offset: None,
                message: format!("property {name:?} is not a Set: {other:?}"),
            }),
        }
    }

    fn write_set(&self, name: &str, items: Vec<Value>) -> Result<(), Error> {
        self.set(name, Value::Set(items))
    }

    pub fn set_len(&self, name: &str) -> Result<usize, Error> {
        Ok(self.read_set(name)?.len())
    }

    pub fn set_contains(&self, name: &str, value: &Value) -> Result<bool, Error> {
        Ok(self.read_set(name)?.iter().any(|v| v == value))
    }

    pub fn set_insert(&self, name: &str, value: impl Into<Value>) -> Result<(), Error> {
        let value = value.into();
        let mut items = self.read_set(name)?;
        if !items.iter().any(|v| v == &value) {
            items.push(value);
        }
        self.write_set(name, items)
    }

    pub fn set_remove(&self, name: &str, value: &Value) -> Result<(), Error> {
        let mut items = self.read_set(name)?;
        items.retain(|v| v != value);
        self.write_set(name, items)
    }

    pub fn set_union(&self, name: &str, values: Vec<Value>) -> Result<(), Error> {
        let mut items = self.read_set(name)?;
        for value in values {
            if !items.iter().any(|v| v == &value) {
                items.push(value);
            }
        }
        self.write_set(name, items)
    }

    pub fn set_subtract(&self, name: &str, values: &[Value]) -> Result<(), Error> {
        let mut items = self.read_set(name)?;
        items.retain(|v| !values.iter().any(|r| r == v));
        self.write_set(name, items)
    }
}

impl std::fmt::Debug for Object {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Object").field("uuid", &self.uuid).finish()
    }
}

/// Objects compare equal by UUID alone; structural equality is not defined
/// at this level (spec §4.2).
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.uuid == other.uuid
    }
}
impl Eq for Object {}
