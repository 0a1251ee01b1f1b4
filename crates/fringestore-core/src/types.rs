//! Per-type-tag hooks, in place of the out-of-scope dynamic accessor
//! facility.
//!
//! The original design (`FringeObject`) is subclassed per root/descendant
//! type, and the subclass overrides static methods
//! (`+indexedPropertyNames`, `+indexURLForProperty:withValue:forObject:`,
//! `+defaultCommitPath`, `-setDefaultValues`). Rust has no implicit
//! per-instance virtual dispatch without code generation, and the schema
//! facility that would generate it is explicitly out of scope (spec §9). The
//! idiomatic stand-in is a small process-wide registry of trait objects keyed
//! by type tag: applications register one [`TypeDescriptor`] per root/
//! descendant type they declare, and the engine looks the descriptor up by
//! the object's `type_tag` whenever it needs one of these hooks.

use crate::object::PropertyBag;
use crate::value::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Per-type hooks a declaring application registers once per type tag.
pub trait TypeDescriptor: Send + Sync {
    /// The type tag this descriptor answers for.
    fn type_tag(&self) -> &str;

    /// Applied once at object construction, before the first user mutation.
    /// Instances loaded from disk skip this hook (spec §4.2).
    fn default_values(&self) -> PropertyBag {
        PropertyBag::new()
    }

    /// Properties this root type maintains index artifacts for.
    fn indexed_property_names(&self) -> &[String] {
        &[]
    }

    /// Resolve the index directory for one indexed property's current
    /// value, rooted under `base` (the store's own index root — see
    /// `crate::index`). The default buckets by type tag, property name,
    /// and a deterministic key derived from the value; override for a
    /// different on-disk layout.
    fn index_dir_for(&self, base: &Path, property: &str, value: &Value) -> Option<PathBuf> {
        Some(base.join(self.type_tag()).join(property).join(value.index_key()))
    }

    /// The commit path a freshly-created root of this type should adopt,
    /// if the type declares one (spec §3: "Creating a root object that
    /// declares a default commit path implicitly instantiates a store").
    fn default_commit_path(&self) -> Option<PathBuf> {
        None
    }
}

static REGISTRY: RwLock<Option<HashMap<String, Arc<dyn TypeDescriptor>>>> = RwLock::new(None);

fn with_registry<R>(f: impl FnOnce(&HashMap<String, Arc<dyn TypeDescriptor>>) -> R) -> R {
    let guard = REGISTRY.read().expect("type registry poisoned");
    match guard.as_ref() {
        Some(map) => f(map),
        None => f(&HashMap::new()),
    }
}

/// Register a type descriptor, replacing any previous registration for the
/// same type tag.
pub fn register_type(descriptor: Arc<dyn TypeDescriptor>) {
    let mut guard = REGISTRY.write().expect("type registry poisoned");
    guard
        .get_or_insert_with(HashMap::new)
        .insert(descriptor.type_tag().to_string(), descriptor);
}

/// Look up the descriptor registered for a type tag, if any.
#[must_use]
pub fn type_descriptor(type_tag: &str) -> Option<Arc<dyn TypeDescriptor>> {
    with_registry(|map| map.get(type_tag).cloned())
}
