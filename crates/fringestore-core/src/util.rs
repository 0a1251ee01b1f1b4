//! Free-function facade over the most common store operations, mirroring
//! the original `FringeDataUtils` category: save an object's owning store,
//! look up committed roots by an indexed property, delete an object.

use crate::object::Object;
use crate::store::Store;
use crate::value::Value;
use fringestore_error::Error;
use std::path::Path;

fn owning_store(object: &Object) -> Result<Store, Error> {
    object.owning_store().ok_or_else(|| Error::ObjectNotFound {
        uuid: object.uuid().to_string(),
    })
}

/// Commit the store that owns `object`.
pub fn save(object: &Object) -> Result<(), Error> {
    owning_store(object)?.commit()
}

/// Every root object committed under `dir` whose indexed `property`
/// currently equals `value`, up to `limit` (`None`/`Some(0)` is unbounded).
pub fn root_objects_at(
    dir: impl AsRef<Path>,
    type_tag: &str,
    property: &str,
    value: &Value,
    limit: Option<usize>,
) -> Result<Vec<Store>, Error> {
    Store::root_objects_at(dir, type_tag, property, value, limit)
}

/// The union of [`root_objects_at`] over every directory in `dirs`,
/// deduplicated by commit path, capped at `limit` globally
/// (`None`/`Some(0)` is unbounded).
pub fn root_objects_at_all(
    dirs: impl IntoIterator<Item = impl AsRef<Path>>,
    type_tag: &str,
    property: &str,
    value: &Value,
    limit: Option<usize>,
) -> Result<Vec<Store>, Error> {
    Store::root_objects_at_all(dirs, type_tag, property, value, limit)
}

/// Delete `object`. A root object's whole store is deleted (artifact and
/// index entries removed, state becomes `Deleted`); a descendant has its
/// references stripped from every other property bag in the store, is
/// removed from the identity map, and the store is committed (spec §4.5).
pub fn delete_object(object: &Object) -> Result<(), Error> {
    let store = owning_store(object)?;
    match store.root() {
        Some(root) if root.uuid() == object.uuid() => store.delete(),
        _ => {
            store.forget(object.uuid())?;
            store.commit()
        }
    }
}
