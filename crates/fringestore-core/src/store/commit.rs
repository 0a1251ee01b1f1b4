//! The commit protocol: encode the live identity map, write it durably,
//! reconcile index artifacts, and clear the dirty flag (spec §3, §4.3).
//!
//! A commit artifact is a single CBOR document: the root's UUID plus every
//! reachable object's `{uuid, type_tag, properties}`. Serialization walks
//! the identity map directly rather than following `Value::Ref` markers, so
//! reference cycles between descendants never cause unbounded recursion
//! (spec §9).

use super::{Snapshot, Store, StoreHandle, StoreInner, StoreState};
use crate::index;
use crate::object::{ObjectRecord, PropertyBag};
use crate::registry;
use crate::value::Value;
use fringestore_error::Error;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Serialize, Deserialize)]
struct StoredObject {
    uuid: Uuid,
    type_tag: String,
    properties: PropertyBag,
}

#[derive(Serialize, Deserialize)]
struct StoreDocument {
    root: Uuid,
    objects: Vec<StoredObject>,
}

/// Read and decode the artifact at `path` into an identity map. Records
/// load with exactly the properties they were committed with; unlike
/// fresh construction, `default_values` is never consulted here (spec
/// §4.2: the hook applies "once at object construction", not on load).
pub(crate) fn read_artifact(path: &Path) -> Result<(Uuid, HashMap<Uuid, ObjectRecord>), Error> {
    let bytes = fs::read(path).map_err(|source| Error::io(path.to_path_buf(), source))?;
    let document: StoreDocument = serde_cbor::from_slice(&bytes).map_err(|err| Error::CodecError {
        offset: Some(err.offset()),
        message: err.to_string(),
    })?;
    let mut identity_map = HashMap::with_capacity(document.objects.len());
    for object in document.objects {
        identity_map.insert(
            object.uuid,
            ObjectRecord {
                type_tag: object.type_tag,
                properties: object.properties,
            },
        );
    }
    Ok((document.root, identity_map))
}

fn encode_document(root: Uuid, identity_map: &HashMap<Uuid, ObjectRecord>) -> Result<Vec<u8>, Error> {
    let objects = identity_map
        .iter()
        .map(|(uuid, record)| StoredObject {
            uuid: *uuid,
            type_tag: record.type_tag.clone(),
            properties: record.properties.clone(),
        })
        .collect();
    serde_cbor::to_vec(&StoreDocument { root, objects }).map_err(|err| Error::CodecError {
        offset: None,
        message: err.to_string(),
    })
}

/// Write `bytes` to `path` via a same-directory temp file, `fsync`, then
/// rename, so a crash mid-write never leaves a half-written artifact in
/// place of a good one.
fn write_durably(path: &Path, bytes: &[u8]) -> Result<(), Error> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir).map_err(|source| Error::io(path.to_path_buf(), source))?;
    let tmp_path = dir.join(format!(
        ".{}.tmp",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("fringestore")
    ));
    let mut file = fs::File::create(&tmp_path).map_err(|source| Error::io(tmp_path.clone(), source))?;
    file.write_all(bytes).map_err(|source| Error::io(tmp_path.clone(), source))?;
    file.sync_all().map_err(|source| Error::io(tmp_path.clone(), source))?;
    fs::rename(&tmp_path, path).map_err(|source| Error::io(path.to_path_buf(), source))?;
    Ok(())
}

fn indexed_tuples(type_tag: &str, properties: &PropertyBag) -> Vec<(String, Value)> {
    let Some(descriptor) = crate::types::type_descriptor(type_tag) else {
        return Vec::new();
    };
    descriptor
        .indexed_property_names()
        .iter()
        .filter_map(|name| properties.get(name).map(|value| (name.clone(), value.clone())))
        .collect()
}

impl Store {
    /// Durably persist the store's current in-memory state. No-op if the
    /// store is already `Clean`. Fails with `Error::NoCommitPath` if no
    /// path has been assigned, `Error::NoRootObject` if no root is set.
    pub fn commit(&self) -> Result<(), Error> {
        let path = self.commit_path().ok_or(Error::NoCommitPath)?;
        self.dispatch_write(move |handle| commit_locked(handle, &path))
    }

    /// Remove this store's commit artifact and index artifacts and mark it
    /// `Deleted`. Terminal: every further operation but `state`/`commit_path`
    /// inspection fails afterward.
    pub fn delete(&self) -> Result<(), Error> {
        let mut guard = self.handle.inner.write().expect("store lock poisoned");
        guard.check_live()?;
        let path = guard.commit_path.clone();
        let root = guard.root;
        let identity_map = std::mem::take(&mut guard.identity_map);
        guard.state = StoreState::Deleted;
        drop(guard);

        if let (Some(path), Some(root)) = (&path, root) {
            if let Some(record) = identity_map.get(&root) {
                let tuples = indexed_tuples(&record.type_tag, &record.properties);
                if let Err(err) = index::remove_entries(path, &record.type_tag, &tuples) {
                    warn!(?err, "failed to remove index entries during delete");
                }
            }
            if path.exists() {
                fs::remove_file(path).map_err(|source| Error::io(path.clone(), source))?;
            }
        }
        if let Some(path) = &path {
            registry::unregister(path);
        }
        Ok(())
    }
}

fn commit_locked(handle: &StoreHandle, path: &Path) -> Result<(), Error> {
    let mut guard = handle.inner.write().expect("store lock poisoned");
    guard.check_live()?;
    if matches!(guard.state, StoreState::Clean) {
        return Ok(());
    }
    let root = guard.root.ok_or(Error::NoRootObject)?;
    if !guard.identity_map.contains_key(&root) {
        guard.state = StoreState::Quarantined;
        guard.quarantine_reason = Some("root uuid missing from identity map".to_string());
        return Err(Error::ObjectNotFound { uuid: root.to_string() });
    }

    let previous_tuples = read_artifact(path)
        .ok()
        .and_then(|(prev_root, prev_map)| {
            prev_map.get(&prev_root).map(|record| (record.type_tag.clone(), indexed_tuples(&record.type_tag, &record.properties)))
        });

    let bytes = encode_document(root, &guard.identity_map)?;
    write_durably(path, &bytes)?;

    let record = &guard.identity_map[&root];
    let new_tuples = indexed_tuples(&record.type_tag, &record.properties);
    if let Some((prev_type_tag, prev_tuples)) = previous_tuples {
        index::reconcile(path, &prev_type_tag, &prev_tuples, &record.type_tag, &new_tuples)?;
    } else {
        index::reconcile(path, &record.type_tag, &[], &record.type_tag, &new_tuples)?;
    }

    guard.state = StoreState::Clean;
    guard.transaction_stack.clear();
    info!(path = %path.display(), "store committed");
    Ok(())
}

impl StoreInner {
    pub(crate) fn push_snapshot(&mut self) {
        self.transaction_stack.push(self.snapshot());
    }

    pub(crate) fn pop_snapshot(&mut self) -> Option<Snapshot> {
        self.transaction_stack.pop()
    }
}
