//! Index artifacts: small pointer files mapping an indexed property's
//! current value to the stores that hold it (spec §3).
//!
//! Each entry is a file, not a symlink — portable across filesystems that
//! don't support symlinks (notably some removable/network volumes), and
//! trivially readable with a plain file read instead of needing
//! `readlink`. Its name is the [`crate::safe_name::filename_safe`] encoding
//! of the commit path it points at; its contents are that same path, so a
//! reader never has to reverse the encoding to resolve the target.

use crate::safe_name::{filename_safe, filename_unsafe};
use crate::store::Store;
use crate::value::Value;
use fringestore_error::Error;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

fn index_root(commit_path: &Path) -> PathBuf {
    commit_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(".fringestore-index")
}

fn entry_dir(commit_path: &Path, type_tag: &str, property: &str, value: &Value) -> Option<PathBuf> {
    let descriptor = crate::types::type_descriptor(type_tag)?;
    descriptor.index_dir_for(&index_root(commit_path), property, value)
}

fn entry_file(dir: &Path, commit_path: &Path) -> PathBuf {
    dir.join(filename_safe(&commit_path.to_string_lossy()))
}

fn insert_one(commit_path: &Path, type_tag: &str, property: &str, value: &Value) -> Result<(), Error> {
    let Some(dir) = entry_dir(commit_path, type_tag, property, value) else {
        return Ok(());
    };
    fs::create_dir_all(&dir).map_err(|source| Error::io(dir.clone(), source))?;
    let file = entry_file(&dir, commit_path);
    fs::write(&file, commit_path.to_string_lossy().as_bytes()).map_err(|source| Error::io(file, source))
}

fn remove_one(commit_path: &Path, type_tag: &str, property: &str, value: &Value) -> Result<(), Error> {
    let Some(dir) = entry_dir(commit_path, type_tag, property, value) else {
        return Ok(());
    };
    let file = entry_file(&dir, commit_path);
    if file.exists() {
        fs::remove_file(&file).map_err(|source| Error::io(file, source))?;
    }
    Ok(())
}

/// Update index artifacts so they reflect `new_tuples` instead of
/// `prev_tuples`: entries present only in `prev_tuples` are removed,
/// entries present only in `new_tuples` are added. Entries unchanged
/// between the two are left alone.
pub(crate) fn reconcile(
    commit_path: &Path,
    prev_type_tag: &str,
    prev_tuples: &[(String, Value)],
    new_type_tag: &str,
    new_tuples: &[(String, Value)],
) -> Result<(), Error> {
    for (property, value) in prev_tuples {
        if !new_tuples.iter().any(|(p, v)| p == property && v == value) {
            remove_one(commit_path, prev_type_tag, property, value)?;
        }
    }
    for (property, value) in new_tuples {
        if !prev_tuples.iter().any(|(p, v)| p == property && v == value) {
            insert_one(commit_path, new_type_tag, property, value)?;
        }
    }
    Ok(())
}

/// Remove every index entry for the given tuples, unconditionally. Used by
/// `Store::delete`.
pub(crate) fn remove_entries(commit_path: &Path, type_tag: &str, tuples: &[(String, Value)]) -> Result<(), Error> {
    for (property, value) in tuples {
        remove_one(commit_path, type_tag, property, value)?;
    }
    Ok(())
}

/// Every store committed under an indexed property bucket whose value
/// equals `value`, reading pointer files back into live stores. Mirrors
/// the original `+rootObjectsAtPath:limit:` lookup.
pub(crate) fn root_objects_at(
    under: &Path,
    type_tag: &str,
    property: &str,
    value: &Value,
    limit: Option<usize>,
) -> Result<Vec<Store>, Error> {
    let Some(descriptor) = crate::types::type_descriptor(type_tag) else {
        return Ok(Vec::new());
    };
    let base = under.join(".fringestore-index");
    let Some(dir) = descriptor.index_dir_for(&base, property, value) else {
        return Ok(Vec::new());
    };
    let entries = match fs::read_dir(&dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(source) => return Err(Error::io(dir, source)),
    };

    let mut stores = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| Error::io(dir.clone(), source))?;
        let Some(name) = entry.file_name().to_str().map(str::to_owned) else {
            continue;
        };
        let Some(target) = filename_unsafe(&name) else {
            warn!(name, "skipping malformed index entry name");
            continue;
        };
        match Store::open(&target) {
            Ok(store) => stores.push(store),
            Err(err) => warn!(?err, target, "skipping unopenable index entry"),
        }
        if let Some(limit) = limit {
            if stores.len() >= limit {
                break;
            }
        }
    }
    Ok(stores)
}

/// The union of [`root_objects_at`] over every directory in `dirs`,
/// deduplicated by commit path and capped at `limit` across the whole
/// union rather than per directory (spec §4.4, §6 Utilities).
pub(crate) fn root_objects_at_all(
    dirs: &[PathBuf],
    type_tag: &str,
    property: &str,
    value: &Value,
    limit: Option<usize>,
) -> Result<Vec<Store>, Error> {
    let mut seen = std::collections::HashSet::new();
    let mut stores = Vec::new();
    for dir in dirs {
        if let Some(limit) = limit {
            if stores.len() >= limit {
                break;
            }
        }
        let remaining = limit.map(|limit| limit - stores.len());
        for store in root_objects_at(dir, type_tag, property, value, remaining)? {
            let fresh = match store.commit_path() {
                Some(path) => seen.insert(path),
                None => true,
            };
            if !fresh {
                continue;
            }
            stores.push(store);
            if let Some(limit) = limit {
                if stores.len() >= limit {
                    break;
                }
            }
        }
    }
    Ok(stores)
}

/// Remove every index entry whose target no longer exists on disk, and any
/// directory left empty by that removal. A maintenance sweep (spec §3);
/// not run as part of ordinary `commit`.
pub(crate) fn clean_indexes(under: &Path) -> Result<(), Error> {
    let root = under.join(".fringestore-index");
    if !root.exists() {
        return Ok(());
    }
    sweep_dir(&root)?;
    Ok(())
}

fn sweep_dir(dir: &Path) -> Result<bool, Error> {
    let mut is_empty = true;
    let entries = fs::read_dir(dir).map_err(|source| Error::io(dir.to_path_buf(), source))?;
    for entry in entries {
        let entry = entry.map_err(|source| Error::io(dir.to_path_buf(), source))?;
        let path = entry.path();
        if path.is_dir() {
            if sweep_dir(&path)? {
                fs::remove_dir(&path).map_err(|source| Error::io(path, source))?;
            } else {
                is_empty = false;
            }
        } else {
            let stale = entry
                .file_name()
                .to_str()
                .and_then(filename_unsafe)
                .is_none_or(|target| !Path::new(&target).exists());
            if stale {
                fs::remove_file(&path).map_err(|source| Error::io(path, source))?;
            } else {
                is_empty = false;
            }
        }
    }
    Ok(is_empty)
}
