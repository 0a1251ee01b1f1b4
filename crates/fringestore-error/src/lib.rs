//! Error taxonomy shared by every fringestore crate.
//!
//! One flat, `thiserror`-derived enum rather than a class/origin matrix: the
//! taxonomy in the spec is already a short, named list and callers match on
//! it directly (`is_not_found`, `is_codec_error`, ...) rather than grouping
//! by severity at this layer. Severity tiers (programmer / durability /
//! consistency) are a calling convention documented on each variant, not a
//! type-level split.

use std::path::PathBuf;
use thiserror::Error as ThisError;

/// The complete error surface returned by `fringestore-core` and
/// `fringestore`.
#[derive(Debug, ThisError)]
pub enum Error {
    /// `commit` or `set_commit_path` attempted with no commit path set.
    #[error("store has no commit path")]
    NoCommitPath,

    /// `commit` attempted with no root object set.
    #[error("store has no root object")]
    NoRootObject,

    /// The value codec failed to decode a byte stream.
    ///
    /// `offset` is the byte position of the failure when the underlying
    /// codec exposes one; CBOR's decoder does not always, so `None` is a
    /// legitimate value here, not a bug.
    #[error("codec error at offset {offset:?}: {message}")]
    CodecError {
        offset: Option<u64>,
        message: String,
    },

    /// A filesystem operation failed. This is a durability error: the
    /// in-memory state is left dirty so a retried `commit` can recover.
    #[error("io error at {path:?}: {source}")]
    Io {
        path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// `set_commit_path` targeted a path already occupied by another store.
    #[error("path conflict: {path:?}")]
    PathConflict { path: PathBuf },

    /// `set_root` was called with an object that is already the root of
    /// another live store.
    #[error("object {uuid} is already root of another live store")]
    RootAlreadyOwned { uuid: String },

    /// `commit_transaction` or `rollback` called with no transaction open.
    #[error("no transaction is open")]
    NoTransaction,

    /// A lookup by UUID found nothing in the identity map.
    #[error("object not found: {uuid}")]
    ObjectNotFound { uuid: String },

    /// Any operation attempted on a store past `delete`. Terminal: the
    /// state machine never leaves this state.
    #[error("store at {path:?} has been deleted")]
    StoreDeleted { path: PathBuf },
}

impl Error {
    #[must_use]
    pub fn io(path: impl Into<Option<PathBuf>>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::ObjectNotFound { .. })
    }

    #[must_use]
    pub const fn is_codec_error(&self) -> bool {
        matches!(self, Self::CodecError { .. })
    }

    /// Durability errors (I/O) never invalidate in-memory state; a
    /// subsequent `commit` is expected to retry. See spec §7.
    #[must_use]
    pub const fn is_durability_error(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Consistency errors are fatal: the store must quarantine to
    /// read-only. See spec §7.
    #[must_use]
    pub const fn is_consistency_error(&self) -> bool {
        matches!(self, Self::CodecError { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
