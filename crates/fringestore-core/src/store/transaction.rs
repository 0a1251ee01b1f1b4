//! Nested in-memory transactions (spec §4.3).
//!
//! A transaction snapshots the identity map and root; `rollback` restores
//! it, `commit_transaction` discards it. Nothing here touches disk —
//! transactions bound in-memory mutation, `commit` is what makes a result
//! durable. Object identities survive a rollback: a UUID removed by the
//! rolled-back mutation simply stops resolving, rather than becoming a
//! dangling handle to a different record.

use super::Store;
use fringestore_error::Error;

impl Store {
    /// Open a new nested transaction, snapshotting current state.
    pub fn begin_transaction(&self) -> Result<(), Error> {
        let mut guard = self.handle.inner.write().expect("store lock poisoned");
        guard.check_live()?;
        guard.push_snapshot();
        Ok(())
    }

    /// Commit the innermost open transaction: its snapshot is discarded and
    /// its changes become part of the enclosing scope (or, with no
    /// enclosing transaction, the store's live state).
    pub fn commit_transaction(&self) -> Result<(), Error> {
        let mut guard = self.handle.inner.write().expect("store lock poisoned");
        guard.check_live()?;
        guard.pop_snapshot().ok_or(Error::NoTransaction)?;
        Ok(())
    }

    /// Discard every mutation made since the innermost `begin_transaction`,
    /// restoring the identity map and root to that point.
    pub fn rollback(&self) -> Result<(), Error> {
        let mut guard = self.handle.inner.write().expect("store lock poisoned");
        guard.check_live()?;
        let snapshot = guard.pop_snapshot().ok_or(Error::NoTransaction)?;
        guard.root = snapshot.root;
        guard.identity_map = snapshot.identity_map;
        guard.mark_dirty();
        Ok(())
    }
}
