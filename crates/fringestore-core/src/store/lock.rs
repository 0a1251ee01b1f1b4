//! Reader/writer locking (spec §5).
//!
//! `lock_read`/`lock_write` hold the store's `RwLock` for the duration of
//! the caller's closure, so the closure runs as one atomic critical section
//! against concurrent readers/writers. The closure is handed the guarded
//! `&StoreInner`/`&mut StoreInner` directly rather than the `Store` handle
//! itself: the lock is a plain `std::sync::RwLock`, not reentrant, so a
//! closure that went back through `Object`/`Store` methods (which take the
//! same lock) would deadlock. `lock_write_async` is the asynchronous
//! write critical section: it enqueues work onto this store's dedicated
//! writer thread and returns immediately, preserving submission order.
//! `dispatch_write` is the blocking counterpart used internally by
//! `commit` so that concurrent commits to the same store are strictly
//! ordered. Ordering across different stores is unspecified, matching the
//! original's per-instance `NSRecursiveLock`.

use super::{Store, StoreHandle, StoreInner};
use fringestore_error::Error;
use std::sync::mpsc;
use std::thread;
use tracing::{debug, warn};

type Job = Box<dyn FnOnce() + Send>;

pub(crate) struct WriteWorker {
    sender: mpsc::Sender<Job>,
}

impl WriteWorker {
    pub(crate) fn spawn() -> Self {
        let (sender, receiver) = mpsc::channel::<Job>();
        thread::Builder::new()
            .name("fringestore-writer".into())
            .spawn(move || {
                for job in receiver {
                    job();
                }
            })
            .expect("failed to spawn fringestore writer thread");
        Self { sender }
    }

    fn submit(&self, job: Job) {
        if self.sender.send(job).is_err() {
            debug!("fringestore writer thread gone, running job inline");
        }
    }
}

impl Store {
    /// Run a read-only critical section under the store's reader lock.
    /// The guard is held for `f`'s entire execution, so two threads in
    /// `lock_read` can observe an identical snapshot while a third waits in
    /// `lock_write` (spec §8).
    pub fn lock_read<R>(&self, f: impl FnOnce(&StoreInner) -> R) -> Result<R, Error> {
        let guard = self.handle.inner.read().expect("store lock poisoned");
        guard.check_live()?;
        Ok(f(&guard))
    }

    /// Run a synchronous write critical section under the store's writer
    /// lock, held for `f`'s entire execution.
    pub fn lock_write<R>(&self, f: impl FnOnce(&mut StoreInner) -> Result<R, Error>) -> Result<R, Error> {
        let mut guard = self.handle.inner.write().expect("store lock poisoned");
        guard.check_live()?;
        f(&mut guard)
    }

    /// Enqueue `f` onto this store's dedicated writer thread, spawning it
    /// on first use, and return immediately without waiting for it to run.
    /// Jobs submitted to the same store run in submission order; a failure
    /// is logged rather than surfaced, since the caller has already moved
    /// on.
    pub fn lock_write_async(&self, f: impl FnOnce(&Store) -> Result<(), Error> + Send + 'static) {
        let worker = self.handle.worker.get_or_init(WriteWorker::spawn);
        let store = self.clone();
        worker.submit(Box::new(move || {
            if let Err(err) = f(&store) {
                warn!(?err, "fringestore lock_write_async job failed");
            }
        }));
    }

    /// Queue `f` onto this store's dedicated writer thread, spawning it on
    /// first use, and block until it runs. Used internally by `commit` so
    /// that concurrent commits to the same store are strictly ordered.
    pub(crate) fn dispatch_write<R: Send + 'static>(
        &self,
        f: impl FnOnce(&StoreHandle) -> Result<R, Error> + Send + 'static,
    ) -> Result<R, Error> {
        let worker = self.handle.worker.get_or_init(WriteWorker::spawn);
        let (tx, rx) = mpsc::channel();
        let handle = self.handle.clone();
        worker.submit(Box::new(move || {
            let result = f(&handle);
            let _ = tx.send(result);
        }));
        rx.recv().unwrap_or(Err(Error::NoTransaction))
    }
}
