//! Scoped locks coordinating cache access across threads and processes
//!
//! Advisory OS file locks arbitrate between cooperating processes, but
//! their semantics within a single process are per-handle and would not
//! stop two threads from racing. A process-local mutex keyed by the
//! canonical lock path is layered on top: the mutex is taken first and
//! released last, so at most one thread per process ever contends for
//! the OS lock.

use crate::errors::{Error, Result};
use dashmap::DashMap;
use fs2::FileExt;
use parking_lot::lock_api::ArcMutexGuard;
use parking_lot::{Mutex, RawMutex};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Produces scoped exclusive locks bound to lock-file paths
///
/// Cache instances sharing a cache directory within one process must
/// share a factory; the OS lock alone does not serialize same-process
/// access.
#[derive(Debug, Default)]
pub struct FileLockFactory {
    mutexes: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl FileLockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire an exclusive lock on the file at `path`, creating the
    /// file if needed. Blocks until the lock is free; there is no
    /// timeout and no cancellation.
    pub fn get_lock(&self, path: &Path) -> Result<ScopedLock> {
        let mutex = {
            let entry = self.mutexes.entry(canonical_key(path)).or_default();
            Arc::clone(entry.value())
        };
        let thread_guard = mutex.lock_arc();

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| Error::lock_unavailable(path, e))?;
        file.lock_exclusive()
            .map_err(|e| Error::lock_unavailable(path, e))?;

        Ok(ScopedLock {
            file,
            path: path.to_path_buf(),
            _thread_guard: thread_guard,
        })
    }
}

/// Exclusive lock handle over one lock file; released on drop
///
/// Owns both lock layers and releases them in reverse acquisition
/// order. The lock file itself is never deleted: evictors and fetchers
/// of the same version must keep rendezvousing on a stable path.
pub struct ScopedLock {
    file: File,
    path: PathBuf,
    _thread_guard: ArcMutexGuard<RawMutex, ()>,
}

impl Drop for ScopedLock {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to release file lock"
            );
        }
        // The thread guard drops after the OS lock is gone
    }
}

/// Canonical map key for a lock path; differently spelled but equal
/// paths must collide
fn canonical_key(path: &Path) -> PathBuf {
    if let Ok(real) = path.canonicalize() {
        return real;
    }
    // The lock file may not exist yet; canonicalize its directory
    match (path.parent(), path.file_name()) {
        (Some(parent), Some(name)) => parent
            .canonicalize()
            .map(|real| real.join(name))
            .unwrap_or_else(|_| path.to_path_buf()),
        _ => path.to_path_buf(),
    }
}
