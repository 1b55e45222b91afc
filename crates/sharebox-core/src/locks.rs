//! Per-path mutual exclusion for share operations.
//!
//! # Locking Strategy
//!
//! - Every mutating operation and every metadata read holds the lock for each
//!   canonical file path it touches, for the duration of the call.
//! - Operations touching several paths acquire them through
//!   [`PathLockManager::lock_many`], which sorts and deduplicates the keys so
//!   two operations can never wait on each other in opposite order.
//! - Recursive delete holds the target's lock and then takes each descendant
//!   file's lock as it reaches it (parent before child, never the reverse).
//!
//! Locks are created lazily and pruned once nobody holds them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::{ArcMutexGuard, Mutex, RawMutex};
use tracing::trace;

/// Guard returned by [`PathLockManager::lock`]; the lock is released on drop.
pub type PathGuard = ArcMutexGuard<RawMutex, ()>;

/// Central manager for per-path locks.
#[derive(Debug, Default)]
pub struct PathLockManager {
    locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl PathLockManager {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    fn entry(&self, path: &Path) -> Arc<Mutex<()>> {
        self.locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Block until the lock for `path` is held.
    pub fn lock(&self, path: &Path) -> PathGuard {
        let lock = self.entry(path);
        let guard = lock.lock_arc();
        trace!(path = %path.display(), "Path lock acquired");
        guard
    }

    /// Acquire locks on several paths in sorted order.
    ///
    /// Duplicate paths are locked once.
    pub fn lock_many(&self, paths: &[&Path]) -> Vec<PathGuard> {
        let mut sorted: Vec<&Path> = paths.to_vec();
        sorted.sort();
        sorted.dedup();

        sorted.into_iter().map(|p| self.lock(p)).collect()
    }

    /// Drop cached locks that nobody currently holds.
    ///
    /// A lock whose `Arc` has a single strong reference is only referenced by
    /// the cache itself.
    pub fn prune_idle(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    /// Number of cached locks.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
