//! Per-path write locks
//!
//! Write and delete on the same document path must be mutually exclusive,
//! while operations on different paths proceed independently. The registry
//! hands out one lock per canonical path, created lazily under a single
//! guard mutex that is held only for map lookup/insert, never across I/O.
//!
//! Entries are never evicted; the map grows for the life of the process.
//! That is an accepted trade-off for small embedded datasets.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Registry mapping canonical document paths to dedicated locks
///
/// Cloning is cheap and clones share the same underlying map, so every
/// handle of a database sees the same lock for the same path. The registry
/// is an explicit component: pass one to `Database::open_with` to share it
/// between databases or to inspect it in tests.
#[derive(Clone, Debug, Default)]
pub struct LockRegistry {
    inner: Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the lock for `path`, creating it on first use
    pub fn get_or_create(&self, path: &Path) -> Arc<Mutex<()>> {
        // A poisoned guard only means another thread panicked during
        // lookup/insert; the map itself is still consistent.
        let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(lock) = map.get(path) {
            return Arc::clone(lock);
        }
        let lock = Arc::new(Mutex::new(()));
        map.insert(path.to_path_buf(), Arc::clone(&lock));
        lock
    }

    /// Number of paths a lock has been created for
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
