//! Process-local mutual exclusion keyed by source path.
//!
//! Serializes the "process and write" section of the resolver per source:
//! two threads resolving the same image take turns, threads resolving
//! different images never wait on each other.
//!
//! Only threads of this process are coordinated. Several processes or
//! machines sharing one storage may still process the same source at the
//! same time; each writes a complete output and the last one wins.

use dashmap::DashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Map from key to a lock handle created on first use.
#[derive(Debug, Default)]
pub struct PathLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_lock<T>(&self, key: &str, f: impl FnOnce() -> T) -> T {
        let handle = self.handle(key);
        let _guard = lock(&handle);
        f()
    }

    fn handle(&self, key: &str) -> Arc<Mutex<()>> {
        // Clone the Arc out so the map shard is not held while waiting.
        self.locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    /// Number of keys that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// A panic in another holder does not invalidate a unit lock.
fn lock(handle: &Mutex<()>) -> MutexGuard<'_, ()> {
    handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
