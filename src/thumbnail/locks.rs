// Named Locks
//
// One async mutex per thumbnail file name, so exactly one task produces a
// given thumbnail while unrelated file names proceed in parallel.
// - Acquire: look up (or create) the mutex for the name, then wait for it
// - Release: drop the guard; the entry is removed once nobody else holds or
//   waits on it
// - Waiting is bounded; a timeout surfaces as ThumbnailError::LockTimeout

use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::error::ThumbnailError;

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// Registry of per-name async mutexes
#[derive(Debug, Clone, Default)]
pub struct NamedLocks {
    entries: Arc<Mutex<LockMap>>,
}

impl NamedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait up to `timeout` for exclusive access to `name`.
    pub async fn acquire(
        &self,
        name: &str,
        timeout: Duration,
    ) -> Result<NamedLockGuard, ThumbnailError> {
        let entry = {
            let mut entries = self.entries.lock();
            entries
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        // Declared before the wait so it is dropped after the waiting future
        let cleanup = Cleanup {
            name: name.to_string(),
            locks: self.clone(),
        };

        match tokio::time::timeout(timeout, entry.lock_owned()).await {
            Ok(guard) => Ok(NamedLockGuard {
                _guard: guard,
                _cleanup: cleanup,
            }),
            Err(_) => Err(ThumbnailError::LockTimeout {
                file_name: name.to_string(),
                waited: timeout,
            }),
        }
    }

    /// Number of names currently held or waited on
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Remove the entry for `name` if the map holds the only reference.
    fn release(&self, name: &str) {
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(name) {
            if Arc::strong_count(entry) == 1 {
                entries.remove(name);
            }
        }
    }
}

/// Removes the map entry once the last holder or waiter is gone.
#[derive(Debug)]
struct Cleanup {
    name: String,
    locks: NamedLocks,
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        self.locks.release(&self.name);
    }
}

/// Exclusive access to one name; released on drop.
#[derive(Debug)]
pub struct NamedLockGuard {
    // Field order matters: the mutex guard must drop before the cleanup runs
    _guard: OwnedMutexGuard<()>,
    _cleanup: Cleanup,
}
