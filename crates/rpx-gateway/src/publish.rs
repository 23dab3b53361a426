//! # Publish Locks
//!
//! Per-key exclusion for the last step of a MISS: renaming the staged blob
//! into place and upserting its descriptor. Two fetches of the same key may
//! stream concurrently, but their publications never interleave, so the
//! blob on disk always belongs to the descriptor in the index.
//!
//! Entries are weak; a key's mutex is dropped with its last guard and pruned
//! on the next acquisition.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use rpx_core::{CachePath, RepositoryName};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Key = (RepositoryName, CachePath);

/// Keyed async mutexes, shared by every tee task in the process.
#[derive(Debug, Clone, Default)]
pub struct PublishLocks {
    in_flight: Arc<Mutex<HashMap<Key, Weak<AsyncMutex<()>>>>>,
}

impl PublishLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive publication rights on a key.
    pub async fn acquire(&self, repository: &RepositoryName, path: &CachePath) -> OwnedMutexGuard<()> {
        let lock = {
            let mut in_flight = self.in_flight.lock();
            in_flight.retain(|_, entry| entry.strong_count() > 0);
            let key = (repository.clone(), path.clone());
            match in_flight.get(&key).and_then(Weak::upgrade) {
                Some(lock) => lock,
                None => {
                    let lock = Arc::new(AsyncMutex::new(()));
                    in_flight.insert(key, Arc::downgrade(&lock));
                    lock
                }
            }
        };
        lock.lock_owned().await
    }

    /// Keys with a live holder or waiter.
    pub fn active(&self) -> usize {
        self.in_flight
            .lock()
            .values()
            .filter(|entry| entry.strong_count() > 0)
            .count()
    }
}
