//! Per-(user, item) serialization of vote updates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, Weak};

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Purge dead entries every this many acquisitions...
const CLEANUP_INTERVAL: usize = 64;
/// ...but only once the map holds more than this many entries.
const CLEANUP_THRESHOLD: usize = 128;

/// Key of one vote: the voter and the item.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VoteKey {
    pub user_id: String,
    pub item_id: String,
}

impl VoteKey {
    #[must_use]
    pub fn new(user_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
        }
    }
}

/// Keyed async mutex over [`VoteKey`].
///
/// Presses on the same (user, item) pair run one at a time; different pairs
/// never wait on each other. Entries are held weakly and cleaned up lazily.
#[derive(Default)]
pub struct VoteLocks {
    locks: std::sync::Mutex<HashMap<VoteKey, Weak<Mutex<()>>>>,
    acquire_counter: AtomicUsize,
}

/// Holds the lock for one [`VoteKey`] until dropped.
pub struct VoteGuard {
    _guard: OwnedMutexGuard<()>,
}

impl VoteLocks {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`.
    pub async fn acquire(&self, key: &VoteKey) -> VoteGuard {
        let mutex = {
            let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);

            let mutex = map.get(key).and_then(Weak::upgrade).unwrap_or_else(|| {
                let mutex = Arc::new(Mutex::new(()));
                map.insert(key.clone(), Arc::downgrade(&mutex));
                mutex
            });

            let tick = self.acquire_counter.fetch_add(1, Ordering::Relaxed);
            if map.len() > CLEANUP_THRESHOLD && tick % CLEANUP_INTERVAL == 0 {
                map.retain(|_, weak| weak.strong_count() > 0);
            }

            mutex
        };

        VoteGuard {
            _guard: mutex.lock_owned().await,
        }
    }

    /// Number of tracked keys, including ones not yet cleaned up.
    #[must_use]
    pub fn tracked_keys(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
