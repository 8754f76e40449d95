//! Entity-scoped lock table
//!
//! Serializes mutating operations per process id / tab id. Waiters queue on
//! the entity's async mutex, so a destroy waits for an in-flight
//! suspend/restore instead of cancelling it.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Guard held for the duration of one entity operation
pub type EntityGuard = OwnedMutexGuard<()>;

pub struct EntityLocks<K> {
    locks: Mutex<HashMap<K, Arc<AsyncMutex<()>>>>,
}

impl<K: Eq + Hash + Clone> EntityLocks<K> {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the exclusive section for `key`
    pub async fn lock(&self, key: &K) -> EntityGuard {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.entry(key.clone()).or_default().clone()
        };
        mutex.lock_owned().await
    }

    /// Drop the entry for `key` if nobody holds or waits on it.
    /// Called after an entity is destroyed and its guard released.
    pub fn forget(&self, key: &K) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks
            .get(key)
            .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
        {
            locks.remove(key);
        }
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Eq + Hash + Clone> Default for EntityLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}
