//! In-memory snapshot store
//! Keeps suspended tab snapshots for the lifetime of the orchestrator

use crate::domain::ports::{SnapshotStore, TabSnapshot};
use crate::domain::{DomainError, TabId};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Clone, Default)]
pub struct InMemorySnapshotStore {
    snapshots: Arc<RwLock<HashMap<TabId, TabSnapshot>>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.snapshots.read().map(|s| s.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, tab_id: &TabId) -> bool {
        self.snapshots
            .read()
            .map(|s| s.contains_key(tab_id))
            .unwrap_or_default()
    }
}

fn poisoned<T>(_: T) -> DomainError {
    DomainError::LockPoisoned("snapshot store".to_string())
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, tab_id: TabId, snapshot: TabSnapshot) -> Result<(), DomainError> {
        self.snapshots
            .write()
            .map_err(poisoned)?
            .insert(tab_id, snapshot);
        Ok(())
    }

    async fn load(&self, tab_id: TabId) -> Result<TabSnapshot, DomainError> {
        self.snapshots
            .read()
            .map_err(poisoned)?
            .get(&tab_id)
            .cloned()
            .ok_or_else(|| DomainError::SnapshotFailed(format!("no snapshot for tab {}", tab_id)))
    }

    async fn delete(&self, tab_id: TabId) -> Result<bool, DomainError> {
        Ok(self
            .snapshots
            .write()
            .map_err(poisoned)?
            .remove(&tab_id)
            .is_some())
    }
}
