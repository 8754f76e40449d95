//! In-Memory Process Repository
//! Thread-safe implementation of ProcessRepository port

use crate::domain::{ports::ProcessRepository, DomainError, ProcessId, ProcessRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::debug;

/// Thread-safe in-memory process repository
#[derive(Clone)]
pub struct InMemoryProcessRepository {
    processes: Arc<RwLock<HashMap<ProcessId, ProcessRecord>>>,
}

impl InMemoryProcessRepository {
    pub fn new() -> Self {
        Self {
            processes: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryProcessRepository {
    fn default() -> Self {
        Self::new()
    }
}

fn poisoned<T>(_: T) -> DomainError {
    DomainError::LockPoisoned("process repository".to_string())
}

#[async_trait]
impl ProcessRepository for InMemoryProcessRepository {
    async fn save(&self, process: ProcessRecord) -> Result<(), DomainError> {
        let process_id = process.id();

        let mut processes = self.processes.write().map_err(poisoned)?;
        processes.insert(process_id, process);

        debug!(
            process_id = %process_id,
            total_processes = processes.len(),
            "Process record saved"
        );

        Ok(())
    }

    async fn find_by_id(&self, id: &ProcessId) -> Result<Option<ProcessRecord>, DomainError> {
        let processes = self.processes.read().map_err(poisoned)?;
        Ok(processes.get(id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<ProcessRecord>, DomainError> {
        let processes = self.processes.read().map_err(poisoned)?;
        let mut all: Vec<ProcessRecord> = processes.values().cloned().collect();
        all.sort_by_key(|p| (p.created_at(), p.id()));
        Ok(all)
    }

    async fn delete(&self, id: &ProcessId) -> Result<bool, DomainError> {
        let mut processes = self.processes.write().map_err(poisoned)?;
        let existed = processes.remove(id).is_some();

        debug!(
            process_id = %id,
            existed,
            remaining_processes = processes.len(),
            "Process record deleted"
        );

        Ok(existed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChannelId, ProcessType};
    use chrono::Utc;

    fn record() -> ProcessRecord {
        ProcessRecord::new(
            ProcessId::generate(),
            ProcessType::Renderer,
            ChannelId::generate(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_save_and_find_by_id() {
        let repo = InMemoryProcessRepository::new();
        let process = record();
        let process_id = process.id();

        repo.save(process).await.unwrap();

        let found = repo.find_by_id(&process_id).await.unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().process_type(), ProcessType::Renderer);
    }

    #[tokio::test]
    async fn test_find_all() {
        let repo = InMemoryProcessRepository::new();
        for _ in 0..3 {
            repo.save(record()).await.unwrap();
        }

        let all = repo.find_all().await.unwrap();
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_delete_reports_existence() {
        let repo = InMemoryProcessRepository::new();
        let process = record();
        let process_id = process.id();
        repo.save(process).await.unwrap();

        assert!(repo.delete(&process_id).await.unwrap());
        assert!(!repo.delete(&process_id).await.unwrap());
        assert!(repo.find_by_id(&process_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let repo = InMemoryProcessRepository::new();
        let err = repo.get(&ProcessId::generate()).await.unwrap_err();
        assert!(matches!(err, DomainError::ProcessNotFound(_)));
    }
}
