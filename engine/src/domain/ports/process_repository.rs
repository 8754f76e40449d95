//! Repository port for process records
//! This is an interface - implementations are in infrastructure layer

use crate::domain::{DomainError, ProcessId, ProcessRecord};
use async_trait::async_trait;

/// Repository port for process record persistence
#[async_trait]
pub trait ProcessRepository: Send + Sync {
    /// Save a process record (create or update)
    async fn save(&self, process: ProcessRecord) -> Result<(), DomainError>;

    /// Find a process record by ID
    async fn find_by_id(&self, id: &ProcessId) -> Result<Option<ProcessRecord>, DomainError>;

    /// List all process records
    async fn find_all(&self) -> Result<Vec<ProcessRecord>, DomainError>;

    /// Delete a process record, returning whether it existed
    async fn delete(&self, id: &ProcessId) -> Result<bool, DomainError>;

    /// Load a record that must exist
    async fn get(&self, id: &ProcessId) -> Result<ProcessRecord, DomainError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::ProcessNotFound(id.to_string()))
    }
}
