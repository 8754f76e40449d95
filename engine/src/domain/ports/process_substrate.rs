//! ProcessSubstrate port
//! The native layer that actually creates, terminates and measures workers

use crate::domain::{DomainError, ProcessId, ProcessMetrics, ProcessType, ResourceAllocation};
use async_trait::async_trait;

/// Opaque launch parameters handed to the substrate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpawnConfig {
    /// Initial URL for renderer processes
    pub url: Option<String>,
    pub args: Vec<String>,
    pub env_vars: Vec<(String, String)>,
    pub sandboxed: bool,
}

impl SpawnConfig {
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            sandboxed: true,
            ..Default::default()
        }
    }
}

/// Result of spawning a worker
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpawnHandle {
    /// Native pid, when the substrate exposes one
    pub os_pid: Option<u32>,
}

/// Port for the native process substrate
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessSubstrate: Send + Sync {
    /// Create the native worker for `id`
    async fn spawn(
        &self,
        id: ProcessId,
        process_type: ProcessType,
        config: SpawnConfig,
    ) -> Result<SpawnHandle, DomainError>;

    /// Terminate the native worker
    async fn terminate(&self, id: ProcessId) -> Result<(), DomainError>;

    /// Enforce a budget on the native worker. Usage above the new limit is
    /// trimmed; later growth is not prevented.
    async fn apply_budget(&self, allocation: ResourceAllocation) -> Result<(), DomainError>;

    /// Sample current usage. `None` means metrics are unavailable.
    async fn sample_metrics(&self, id: ProcessId) -> Result<Option<ProcessMetrics>, DomainError>;
}
