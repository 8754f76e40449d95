//! Simulated process substrate
//! Stands in for the native layer: tracks live workers and reports
//! scripted metrics. Used by the daemon's default wiring and by tests.

use crate::domain::constants::BYTES_PER_MB;
use crate::domain::ports::{ProcessSubstrate, SpawnConfig, SpawnHandle};
use crate::domain::{DomainError, ProcessId, ProcessMetrics, ProcessType, ResourceAllocation};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

/// Memory a freshly spawned simulated worker reports (64 MB)
pub const DEFAULT_SIMULATED_MEMORY_BYTES: u64 = 64 * BYTES_PER_MB;

#[derive(Default)]
struct SimulatedState {
    live: HashMap<ProcessId, ProcessMetrics>,
    unavailable: HashSet<ProcessId>,
    failing_terminate: HashSet<ProcessId>,
    pending_spawn_failures: u32,
    spawn_delay: Option<Duration>,
    next_pid: u32,
    spawned: u64,
    terminated: u64,
}

pub struct SimulatedSubstrate {
    state: Mutex<SimulatedState>,
    initial_metrics: ProcessMetrics,
}

impl SimulatedSubstrate {
    pub fn new() -> Self {
        Self::with_initial_memory(DEFAULT_SIMULATED_MEMORY_BYTES)
    }

    pub fn with_initial_memory(memory_bytes: u64) -> Self {
        Self {
            state: Mutex::new(SimulatedState {
                next_pid: 1000,
                ..Default::default()
            }),
            initial_metrics: ProcessMetrics {
                memory_bytes,
                cpu_percent: 1.0,
            },
        }
    }

    fn state(&self) -> MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Script the next samples for a live worker
    pub fn set_metrics(&self, id: ProcessId, metrics: ProcessMetrics) {
        let mut state = self.state();
        state.unavailable.remove(&id);
        state.live.insert(id, metrics);
    }

    pub fn set_memory(&self, id: ProcessId, memory_bytes: u64) {
        let mut state = self.state();
        let cpu_percent = state
            .live
            .get(&id)
            .map(|m| m.cpu_percent)
            .unwrap_or(self.initial_metrics.cpu_percent);
        state.live.insert(
            id,
            ProcessMetrics {
                memory_bytes,
                cpu_percent,
            },
        );
    }

    /// Make sampling report no metrics, as if the worker stopped answering
    pub fn set_unavailable(&self, id: ProcessId) {
        self.state().unavailable.insert(id);
    }

    /// Fail the next `count` spawn calls
    pub fn fail_next_spawns(&self, count: u32) {
        self.state().pending_spawn_failures = count;
    }

    pub fn fail_terminate(&self, id: ProcessId) {
        self.state().failing_terminate.insert(id);
    }

    /// Delay every spawn, for exercising spawn timeouts
    pub fn set_spawn_delay(&self, delay: Option<Duration>) {
        self.state().spawn_delay = delay;
    }

    pub fn is_running(&self, id: &ProcessId) -> bool {
        self.state().live.contains_key(id)
    }

    pub fn live_count(&self) -> usize {
        self.state().live.len()
    }

    pub fn spawn_count(&self) -> u64 {
        self.state().spawned
    }

    pub fn terminate_count(&self) -> u64 {
        self.state().terminated
    }
}

impl Default for SimulatedSubstrate {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProcessSubstrate for SimulatedSubstrate {
    async fn spawn(
        &self,
        id: ProcessId,
        process_type: ProcessType,
        config: SpawnConfig,
    ) -> Result<SpawnHandle, DomainError> {
        let delay = self.state().spawn_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        if state.pending_spawn_failures > 0 {
            state.pending_spawn_failures -= 1;
            return Err(DomainError::SpawnFailed(format!(
                "simulated spawn failure for {} process {}",
                process_type, id
            )));
        }

        let os_pid = state.next_pid;
        state.next_pid += 1;
        state.spawned += 1;
        state.live.insert(id, self.initial_metrics);

        debug!(
            process_id = %id,
            process_type = %process_type,
            os_pid,
            url = ?config.url,
            "Simulated worker spawned"
        );

        Ok(SpawnHandle {
            os_pid: Some(os_pid),
        })
    }

    async fn terminate(&self, id: ProcessId) -> Result<(), DomainError> {
        let mut state = self.state();
        if state.failing_terminate.contains(&id) {
            return Err(DomainError::TerminateFailed {
                id: id.to_string(),
                reason: "simulated terminate failure".to_string(),
            });
        }
        if state.live.remove(&id).is_none() {
            return Err(DomainError::ProcessNotFound(id.to_string()));
        }
        state.unavailable.remove(&id);
        state.terminated += 1;

        debug!(process_id = %id, "Simulated worker terminated");
        Ok(())
    }

    async fn apply_budget(&self, allocation: ResourceAllocation) -> Result<(), DomainError> {
        let id = allocation.process_id;
        let mut state = self.state();
        let metrics = state
            .live
            .get_mut(&id)
            .ok_or_else(|| DomainError::ProcessNotFound(id.to_string()))?;

        // A worker honours a new budget by trimming; scripted growth afterwards still shows
        metrics.memory_bytes = metrics.memory_bytes.min(allocation.memory_limit);
        metrics.cpu_percent = metrics.cpu_percent.min(allocation.cpu_quota);

        debug!(process_id = %id, memory_bytes = metrics.memory_bytes, "Simulated worker budget applied");
        Ok(())
    }

    async fn sample_metrics(&self, id: ProcessId) -> Result<Option<ProcessMetrics>, DomainError> {
        let state = self.state();
        if state.unavailable.contains(&id) {
            return Ok(None);
        }
        Ok(state.live.get(&id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ResourceBudget;

    #[tokio::test]
    async fn test_spawn_sample_terminate() {
        let substrate = SimulatedSubstrate::with_initial_memory(42);
        let id = ProcessId::generate();

        let handle = substrate
            .spawn(id, ProcessType::Renderer, SpawnConfig::for_url("https://a.example"))
            .await
            .unwrap();
        assert!(handle.os_pid.is_some());
        assert!(substrate.is_running(&id));

        let metrics = substrate.sample_metrics(id).await.unwrap().unwrap();
        assert_eq!(metrics.memory_bytes, 42);

        substrate.terminate(id).await.unwrap();
        assert!(!substrate.is_running(&id));
        assert!(substrate.sample_metrics(id).await.unwrap().is_none());
        assert!(substrate.terminate(id).await.is_err());
    }

    #[tokio::test]
    async fn test_scripted_failures() {
        let substrate = SimulatedSubstrate::new();
        substrate.fail_next_spawns(1);
        let id = ProcessId::generate();

        let first = substrate
            .spawn(id, ProcessType::Renderer, SpawnConfig::default())
            .await;
        assert!(matches!(first, Err(DomainError::SpawnFailed(_))));

        substrate
            .spawn(id, ProcessType::Renderer, SpawnConfig::default())
            .await
            .unwrap();
        substrate.set_unavailable(id);
        assert!(substrate.sample_metrics(id).await.unwrap().is_none());

        substrate.fail_terminate(id);
        assert!(matches!(
            substrate.terminate(id).await,
            Err(DomainError::TerminateFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_budget_trims_until_usage_is_scripted_again() {
        let substrate = SimulatedSubstrate::new();
        let id = ProcessId::generate();
        substrate
            .spawn(id, ProcessType::Renderer, SpawnConfig::default())
            .await
            .unwrap();

        substrate
            .apply_budget(ResourceBudget::minimal().for_process(id))
            .await
            .unwrap();
        let metrics = substrate.sample_metrics(id).await.unwrap().unwrap();
        assert_eq!(metrics.memory_bytes, ResourceBudget::minimal().memory_bytes);

        // A larger budget does not grow the worker back
        substrate
            .apply_budget(ResourceBudget::normal().for_process(id))
            .await
            .unwrap();
        let metrics = substrate.sample_metrics(id).await.unwrap().unwrap();
        assert_eq!(metrics.memory_bytes, ResourceBudget::minimal().memory_bytes);

        substrate.set_memory(id, 2 * DEFAULT_SIMULATED_MEMORY_BYTES);
        let metrics = substrate.sample_metrics(id).await.unwrap().unwrap();
        assert_eq!(metrics.memory_bytes, 2 * DEFAULT_SIMULATED_MEMORY_BYTES);

        assert!(matches!(
            substrate
                .apply_budget(ResourceBudget::minimal().for_process(ProcessId::generate()))
                .await,
            Err(DomainError::ProcessNotFound(_))
        ));
    }
}
