//! Orchestrator Registry
//! Central composition root (Dependency Injection container)
//!
//! Wires the adapters into the IPC manager, process manager and tab
//! orchestrator, and owns the background monitors. Every monitor is a tokio
//! task tied to one cancellation token.

use crate::domain::ports::{Clock, EventPublisher, ProcessRepository, ProcessSubstrate, SnapshotStore};
use crate::domain::services::{
    HealthMonitoringService, IpcManager, ProcessManagementService, ResourceRebalancingService,
    TabOrchestrationService,
};
use crate::domain::Result;
use crate::infrastructure::{
    BroadcastEventBus, InMemoryProcessRepository, InMemorySnapshotStore, OrchestratorSettings,
    SimulatedSubstrate, SystemClock,
};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Registry for all orchestrator services
/// This is the composition root where dependencies are wired together
pub struct OrchestratorRegistry {
    settings: OrchestratorSettings,
    repository: Arc<dyn ProcessRepository>,
    events: Arc<BroadcastEventBus>,
    processes: Arc<ProcessManagementService>,
    health_monitor: Arc<HealthMonitoringService>,
    rebalancer: Arc<ResourceRebalancingService>,
    orchestrator: Arc<TabOrchestrationService>,
    cancellation_token: CancellationToken,
    tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
}

impl OrchestratorRegistry {
    /// Create a registry over the given adapters
    ///
    /// # Arguments
    ///
    /// * `settings` - Validated runtime settings
    /// * `repository` - Process record storage
    /// * `substrate` - Process spawn/terminate/metrics adapter
    /// * `snapshots` - Suspended tab snapshot storage
    /// * `events` - Lifecycle event bus
    /// * `clock` - Time source for idle policies
    pub fn new(
        settings: OrchestratorSettings,
        repository: Arc<dyn ProcessRepository>,
        substrate: Arc<dyn ProcessSubstrate>,
        snapshots: Arc<dyn SnapshotStore>,
        events: Arc<BroadcastEventBus>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let publisher: Arc<dyn EventPublisher> = events.clone();
        let ipc = IpcManager::new(settings.ipc);

        let processes = Arc::new(ProcessManagementService::new(
            repository.clone(),
            substrate.clone(),
            ipc,
            publisher.clone(),
            clock.clone(),
            settings.process,
        ));

        let health_monitor = Arc::new(HealthMonitoringService::new(
            repository.clone(),
            substrate,
            processes.clone(),
            publisher.clone(),
            clock.clone(),
            settings.health_thresholds,
        ));

        let rebalancer = Arc::new(ResourceRebalancingService::new(
            repository.clone(),
            processes.clone(),
            settings.idle_memory_threshold,
        ));

        let orchestrator = Arc::new(TabOrchestrationService::new(
            processes.clone(),
            snapshots,
            publisher,
            clock,
            settings.orchestrator.clone(),
        )?);

        Ok(Self {
            settings,
            repository,
            events,
            processes,
            health_monitor,
            rebalancer,
            orchestrator,
            cancellation_token: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        })
    }

    /// Registry backed by in-memory adapters and the simulated substrate
    pub fn in_memory(settings: OrchestratorSettings) -> Result<Self> {
        Self::with_substrate(settings, Arc::new(SimulatedSubstrate::new()))
    }

    /// In-memory registry over a caller-provided substrate
    pub fn with_substrate(
        settings: OrchestratorSettings,
        substrate: Arc<dyn ProcessSubstrate>,
    ) -> Result<Self> {
        Self::new(
            settings,
            Arc::new(InMemoryProcessRepository::new()),
            substrate,
            Arc::new(InMemorySnapshotStore::new()),
            Arc::new(BroadcastEventBus::default()),
            Arc::new(SystemClock),
        )
    }

    // ===== Services =====

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn repository(&self) -> Arc<dyn ProcessRepository> {
        self.repository.clone()
    }

    pub fn events(&self) -> Arc<BroadcastEventBus> {
        self.events.clone()
    }

    pub fn ipc(&self) -> &IpcManager {
        self.processes.ipc()
    }

    pub fn processes(&self) -> Arc<ProcessManagementService> {
        self.processes.clone()
    }

    pub fn health_monitor(&self) -> Arc<HealthMonitoringService> {
        self.health_monitor.clone()
    }

    pub fn rebalancer(&self) -> Arc<ResourceRebalancingService> {
        self.rebalancer.clone()
    }

    pub fn orchestrator(&self) -> Arc<TabOrchestrationService> {
        self.orchestrator.clone()
    }

    // ===== Background monitors =====

    /// Spawn the health monitor, rebalancer, suspension monitor and, when
    /// configured, the memory optimizer. Returns the number of tasks started;
    /// zero if the monitors were already running or shut down.
    pub fn start(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        if !tasks.is_empty() || self.cancellation_token.is_cancelled() {
            warn!("Background monitors already started");
            return 0;
        }

        let health = self.health_monitor.clone();
        let interval = self.settings.health_interval;
        let token = self.cancellation_token.clone();
        tasks.push((
            "health-monitor",
            tokio::spawn(async move { health.run(interval, token).await }),
        ));

        let rebalancer = self.rebalancer.clone();
        let interval = self.settings.rebalance_interval;
        let token = self.cancellation_token.clone();
        tasks.push((
            "resource-rebalancer",
            tokio::spawn(async move { rebalancer.run(interval, token).await }),
        ));

        let orchestrator = self.orchestrator.clone();
        let interval = self.settings.suspension_interval;
        let token = self.cancellation_token.clone();
        tasks.push((
            "suspension-monitor",
            tokio::spawn(async move { orchestrator.run_suspension_monitor(interval, token).await }),
        ));

        if let Some(interval) = self.settings.optimize_interval {
            let orchestrator = self.orchestrator.clone();
            let token = self.cancellation_token.clone();
            tasks.push((
                "memory-optimizer",
                tokio::spawn(async move { orchestrator.run_memory_optimizer(interval, token).await }),
            ));
        }

        info!(tasks = tasks.len(), "Background monitors started");
        tasks.len()
    }

    pub fn is_running(&self) -> bool {
        !self.cancellation_token.is_cancelled()
            && !self
                .tasks
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_empty()
    }

    /// Cancel every monitor and wait for them to stop
    pub async fn shutdown(&self) {
        self.cancellation_token.cancel();
        let tasks: Vec<_> = self
            .tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();

        for (name, handle) in tasks {
            if let Err(e) = handle.await {
                warn!(task = name, error = %e, "Background monitor ended abnormally");
            }
        }
        info!("Background monitors stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TabOptions;
    use std::time::Duration;

    fn fast_settings() -> OrchestratorSettings {
        OrchestratorSettings {
            health_interval: Duration::from_millis(10),
            rebalance_interval: Duration::from_millis(10),
            suspension_interval: Duration::from_millis(10),
            optimize_interval: Some(Duration::from_millis(10)),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let registry = OrchestratorRegistry::in_memory(fast_settings()).unwrap();
        assert!(!registry.is_running());

        assert_eq!(registry.start(), 4);
        assert!(registry.is_running());
        assert_eq!(registry.start(), 0);

        tokio::time::sleep(Duration::from_millis(30)).await;
        registry.shutdown().await;
        assert!(!registry.is_running());
        assert_eq!(registry.start(), 0);
    }

    #[tokio::test]
    async fn test_services_share_state() {
        let registry = OrchestratorRegistry::in_memory(OrchestratorSettings::default()).unwrap();
        let tab = registry
            .orchestrator()
            .create_tab("https://a.example", TabOptions::default())
            .await
            .unwrap();

        let process = registry.processes().get_process_info(&tab.process_id()).await.unwrap();
        assert_eq!(process.owned_tab_ids(), &[tab.id()]);
        assert!(registry.ipc().get_channel(&process.control_channel_id()).is_some());
        assert_eq!(registry.events().recent_named("tab-created").len(), 1);
    }

    #[tokio::test]
    async fn test_suspended_process_stays_within_budget_after_health_pass() {
        let registry = OrchestratorRegistry::in_memory(OrchestratorSettings::default()).unwrap();
        let tab = registry
            .orchestrator()
            .create_tab("https://a.example", TabOptions::default())
            .await
            .unwrap();
        let before = registry.processes().get_process_info(&tab.process_id()).await.unwrap();
        assert!(before.memory_usage() > 0);

        assert!(registry.orchestrator().suspend_tab(&tab.id()).await.unwrap());
        registry.health_monitor().check_all().await.unwrap();

        let after = registry.processes().get_process_info(&tab.process_id()).await.unwrap();
        assert!(after.is_suspended());
        assert!(after.memory_usage() <= after.allocation().unwrap().memory_limit);
        assert!(registry.processes().total_memory_usage().await.unwrap() < before.memory_usage());
    }
}
