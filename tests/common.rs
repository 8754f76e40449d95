//! Shared test utilities for E2E tests
//!
//! ## Test Isolation
//!
//! Each test builds its own `OrchestratorRegistry` over in-memory adapters,
//! a `SimulatedSubstrate` and a `ManualClock`, so tests run in parallel
//! without sharing any state. Idle-based policies are driven by advancing
//! the clock instead of sleeping.
//!
//! ## Usage Pattern
//!
//! ```rust,ignore
//! #[tokio::test]
//! async fn my_test() {
//!     let env = setup();
//!     let tab = env.open_tab("https://example.com").await;
//!     env.advance_minutes(45);
//!     // ...
//! }
//! ```

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use orch_engine::application::OrchestratorRegistry;
use orch_engine::domain::ports::{Clock, LifecycleEvent, ProcessRepository};
use orch_engine::domain::services::{ProcessManagementService, TabOrchestrationService};
use orch_engine::domain::{ProcessId, SuspensionStrategy, Tab, TabOptions};
use orch_engine::infrastructure::{
    BroadcastEventBus, InMemoryProcessRepository, InMemorySnapshotStore, ManualClock,
    OrchestratorSettings, SimulatedSubstrate,
};
use std::collections::HashSet;
use std::sync::Arc;

pub const MB: u64 = 1024 * 1024;

/// One isolated orchestrator with handles on every adapter
pub struct TestEnv {
    pub registry: OrchestratorRegistry,
    pub repository: Arc<InMemoryProcessRepository>,
    pub substrate: Arc<SimulatedSubstrate>,
    pub snapshots: Arc<InMemorySnapshotStore>,
    pub events: Arc<BroadcastEventBus>,
    pub clock: Arc<ManualClock>,
}

/// Environment with default settings
pub fn setup() -> TestEnv {
    setup_with(OrchestratorSettings::default())
}

/// Environment whose tab memory is measured against `limit_mb`
pub fn setup_with_memory_limit(limit_mb: u64) -> TestEnv {
    let mut settings = OrchestratorSettings::default();
    settings.orchestrator.memory_limit = limit_mb * MB;
    setup_with(settings)
}

/// Environment with the given suspension strategy
pub fn setup_with_strategy(strategy: SuspensionStrategy) -> TestEnv {
    let mut settings = OrchestratorSettings::default();
    settings.orchestrator.suspension_strategy = strategy;
    setup_with(settings)
}

pub fn setup_with(settings: OrchestratorSettings) -> TestEnv {
    setup_over(settings, SimulatedSubstrate::new())
}

/// Environment over a pre-configured substrate
pub fn setup_over(settings: OrchestratorSettings, substrate: SimulatedSubstrate) -> TestEnv {
    let repository = Arc::new(InMemoryProcessRepository::new());
    let substrate = Arc::new(substrate);
    let snapshots = Arc::new(InMemorySnapshotStore::new());
    let events = Arc::new(BroadcastEventBus::default());
    let clock = Arc::new(ManualClock::default());

    let registry = OrchestratorRegistry::new(
        settings,
        repository.clone(),
        substrate.clone(),
        snapshots.clone(),
        events.clone(),
        clock.clone(),
    )
    .expect("Failed to build orchestrator registry");

    TestEnv {
        registry,
        repository,
        substrate,
        snapshots,
        events,
        clock,
    }
}

impl TestEnv {
    pub fn orchestrator(&self) -> Arc<TabOrchestrationService> {
        self.registry.orchestrator()
    }

    pub fn processes(&self) -> Arc<ProcessManagementService> {
        self.registry.processes()
    }

    /// Open a tab in the default space
    pub async fn open_tab(&self, url: &str) -> Tab {
        self.orchestrator()
            .create_tab(url, TabOptions::default())
            .await
            .unwrap_or_else(|e| panic!("Failed to open tab {}: {}", url, e))
    }

    /// Open `count` tabs, one clock second apart so their activity order is fixed
    pub async fn open_tabs(&self, count: usize) -> Vec<Tab> {
        let mut tabs = Vec::with_capacity(count);
        for i in 0..count {
            tabs.push(self.open_tab(&format!("https://site-{}.example", i)).await);
            self.clock.advance(ChronoDuration::seconds(1));
        }
        tabs
    }

    pub fn advance_minutes(&self, minutes: i64) {
        self.clock.advance(ChronoDuration::minutes(minutes));
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Overwrite the recorded memory of a process
    pub async fn set_process_memory(&self, process_id: ProcessId, bytes: u64) {
        let mut record = self
            .repository
            .get(&process_id)
            .await
            .expect("Process record missing");
        record.set_memory_usage(bytes);
        self.repository
            .save(record)
            .await
            .expect("Failed to save process record");
    }

    /// Names of published events, oldest first
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events.recent().iter().map(LifecycleEvent::name).collect()
    }

    pub fn count_events(&self, name: &str) -> usize {
        self.events.recent_named(name).len()
    }

    /// Every tab owns exactly one live process and no process is shared
    pub async fn assert_one_process_per_tab(&self) {
        let tabs = self.orchestrator().list_tabs(None).expect("list_tabs failed");
        let mut seen = HashSet::new();

        for tab in &tabs {
            assert!(
                seen.insert(tab.process_id()),
                "Process {} is shared by more than one tab",
                tab.process_id()
            );
            let record = self
                .processes()
                .get_process_info(&tab.process_id())
                .await
                .unwrap_or_else(|e| panic!("Tab {} has no process: {}", tab.id(), e));
            assert_eq!(record.owned_tab_ids(), &[tab.id()]);
        }

        let owners = self
            .processes()
            .list_processes()
            .await
            .expect("list_processes failed")
            .into_iter()
            .filter(|p| p.owns_tabs())
            .count();
        assert_eq!(owners, tabs.len(), "Orphaned tab-owning processes");
    }
}
