pub mod entity_locks;
pub mod health_monitoring_service;
pub mod ipc_manager;
pub mod process_management_service;
pub mod resource_rebalancing_service;
pub mod space_bundle;
pub mod suspension_policy;
pub mod tab_orchestration;
pub mod tab_search;

pub use entity_locks::{EntityGuard, EntityLocks};
pub use health_monitoring_service::{
    HealthMonitoringService, HealthReport, DEFAULT_HEALTH_CHECK_INTERVAL,
};
pub use ipc_manager::{
    IpcManager, IpcSettings, MessageHandler, Subscription, DEFAULT_REQUEST_TIMEOUT,
    DEFAULT_SUBSCRIBER_QUEUE_CAPACITY,
};
pub use process_management_service::{
    ProcessManagementService, ProcessManagerSettings, DEFAULT_SPAWN_TIMEOUT,
};
pub use resource_rebalancing_service::{ResourceRebalancingService, DEFAULT_REBALANCE_INTERVAL};
pub use space_bundle::{BundledGroup, BundledSpace, BundledTab, SpaceBundle};
pub use suspension_policy::{lru_batch_size, SuspensionPolicy};
pub use tab_orchestration::{
    MemoryOptimizationReport, OptimizationPhase, PhaseReport, TabOrchestrationService,
    TabOrchestratorSettings, DEFAULT_OPTIMIZE_INTERVAL, DEFAULT_SUSPENSION_INTERVAL,
};
pub use tab_search::search_tabs;
