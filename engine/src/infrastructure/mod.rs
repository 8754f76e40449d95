//! Infrastructure Layer
//!
//! This module contains the adapters that implement the ports defined in the domain layer.
//! These are the "driven adapters" (infrastructure implementations).
//!
//! ## Adapters
//!
//! - `InMemoryProcessRepository`: Thread-safe in-memory storage for process records
//! - `SimulatedSubstrate`: In-process stand-in for the OS process substrate
//! - `InMemorySnapshotStore`: Snapshot storage for suspended tabs
//! - `BroadcastEventBus`: Lifecycle event fan-out over a tokio broadcast channel
//! - `SystemClock` / `ManualClock`: Wall clock and a settable clock for tests
//!
//! ## Usage
//!
//! ```rust,no_run
//! use orch_engine::infrastructure::{InMemoryProcessRepository, SimulatedSubstrate};
//! use std::sync::Arc;
//!
//! let repository = Arc::new(InMemoryProcessRepository::new());
//! let substrate = Arc::new(SimulatedSubstrate::new());
//!
//! // Wire into the process manager...
//! ```

pub mod broadcast_event_bus;
pub mod clock;
pub mod config;
pub mod in_memory_repository;
pub mod in_memory_snapshot_store;
pub mod simulated_substrate;

pub use broadcast_event_bus::{BroadcastEventBus, DEFAULT_EVENT_BUS_CAPACITY};
pub use clock::{ManualClock, SystemClock};
pub use config::{get_default_config_path, OrchestratorConfig, OrchestratorSettings};
pub use in_memory_repository::InMemoryProcessRepository;
pub use in_memory_snapshot_store::InMemorySnapshotStore;
pub use simulated_substrate::{SimulatedSubstrate, DEFAULT_SIMULATED_MEMORY_BYTES};
