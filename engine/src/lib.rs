//! Process, IPC and tab/space orchestration core for a multi-process browser.
//!
//! - `domain`: entities, value objects, ports and the IPC manager, process
//!   manager and tab orchestrator services
//! - `infrastructure`: in-memory adapters and YAML configuration
//! - `application`: the registry that wires everything and runs the monitors

pub mod application;
pub mod constants;
pub mod domain;
pub mod infrastructure;
