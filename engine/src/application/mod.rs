//! Application Layer
//!
//! Composition root wiring domain services to infrastructure adapters.

pub mod registry;

pub use registry::OrchestratorRegistry;
