use serde::{Deserialize, Serialize};

/// One resource sample of a running process
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ProcessMetrics {
    /// Resident memory in bytes
    pub memory_bytes: u64,
    /// CPU usage in percent of one core
    pub cpu_percent: f64,
}
