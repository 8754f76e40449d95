//! ResourceAllocation value object
//! Budgets sent to worker processes over their control channel

use crate::domain::constants::*;
use crate::domain::ProcessId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Scheduling priority for a process's network traffic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NetworkPriority {
    Low,
    #[default]
    Normal,
    High,
}

/// A memory/cpu budget independent of any process
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResourceBudget {
    pub memory_bytes: u64,
    /// CPU quota in percent
    pub cpu_quota: f64,
    pub network_priority: NetworkPriority,
}

impl ResourceBudget {
    pub fn normal() -> Self {
        Self {
            memory_bytes: DEFAULT_NORMAL_MEMORY_BYTES,
            cpu_quota: DEFAULT_NORMAL_CPU_QUOTA,
            network_priority: NetworkPriority::Normal,
        }
    }

    pub fn minimal() -> Self {
        Self {
            memory_bytes: DEFAULT_MINIMAL_MEMORY_BYTES,
            cpu_quota: DEFAULT_MINIMAL_CPU_QUOTA,
            network_priority: NetworkPriority::Low,
        }
    }

    /// Bind this budget to a process
    pub fn for_process(&self, process_id: ProcessId) -> ResourceAllocation {
        ResourceAllocation {
            process_id,
            memory_limit: self.memory_bytes,
            cpu_quota: self.cpu_quota,
            network_priority: self.network_priority,
            gpu_memory: None,
        }
    }
}

/// Control instruction carrying a process budget. Not persisted beyond the
/// last allocation recorded on the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceAllocation {
    pub process_id: ProcessId,
    /// Memory limit in bytes
    pub memory_limit: u64,
    /// CPU quota in percent
    pub cpu_quota: f64,
    pub network_priority: NetworkPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpu_memory: Option<u64>,
}

impl ResourceAllocation {
    /// True if this allocation does not exceed the given budget
    pub fn within(&self, budget: &ResourceBudget) -> bool {
        self.memory_limit <= budget.memory_bytes && self.cpu_quota <= budget.cpu_quota
    }

    /// True if this allocation is exactly the given budget
    pub fn matches(&self, budget: &ResourceBudget) -> bool {
        self.memory_limit == budget.memory_bytes
            && (self.cpu_quota - budget.cpu_quota).abs() < f64::EPSILON
            && self.network_priority == budget.network_priority
    }
}

impl fmt::Display for ResourceAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "memory={}, cpu={}%",
            format_bytes(self.memory_limit),
            self.cpu_quota
        )
    }
}

/// Parse memory string to bytes
/// Examples: "256M" -> 268435456, "1G" -> 1073741824, "512K" -> 524288
pub fn parse_memory(mem_str: &str) -> Result<u64, String> {
    let mem_str = mem_str.trim();
    if mem_str.is_empty() {
        return Err("Empty memory string".to_string());
    }

    let (value_str, multiplier) = if let Some(v) = mem_str.strip_suffix('K') {
        (v, BYTES_PER_KB)
    } else if let Some(v) = mem_str.strip_suffix('M') {
        (v, BYTES_PER_MB)
    } else if let Some(v) = mem_str.strip_suffix('G') {
        (v, BYTES_PER_GB)
    } else if let Some(v) = mem_str.strip_suffix('T') {
        (v, BYTES_PER_TB)
    } else {
        // No suffix, assume bytes
        (mem_str, 1_u64)
    };

    let value: u64 = value_str
        .trim()
        .parse()
        .map_err(|e| format!("Invalid memory value '{}': {}", mem_str, e))?;

    value
        .checked_mul(multiplier)
        .ok_or_else(|| format!("Memory value '{}' overflows", mem_str))
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    if bytes >= BYTES_PER_GB && bytes % BYTES_PER_GB == 0 {
        format!("{}G", bytes / BYTES_PER_GB)
    } else if bytes >= BYTES_PER_MB {
        format!("{}M", bytes / BYTES_PER_MB)
    } else if bytes >= BYTES_PER_KB {
        format!("{}K", bytes / BYTES_PER_KB)
    } else {
        format!("{}B", bytes)
    }
}
