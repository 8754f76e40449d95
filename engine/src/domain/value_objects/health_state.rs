//! HealthState value object
//! Health classification of a process derived from sampled metrics

use crate::domain::constants::{DEFAULT_CPU_CEILING_PERCENT, DEFAULT_MEMORY_CEILING_BYTES};
use crate::domain::ProcessMetrics;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    #[default]
    Healthy,
    Degraded,
    Critical,
    /// Terminal until the process is recreated
    Dead,
}

impl HealthState {
    fn severity(self) -> u8 {
        match self {
            HealthState::Healthy => 0,
            HealthState::Degraded => 1,
            HealthState::Critical => 2,
            HealthState::Dead => 3,
        }
    }

    pub fn is_dead(&self) -> bool {
        matches!(self, HealthState::Dead)
    }

    /// Resolve the next state from an observed classification.
    ///
    /// Escalation is applied immediately. Regression only goes straight back
    /// to Healthy and only once a remediation pass has run since the last
    /// escalation. Dead never changes.
    pub fn next(self, observed: HealthState, remediated: bool) -> HealthState {
        if self.is_dead() {
            return HealthState::Dead;
        }
        if observed.severity() > self.severity() {
            return observed;
        }
        if observed == HealthState::Healthy && self != HealthState::Healthy && remediated {
            return HealthState::Healthy;
        }
        self
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthState::Healthy => write!(f, "healthy"),
            HealthState::Degraded => write!(f, "degraded"),
            HealthState::Critical => write!(f, "critical"),
            HealthState::Dead => write!(f, "dead"),
        }
    }
}

/// Ceilings applied by the health monitor
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealthThresholds {
    pub memory_ceiling_bytes: u64,
    pub cpu_ceiling_percent: f64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            memory_ceiling_bytes: DEFAULT_MEMORY_CEILING_BYTES,
            cpu_ceiling_percent: DEFAULT_CPU_CEILING_PERCENT,
        }
    }
}

impl HealthThresholds {
    /// Ordered rules: unavailable metrics, cpu ceiling, memory ceiling
    pub fn classify(&self, metrics: Option<&ProcessMetrics>) -> HealthState {
        match metrics {
            None => HealthState::Dead,
            Some(m) if m.cpu_percent > self.cpu_ceiling_percent => HealthState::Critical,
            Some(m) if m.memory_bytes > self.memory_ceiling_bytes => HealthState::Degraded,
            Some(_) => HealthState::Healthy,
        }
    }
}
