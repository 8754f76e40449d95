//! Configuration loading from a YAML file
//!
//! Every section and field is optional; omitted values fall back to the
//! defaults in `crate::constants`. Memory sizes are strings such as "512M".

use crate::constants::{budgets, daemon, ipc, monitors, process, suspension};
use crate::domain::services::{IpcSettings, ProcessManagerSettings, TabOrchestratorSettings};
use crate::domain::{
    parse_memory, DomainError, HealthThresholds, HybridWeights, NetworkPriority, ResourceBudget,
    Result, StrategyKind, SuspensionStrategy,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub rebalancer: RebalancerConfig,

    #[serde(default)]
    pub suspension: SuspensionConfig,

    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub budgets: BudgetsConfig,

    #[serde(default)]
    pub ipc: IpcConfig,

    #[serde(default)]
    pub process: ProcessSpawnConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_health_interval")]
    pub interval_sec: u64,

    /// Footprint above which a process is degraded (e.g., "1G")
    #[serde(default = "default_memory_ceiling")]
    pub memory_ceiling: String,

    #[serde(default = "default_cpu_ceiling")]
    pub cpu_ceiling_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RebalancerConfig {
    #[serde(default = "default_rebalance_interval")]
    pub interval_sec: u64,

    /// Tab-less processes above this footprint are suspended (e.g., "100M")
    #[serde(default = "default_idle_memory_threshold")]
    pub idle_memory_threshold: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspensionConfig {
    #[serde(default = "default_suspension_interval")]
    pub interval_sec: u64,

    /// lru, usage-based, time-based, memory-based or hybrid
    #[serde(default = "default_strategy")]
    pub strategy: String,

    #[serde(default = "default_threshold")]
    pub threshold: f64,

    #[serde(default = "default_grace_period")]
    pub grace_period_sec: u64,

    /// Hybrid weights; equal thirds when omitted
    #[serde(default)]
    pub weights: Option<WeightsConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightsConfig {
    #[serde(default)]
    pub time: f64,

    #[serde(default)]
    pub memory: f64,

    #[serde(default)]
    pub usage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Total budget memory optimization measures against (e.g., "4G")
    #[serde(default = "default_memory_limit")]
    pub limit: String,

    /// Run memory optimization periodically; on demand only when omitted
    #[serde(default)]
    pub optimize_interval_sec: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetsConfig {
    #[serde(default = "default_normal_budget")]
    pub normal: BudgetConfig,

    #[serde(default = "default_minimal_budget")]
    pub minimal: BudgetConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    pub memory: String,

    /// CPU quota in percent
    pub cpu_quota: f64,

    #[serde(default)]
    pub network_priority: Option<NetworkPriority>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcConfig {
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: u64,

    #[serde(default = "default_subscriber_queue_capacity")]
    pub subscriber_queue_capacity: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessSpawnConfig {
    #[serde(default = "default_spawn_timeout")]
    pub spawn_timeout_sec: u64,
}

fn default_health_interval() -> u64 {
    monitors::DEFAULT_HEALTH_INTERVAL_SEC
}

fn default_memory_ceiling() -> String {
    budgets::DEFAULT_MEMORY_CEILING.to_string()
}

fn default_cpu_ceiling() -> f64 {
    crate::domain::constants::DEFAULT_CPU_CEILING_PERCENT
}

fn default_rebalance_interval() -> u64 {
    monitors::DEFAULT_REBALANCE_INTERVAL_SEC
}

fn default_idle_memory_threshold() -> String {
    budgets::DEFAULT_IDLE_MEMORY_THRESHOLD.to_string()
}

fn default_suspension_interval() -> u64 {
    monitors::DEFAULT_SUSPENSION_INTERVAL_SEC
}

fn default_strategy() -> String {
    suspension::DEFAULT_STRATEGY.to_string()
}

fn default_threshold() -> f64 {
    suspension::DEFAULT_THRESHOLD
}

fn default_grace_period() -> u64 {
    suspension::DEFAULT_GRACE_PERIOD_SEC
}

fn default_memory_limit() -> String {
    budgets::DEFAULT_MEMORY_LIMIT.to_string()
}

fn default_normal_budget() -> BudgetConfig {
    BudgetConfig {
        memory: budgets::DEFAULT_NORMAL_MEMORY.to_string(),
        cpu_quota: crate::domain::constants::DEFAULT_NORMAL_CPU_QUOTA,
        network_priority: None,
    }
}

fn default_minimal_budget() -> BudgetConfig {
    BudgetConfig {
        memory: budgets::DEFAULT_MINIMAL_MEMORY.to_string(),
        cpu_quota: crate::domain::constants::DEFAULT_MINIMAL_CPU_QUOTA,
        network_priority: None,
    }
}

fn default_request_timeout() -> u64 {
    ipc::DEFAULT_REQUEST_TIMEOUT_MS
}

fn default_subscriber_queue_capacity() -> usize {
    ipc::DEFAULT_SUBSCRIBER_QUEUE_CAPACITY
}

fn default_spawn_timeout() -> u64 {
    process::DEFAULT_SPAWN_TIMEOUT_SEC
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_sec: default_health_interval(),
            memory_ceiling: default_memory_ceiling(),
            cpu_ceiling_percent: default_cpu_ceiling(),
        }
    }
}

impl Default for RebalancerConfig {
    fn default() -> Self {
        Self {
            interval_sec: default_rebalance_interval(),
            idle_memory_threshold: default_idle_memory_threshold(),
        }
    }
}

impl Default for SuspensionConfig {
    fn default() -> Self {
        Self {
            interval_sec: default_suspension_interval(),
            strategy: default_strategy(),
            threshold: default_threshold(),
            grace_period_sec: default_grace_period(),
            weights: None,
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            limit: default_memory_limit(),
            optimize_interval_sec: None,
        }
    }
}

impl Default for BudgetsConfig {
    fn default() -> Self {
        Self {
            normal: default_normal_budget(),
            minimal: default_minimal_budget(),
        }
    }
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout(),
            subscriber_queue_capacity: default_subscriber_queue_capacity(),
        }
    }
}

impl Default for ProcessSpawnConfig {
    fn default() -> Self {
        Self {
            spawn_timeout_sec: default_spawn_timeout(),
        }
    }
}

/// Validated runtime settings for every orchestrator component
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    pub health_interval: Duration,
    pub health_thresholds: HealthThresholds,
    pub rebalance_interval: Duration,
    pub idle_memory_threshold: u64,
    pub suspension_interval: Duration,
    /// None disables the periodic memory optimizer
    pub optimize_interval: Option<Duration>,
    pub process: ProcessManagerSettings,
    pub ipc: IpcSettings,
    pub orchestrator: TabOrchestratorSettings,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            health_interval: Duration::from_secs(monitors::DEFAULT_HEALTH_INTERVAL_SEC),
            health_thresholds: HealthThresholds::default(),
            rebalance_interval: Duration::from_secs(monitors::DEFAULT_REBALANCE_INTERVAL_SEC),
            idle_memory_threshold: crate::domain::constants::DEFAULT_IDLE_MEMORY_THRESHOLD_BYTES,
            suspension_interval: Duration::from_secs(monitors::DEFAULT_SUSPENSION_INTERVAL_SEC),
            optimize_interval: None,
            process: ProcessManagerSettings::default(),
            ipc: IpcSettings::default(),
            orchestrator: TabOrchestratorSettings::default(),
        }
    }
}

fn invalid(message: impl Into<String>) -> DomainError {
    DomainError::InvalidConfiguration(message.into())
}

fn memory(field: &str, value: &str) -> Result<u64> {
    parse_memory(value).map_err(|e| invalid(format!("{}: {}", field, e)))
}

fn interval(field: &str, secs: u64) -> Result<Duration> {
    if secs == 0 {
        return Err(invalid(format!("{} must be greater than zero", field)));
    }
    Ok(Duration::from_secs(secs))
}

fn cpu_quota(field: &str, quota: f64) -> Result<f64> {
    if !(quota > 0.0 && quota <= 100.0) {
        return Err(invalid(format!(
            "{} must be in (0, 100], got {}",
            field, quota
        )));
    }
    Ok(quota)
}

impl BudgetConfig {
    fn to_budget(&self, field: &str, default_priority: NetworkPriority) -> Result<ResourceBudget> {
        Ok(ResourceBudget {
            memory_bytes: memory(&format!("{}.memory", field), &self.memory)?,
            cpu_quota: cpu_quota(&format!("{}.cpu_quota", field), self.cpu_quota)?,
            network_priority: self.network_priority.unwrap_or(default_priority),
        })
    }
}

impl OrchestratorConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &str) -> std::result::Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file '{}': {}", path, e))?;

        Self::from_yaml(&contents).map_err(|e| format!("Failed to parse YAML from '{}': {}", path, e))
    }

    pub fn from_yaml(contents: &str) -> std::result::Result<Self, serde_yaml::Error> {
        // An empty file means all defaults
        if contents.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(contents)
    }

    /// Validate every field and build the runtime settings
    pub fn into_settings(self) -> Result<OrchestratorSettings> {
        let normal_budget = self
            .budgets
            .normal
            .to_budget("budgets.normal", NetworkPriority::Normal)?;
        let minimal_budget = self
            .budgets
            .minimal
            .to_budget("budgets.minimal", NetworkPriority::Low)?;
        if minimal_budget.memory_bytes > normal_budget.memory_bytes
            || minimal_budget.cpu_quota > normal_budget.cpu_quota
        {
            return Err(invalid("budgets.minimal cannot exceed budgets.normal"));
        }

        let kind: StrategyKind = self.suspension.strategy.parse().map_err(invalid)?;
        let mut strategy = SuspensionStrategy::new(kind)
            .with_threshold(self.suspension.threshold)
            .with_grace_period(Duration::from_secs(self.suspension.grace_period_sec));
        if let Some(w) = self.suspension.weights {
            strategy = strategy.with_weights(HybridWeights {
                time: w.time,
                memory: w.memory,
                usage: w.usage,
            });
        }
        strategy.validate()?;

        let memory_limit = memory("memory.limit", &self.memory.limit)?;
        if memory_limit == 0 {
            return Err(invalid("memory.limit must be greater than zero"));
        }

        if self.ipc.request_timeout_ms == 0 {
            return Err(invalid("ipc.request_timeout_ms must be greater than zero"));
        }
        if self.ipc.subscriber_queue_capacity == 0 {
            return Err(invalid(
                "ipc.subscriber_queue_capacity must be greater than zero",
            ));
        }

        Ok(OrchestratorSettings {
            health_interval: interval("health.interval_sec", self.health.interval_sec)?,
            health_thresholds: HealthThresholds {
                memory_ceiling_bytes: memory("health.memory_ceiling", &self.health.memory_ceiling)?,
                cpu_ceiling_percent: cpu_quota(
                    "health.cpu_ceiling_percent",
                    self.health.cpu_ceiling_percent,
                )?,
            },
            rebalance_interval: interval("rebalancer.interval_sec", self.rebalancer.interval_sec)?,
            idle_memory_threshold: memory(
                "rebalancer.idle_memory_threshold",
                &self.rebalancer.idle_memory_threshold,
            )?,
            suspension_interval: interval(
                "suspension.interval_sec",
                self.suspension.interval_sec,
            )?,
            optimize_interval: self
                .memory
                .optimize_interval_sec
                .map(|secs| interval("memory.optimize_interval_sec", secs))
                .transpose()?,
            process: ProcessManagerSettings {
                normal_budget,
                minimal_budget,
                spawn_timeout: interval("process.spawn_timeout_sec", self.process.spawn_timeout_sec)?,
            },
            ipc: IpcSettings {
                request_timeout: Duration::from_millis(self.ipc.request_timeout_ms),
                subscriber_queue_capacity: self.ipc.subscriber_queue_capacity,
            },
            orchestrator: TabOrchestratorSettings {
                suspension_strategy: strategy,
                memory_limit,
            },
        })
    }
}

/// Configuration file location: `ORCH_CONFIG_FILE`, then the default path if
/// it exists
pub fn get_default_config_path() -> Option<String> {
    if let Ok(path) = std::env::var(daemon::CONFIG_FILE_ENV) {
        return Some(path);
    }

    if Path::new(daemon::DEFAULT_CONFIG_PATH).is_file() {
        return Some(daemon::DEFAULT_CONFIG_PATH.to_string());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::constants::{BYTES_PER_GB, BYTES_PER_MB};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let file = write_config("");
        let config = OrchestratorConfig::load(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config, OrchestratorConfig::default());

        let settings = config.into_settings().unwrap();
        assert_eq!(settings, OrchestratorSettings::default());
    }

    #[test]
    fn test_full_config_is_parsed() {
        let file = write_config(
            r#"
health:
  interval_sec: 2
  memory_ceiling: 2G
  cpu_ceiling_percent: 80
rebalancer:
  interval_sec: 15
  idle_memory_threshold: 64M
suspension:
  interval_sec: 30
  strategy: time-based
  threshold: 20
  grace_period_sec: 600
memory:
  limit: 8G
  optimize_interval_sec: 90
budgets:
  normal:
    memory: 256M
    cpu_quota: 40
  minimal:
    memory: 8M
    cpu_quota: 2
    network_priority: low
ipc:
  request_timeout_ms: 1500
  subscriber_queue_capacity: 32
process:
  spawn_timeout_sec: 3
"#,
        );

        let settings = OrchestratorConfig::load(file.path().to_str().unwrap())
            .unwrap()
            .into_settings()
            .unwrap();

        assert_eq!(settings.health_interval, Duration::from_secs(2));
        assert_eq!(settings.health_thresholds.memory_ceiling_bytes, 2 * BYTES_PER_GB);
        assert_eq!(settings.idle_memory_threshold, 64 * BYTES_PER_MB);
        assert_eq!(settings.optimize_interval, Some(Duration::from_secs(90)));
        assert_eq!(settings.process.normal_budget.memory_bytes, 256 * BYTES_PER_MB);
        assert_eq!(settings.process.minimal_budget.network_priority, NetworkPriority::Low);
        assert_eq!(settings.process.spawn_timeout, Duration::from_secs(3));
        assert_eq!(settings.ipc.request_timeout, Duration::from_millis(1500));
        assert_eq!(settings.orchestrator.memory_limit, 8 * BYTES_PER_GB);
        assert_eq!(
            settings.orchestrator.suspension_strategy.kind,
            StrategyKind::TimeBased
        );
        assert_eq!(
            settings.orchestrator.suspension_strategy.grace_period,
            Duration::from_secs(600)
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let cases = [
            "suspension:\n  strategy: fifo\n",
            "memory:\n  limit: lots\n",
            "health:\n  interval_sec: 0\n",
            "budgets:\n  minimal:\n    memory: 1G\n    cpu_quota: 5\n",
            "suspension:\n  weights:\n    time: 0\n    memory: 0\n    usage: 0\n",
            "ipc:\n  subscriber_queue_capacity: 0\n",
        ];

        for yaml in cases {
            let config = OrchestratorConfig::from_yaml(yaml).unwrap();
            assert!(
                matches!(config.into_settings(), Err(DomainError::InvalidConfiguration(_))),
                "expected rejection for {:?}",
                yaml
            );
        }
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = OrchestratorConfig::load("/nonexistent/orchestrator.yaml").unwrap_err();
        assert!(err.contains("Failed to read config file"));
    }
}
