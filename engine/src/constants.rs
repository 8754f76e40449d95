//! Application-wide constants and default values
//!
//! Centralizes configuration defaults used by the config loader and the daemon

/// Daemon environment and startup defaults
pub mod daemon {
    /// Environment variable naming the YAML configuration file
    pub const CONFIG_FILE_ENV: &str = "ORCH_CONFIG_FILE";

    /// Environment variable overriding the log level (takes precedence over RUST_LOG)
    pub const LOG_LEVEL_ENV: &str = "ORCH_LOG_LEVEL";

    pub const DEFAULT_LOG_LEVEL: &str = "info";

    /// Configuration file used when the environment does not name one
    pub const DEFAULT_CONFIG_PATH: &str = "/etc/orchd/orchestrator.yaml";
}

/// Background monitor cadences (seconds)
pub mod monitors {
    pub const DEFAULT_HEALTH_INTERVAL_SEC: u64 = 5;

    pub const DEFAULT_REBALANCE_INTERVAL_SEC: u64 = 30;

    pub const DEFAULT_SUSPENSION_INTERVAL_SEC: u64 = 60;
}

/// Suspension strategy defaults
pub mod suspension {
    pub const DEFAULT_STRATEGY: &str = "hybrid";

    /// Threshold in strategy units (minutes for usage-based, MB for memory-based)
    pub const DEFAULT_THRESHOLD: f64 = 30.0;

    /// Grace period (seconds, 30 minutes)
    pub const DEFAULT_GRACE_PERIOD_SEC: u64 = 30 * 60;
}

/// Budget defaults as memory strings understood by `parse_memory`
pub mod budgets {
    pub const DEFAULT_NORMAL_MEMORY: &str = "512M";

    pub const DEFAULT_MINIMAL_MEMORY: &str = "10M";

    pub const DEFAULT_MEMORY_LIMIT: &str = "4G";

    pub const DEFAULT_MEMORY_CEILING: &str = "1G";

    pub const DEFAULT_IDLE_MEMORY_THRESHOLD: &str = "100M";
}

/// IPC defaults
pub mod ipc {
    pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;

    pub const DEFAULT_SUBSCRIBER_QUEUE_CAPACITY: usize = 256;
}

/// Process spawn defaults
pub mod process {
    pub const DEFAULT_SPAWN_TIMEOUT_SEC: u64 = 10;
}
