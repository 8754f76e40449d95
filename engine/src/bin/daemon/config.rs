//! Daemon configuration from environment variables
//!
//! Only the config file location and the log level come from the environment;
//! everything else lives in the YAML file.

use orch_engine::constants::daemon::{
    CONFIG_FILE_ENV, DEFAULT_CONFIG_PATH, DEFAULT_LOG_LEVEL, LOG_LEVEL_ENV,
};
use std::env;
use std::path::Path;

/// Daemon configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Config file path
    pub config_file: Option<String>,

    /// Log level
    pub log_level: String,
}

impl DaemonConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            config_file: Self::parse_config_file(),
            log_level: Self::parse_log_level(),
        }
    }

    fn parse_config_file() -> Option<String> {
        env::var(CONFIG_FILE_ENV)
            .ok()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| {
                Path::new(DEFAULT_CONFIG_PATH)
                    .is_file()
                    .then(|| DEFAULT_CONFIG_PATH.to_string())
            })
    }

    fn parse_log_level() -> String {
        // Priority: ORCH_LOG_LEVEL > RUST_LOG > default
        env::var(LOG_LEVEL_ENV)
            .or_else(|_| env::var("RUST_LOG"))
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if let Some(path) = &self.config_file {
            if !Path::new(path).is_file() {
                return Err(format!("{} points to a missing file: {}", CONFIG_FILE_ENV, path));
            }
        }
        Ok(())
    }
}
