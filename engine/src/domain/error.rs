//! Domain-level errors
//! These represent business rule violations and collaborator failures

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // Process lifecycle errors
    #[error("Process '{0}' not found")]
    ProcessNotFound(String),

    #[error("Failed to spawn process: {0}")]
    SpawnFailed(String),

    #[error("Failed to terminate process '{id}': {reason}")]
    TerminateFailed { id: String, reason: String },

    #[error("Metrics unavailable for process '{0}'")]
    MetricsUnavailable(String),

    // IPC errors
    #[error("Channel '{0}' not found")]
    ChannelNotFound(String),

    #[error("No channel connects '{from}' and '{to}'")]
    NoChannel { from: String, to: String },

    #[error("No response to message '{message_id}' within {timeout_ms}ms")]
    IpcTimeout { message_id: String, timeout_ms: u64 },

    // Tab/space errors
    #[error("Tab '{0}' not found")]
    TabNotFound(String),

    #[error("Group '{0}' not found")]
    GroupNotFound(String),

    #[error("Space '{0}' not found")]
    SpaceNotFound(String),

    #[error("Invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Snapshot store failure: {0}")]
    SnapshotFailed(String),

    // Validation errors
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    // Configuration errors
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    // Import/export errors
    #[error("Unsupported bundle version {found} (expected {expected})")]
    UnsupportedBundleVersion { found: u32, expected: u32 },

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Infrastructure errors
    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl DomainError {
    /// True for the "entity does not exist" family of errors
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            DomainError::ProcessNotFound(_)
                | DomainError::ChannelNotFound(_)
                | DomainError::TabNotFound(_)
                | DomainError::GroupNotFound(_)
                | DomainError::SpaceNotFound(_)
        )
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(e: serde_json::Error) -> Self {
        DomainError::Serialization(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, DomainError>;
