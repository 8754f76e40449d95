//! EndpointId value object
//! Names a participant of an IPC channel ("main" or a process id)

use crate::domain::constants::MAIN_ENDPOINT;
use crate::domain::ProcessId;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EndpointId(String);

impl EndpointId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The orchestrator side of control channels
    pub fn main() -> Self {
        Self(MAIN_ENDPOINT.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EndpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<ProcessId> for EndpointId {
    fn from(id: ProcessId) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for EndpointId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}
