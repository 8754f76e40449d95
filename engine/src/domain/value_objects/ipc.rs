//! IPC value objects
//! Channel categories and message kinds

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    #[default]
    Control,
    Data,
    Event,
    Ai,
}

impl ChannelType {
    /// Control and AI channels carry privileged traffic
    pub fn is_secure(&self) -> bool {
        matches!(self, ChannelType::Control | ChannelType::Ai)
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelType::Control => write!(f, "control"),
            ChannelType::Data => write!(f, "data"),
            ChannelType::Event => write!(f, "event"),
            ChannelType::Ai => write!(f, "ai"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    ResourceAllocation,
    Suspend,
    Resume,
    Trim,
    Reply,
    Custom(String),
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageKind::ResourceAllocation => write!(f, "resource-allocation"),
            MessageKind::Suspend => write!(f, "suspend"),
            MessageKind::Resume => write!(f, "resume"),
            MessageKind::Trim => write!(f, "trim"),
            MessageKind::Reply => write!(f, "reply"),
            MessageKind::Custom(name) => write!(f, "{}", name),
        }
    }
}
