pub mod commands;
pub mod constants;
pub mod entities;
pub mod error;
pub mod ports;
pub mod queries;
pub mod services;
pub mod value_objects;

pub use commands::{CreateProcessCommand, CreateProcessResponse, TabOptions, TabUpdate};
pub use entities::{IpcChannel, IpcMessage, ProcessRecord, Space, Tab, TabGroup};
pub use error::{DomainError, Result};
pub use queries::{SortField, SortOrder, TabSearchQuery, TabSearchResults};
pub use value_objects::{
    format_bytes, parse_memory, AiMetadata, ChannelId, ChannelType, EndpointId, GroupId,
    HealthState, HealthThresholds, HybridWeights, MessageId, MessageKind, NetworkPriority,
    PageState, ProcessId, ProcessMetrics, ProcessType, ResourceAllocation, ResourceBudget,
    SecurityRating, Sentiment, SpaceId, SpaceLayout, SpaceSettings, StrategyKind,
    SuspensionStrategy, TabId, TabStatus,
};
