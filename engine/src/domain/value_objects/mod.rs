pub mod ai_metadata;
pub mod endpoint;
pub mod health_state;
pub mod ids;
pub mod ipc;
pub mod page_state;
pub mod process_metrics;
pub mod process_type;
pub mod resource_allocation;
pub mod space_settings;
pub mod suspension_strategy;
pub mod tab_status;

pub use ai_metadata::{AiMetadata, SecurityRating, Sentiment};
pub use endpoint::EndpointId;
pub use health_state::{HealthState, HealthThresholds};
pub use ids::{ChannelId, GroupId, MessageId, ProcessId, SpaceId, TabId};
pub use ipc::{ChannelType, MessageKind};
pub use page_state::PageState;
pub use process_metrics::ProcessMetrics;
pub use process_type::ProcessType;
pub use resource_allocation::{
    format_bytes, parse_memory, NetworkPriority, ResourceAllocation, ResourceBudget,
};
pub use space_settings::{SpaceLayout, SpaceSettings};
pub use suspension_strategy::{HybridWeights, StrategyKind, SuspensionStrategy};
pub use tab_status::TabStatus;
