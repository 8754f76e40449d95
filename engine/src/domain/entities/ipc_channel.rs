use crate::domain::{ChannelId, ChannelType, EndpointId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A named channel scoped to a fixed set of endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcChannel {
    pub id: ChannelId,
    pub name: String,
    pub channel_type: ChannelType,
    pub endpoints: BTreeSet<EndpointId>,
    pub secure: bool,
    pub created_at: DateTime<Utc>,
}

impl IpcChannel {
    /// True if both endpoints participate in this channel
    pub fn connects(&self, from: &EndpointId, to: &EndpointId) -> bool {
        self.endpoints.contains(from) && self.endpoints.contains(to)
    }
}
