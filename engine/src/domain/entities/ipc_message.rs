use crate::domain::{EndpointId, MessageId, MessageKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A routed control-plane message. Transient: never stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpcMessage {
    pub id: MessageId,
    pub kind: MessageKind,
    pub from: EndpointId,
    pub to: EndpointId,
    pub payload: serde_json::Value,
    pub timestamp: DateTime<Utc>,
    pub requires_response: bool,
    /// Set on replies: id of the request being answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<MessageId>,
}

impl IpcMessage {
    pub fn new(
        kind: MessageKind,
        from: impl Into<EndpointId>,
        to: impl Into<EndpointId>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            kind,
            from: from.into(),
            to: to.into(),
            payload,
            timestamp: Utc::now(),
            requires_response: false,
            correlation_id: None,
        }
    }

    pub fn requiring_response(mut self) -> Self {
        self.requires_response = true;
        self
    }

    /// Build the reply to this message, routed back to its sender
    pub fn reply(&self, kind: MessageKind, payload: serde_json::Value) -> Self {
        Self {
            id: MessageId::generate(),
            kind,
            from: self.to.clone(),
            to: self.from.clone(),
            payload,
            timestamp: Utc::now(),
            requires_response: false,
            correlation_id: Some(self.id),
        }
    }
}
