//! IPC Manager
//! Channel-scoped message routing between the orchestrator and workers
//!
//! Channels are scoped to a fixed endpoint set. A message is routed over the
//! channel that connects its `from` and `to` endpoints and fanned out
//! synchronously to every subscriber of that channel. Request/response is
//! layered on top through correlation ids: `request` parks a oneshot sender
//! keyed by the request id and a reply carrying that id completes it.

use crate::domain::{
    ChannelId, ChannelType, DomainError, EndpointId, IpcChannel, IpcMessage, MessageId,
    MessageKind, Result,
};
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Default bound for queue-backed subscribers
pub const DEFAULT_SUBSCRIBER_QUEUE_CAPACITY: usize = 256;

/// Default wait for correlated replies
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Callback invoked for every message delivered on a channel
pub type MessageHandler = Arc<dyn Fn(&IpcMessage) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IpcSettings {
    pub request_timeout: Duration,
    pub subscriber_queue_capacity: usize,
}

impl Default for IpcSettings {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            subscriber_queue_capacity: DEFAULT_SUBSCRIBER_QUEUE_CAPACITY,
        }
    }
}

struct Subscriber {
    id: u64,
    handler: MessageHandler,
}

struct ChannelEntry {
    channel: IpcChannel,
    subscribers: Vec<Subscriber>,
}

struct IpcInner {
    channels: RwLock<HashMap<ChannelId, ChannelEntry>>,
    pending: Mutex<HashMap<MessageId, oneshot::Sender<IpcMessage>>>,
    next_subscriber: AtomicU64,
    settings: IpcSettings,
}

impl IpcInner {
    fn remove_subscriber(&self, channel_id: &ChannelId, subscriber_id: u64) -> bool {
        let mut channels = self
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        match channels.get_mut(channel_id) {
            Some(entry) => {
                let before = entry.subscribers.len();
                entry.subscribers.retain(|s| s.id != subscriber_id);
                before != entry.subscribers.len()
            }
            None => false,
        }
    }
}

/// Handle returned by `subscribe`; call `unsubscribe` to stop delivery.
/// Dropping the handle keeps the subscription alive.
pub struct Subscription {
    channel_id: ChannelId,
    subscriber_id: u64,
    manager: Weak<IpcInner>,
}

impl Subscription {
    pub fn channel_id(&self) -> ChannelId {
        self.channel_id
    }

    /// Returns false if the subscription was already gone (unsubscribed
    /// before, or its channel was destroyed)
    pub fn unsubscribe(self) -> bool {
        match self.manager.upgrade() {
            Some(inner) => inner.remove_subscriber(&self.channel_id, self.subscriber_id),
            None => false,
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("channel_id", &self.channel_id)
            .field("subscriber_id", &self.subscriber_id)
            .finish()
    }
}

#[derive(Clone)]
pub struct IpcManager {
    inner: Arc<IpcInner>,
}

impl IpcManager {
    pub fn new(settings: IpcSettings) -> Self {
        Self {
            inner: Arc::new(IpcInner {
                channels: RwLock::new(HashMap::new()),
                pending: Mutex::new(HashMap::new()),
                next_subscriber: AtomicU64::new(1),
                settings,
            }),
        }
    }

    pub fn settings(&self) -> IpcSettings {
        self.inner.settings
    }

    /// Create a channel with a generated id and no subscribers
    pub fn create_channel(
        &self,
        name: impl Into<String>,
        channel_type: ChannelType,
        endpoints: impl IntoIterator<Item = EndpointId>,
    ) -> IpcChannel {
        let channel = IpcChannel {
            id: ChannelId::generate(),
            name: name.into(),
            channel_type,
            endpoints: endpoints.into_iter().collect::<BTreeSet<_>>(),
            secure: channel_type.is_secure(),
            created_at: Utc::now(),
        };

        let mut channels = self
            .inner
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        channels.insert(
            channel.id,
            ChannelEntry {
                channel: channel.clone(),
                subscribers: Vec::new(),
            },
        );

        debug!(
            channel_id = %channel.id,
            name = %channel.name,
            channel_type = %channel_type,
            total_channels = channels.len(),
            "Channel created"
        );

        channel
    }

    /// Remove a channel and every subscriber attached to it
    pub fn destroy_channel(&self, id: &ChannelId) -> Result<IpcChannel> {
        let entry = self
            .inner
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
            .ok_or_else(|| DomainError::ChannelNotFound(id.to_string()))?;

        debug!(
            channel_id = %id,
            dropped_subscribers = entry.subscribers.len(),
            "Channel destroyed"
        );

        Ok(entry.channel)
    }

    pub fn get_channel(&self, id: &ChannelId) -> Option<IpcChannel> {
        self.inner
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|e| e.channel.clone())
    }

    pub fn list_channels(&self) -> Vec<IpcChannel> {
        let mut channels: Vec<IpcChannel> = self
            .inner
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(|e| e.channel.clone())
            .collect();
        channels.sort_by_key(|c| (c.created_at, c.id));
        channels
    }

    pub fn subscriber_count(&self, id: &ChannelId) -> Result<usize> {
        self.inner
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .map(|e| e.subscribers.len())
            .ok_or_else(|| DomainError::ChannelNotFound(id.to_string()))
    }

    /// Register a handler on a channel
    pub fn subscribe<F>(&self, channel_id: &ChannelId, handler: F) -> Result<Subscription>
    where
        F: Fn(&IpcMessage) + Send + Sync + 'static,
    {
        let subscriber_id = self.inner.next_subscriber.fetch_add(1, Ordering::Relaxed);
        let mut channels = self
            .inner
            .channels
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let entry = channels
            .get_mut(channel_id)
            .ok_or_else(|| DomainError::ChannelNotFound(channel_id.to_string()))?;
        entry.subscribers.push(Subscriber {
            id: subscriber_id,
            handler: Arc::new(handler),
        });

        Ok(Subscription {
            channel_id: *channel_id,
            subscriber_id,
            manager: Arc::downgrade(&self.inner),
        })
    }

    /// Subscribe through a bounded queue. Messages that do not fit are
    /// dropped; the sender is never blocked. The receiver yields `None` once
    /// the channel is destroyed or the subscription removed.
    pub fn subscribe_bounded(
        &self,
        channel_id: &ChannelId,
        capacity: usize,
    ) -> Result<(Subscription, mpsc::Receiver<IpcMessage>)> {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let channel = *channel_id;
        let subscription = self.subscribe(channel_id, move |message: &IpcMessage| {
            if let Err(mpsc::error::TrySendError::Full(dropped)) = tx.try_send(message.clone()) {
                warn!(
                    channel_id = %channel,
                    message_id = %dropped.id,
                    kind = %dropped.kind,
                    "Subscriber queue full, dropping message"
                );
            }
        })?;
        Ok((subscription, rx))
    }

    /// `subscribe_bounded` with the configured capacity
    pub fn subscribe_queue(
        &self,
        channel_id: &ChannelId,
    ) -> Result<(Subscription, mpsc::Receiver<IpcMessage>)> {
        self.subscribe_bounded(channel_id, self.inner.settings.subscriber_queue_capacity)
    }

    fn route(&self, from: &EndpointId, to: &EndpointId) -> Option<(ChannelId, Vec<MessageHandler>)> {
        let channels = self
            .inner
            .channels
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        channels
            .values()
            .filter(|e| e.channel.connects(from, to))
            .min_by_key(|e| (e.channel.created_at, e.channel.id))
            .map(|e| {
                (
                    e.channel.id,
                    e.subscribers.iter().map(|s| s.handler.clone()).collect(),
                )
            })
    }

    /// Route a message and deliver it to every subscriber of its channel.
    /// Returns the number of handlers invoked.
    pub fn send_message(&self, message: IpcMessage) -> Result<usize> {
        let (channel_id, handlers) =
            self.route(&message.from, &message.to)
                .ok_or_else(|| DomainError::NoChannel {
                    from: message.from.to_string(),
                    to: message.to.to_string(),
                })?;

        if let Some(correlation_id) = message.correlation_id {
            let waiter = self
                .inner
                .pending
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .remove(&correlation_id);
            if let Some(tx) = waiter {
                // Receiver may have timed out already
                let _ = tx.send(message.clone());
            }
        }

        // Handlers run outside the channel lock so they may send messages
        for handler in &handlers {
            handler(&message);
        }

        debug!(
            channel_id = %channel_id,
            message_id = %message.id,
            kind = %message.kind,
            from = %message.from,
            to = %message.to,
            delivered = handlers.len(),
            "Message routed"
        );

        Ok(handlers.len())
    }

    /// Send a message and wait for the correlated reply.
    /// Uses the configured request timeout when `timeout` is `None`.
    pub async fn request(
        &self,
        message: IpcMessage,
        timeout: Option<Duration>,
    ) -> Result<IpcMessage> {
        let timeout = timeout.unwrap_or(self.inner.settings.request_timeout);
        let message = message.requiring_response();
        let message_id = message.id;

        let (tx, rx) = oneshot::channel();
        self.pending_map().insert(message_id, tx);

        if let Err(e) = self.send_message(message) {
            self.pending_map().remove(&message_id);
            return Err(e);
        }

        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(_)) | Err(_) => {
                self.pending_map().remove(&message_id);
                info!(
                    message_id = %message_id,
                    timeout_ms = timeout.as_millis() as u64,
                    "Request timed out waiting for reply"
                );
                Err(DomainError::IpcTimeout {
                    message_id: message_id.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })
            }
        }
    }

    /// Answer a request, routing the reply back to its sender
    pub fn reply(
        &self,
        original: &IpcMessage,
        kind: MessageKind,
        payload: serde_json::Value,
    ) -> Result<usize> {
        self.send_message(original.reply(kind, payload))
    }

    pub fn pending_requests(&self) -> usize {
        self.pending_map().len()
    }

    fn pending_map(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<MessageId, oneshot::Sender<IpcMessage>>> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for IpcManager {
    fn default() -> Self {
        Self::new(IpcSettings::default())
    }
}
