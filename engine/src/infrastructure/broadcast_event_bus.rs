//! Broadcast event bus
//! EventPublisher adapter backed by a tokio broadcast channel

use crate::domain::ports::{EventPublisher, LifecycleEvent};
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::debug;

pub const DEFAULT_EVENT_BUS_CAPACITY: usize = 1024;

/// Publishes lifecycle events to any number of subscribers. Slow subscribers
/// lag and lose the oldest events; publishing never blocks. The most recent
/// events are retained for inspection.
pub struct BroadcastEventBus {
    sender: broadcast::Sender<LifecycleEvent>,
    recent: Mutex<VecDeque<LifecycleEvent>>,
    retain: usize,
}

impl BroadcastEventBus {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            recent: Mutex::new(VecDeque::with_capacity(capacity)),
            retain: capacity,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.sender.subscribe()
    }

    /// Retained events, oldest first
    pub fn recent(&self) -> Vec<LifecycleEvent> {
        self.recent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Retained events with the given wire name
    pub fn recent_named(&self, name: &str) -> Vec<LifecycleEvent> {
        self.recent()
            .into_iter()
            .filter(|e| e.name() == name)
            .collect()
    }
}

impl Default for BroadcastEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUS_CAPACITY)
    }
}

impl EventPublisher for BroadcastEventBus {
    fn publish(&self, event: LifecycleEvent) {
        debug!(event = event.name(), "Publishing lifecycle event");

        {
            let mut recent = self.recent.lock().unwrap_or_else(PoisonError::into_inner);
            if recent.len() == self.retain {
                recent.pop_front();
            }
            recent.push_back(event.clone());
        }

        // No receivers is not an error for a fire-and-forget bus
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TabId;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = BroadcastEventBus::default();
        let mut rx = bus.subscribe();
        let tab_id = TabId::generate();

        bus.publish(LifecycleEvent::TabPinned { tab_id });

        assert_eq!(rx.recv().await.unwrap(), LifecycleEvent::TabPinned { tab_id });
        assert_eq!(bus.recent_named("tab-pinned").len(), 1);
    }

    #[test]
    fn test_publish_without_subscribers_and_retention() {
        let bus = BroadcastEventBus::new(2);
        for _ in 0..3 {
            bus.publish(LifecycleEvent::TabRestored {
                tab_id: TabId::generate(),
            });
        }
        assert_eq!(bus.recent().len(), 2);
    }
}
