//! EventPublisher port
//! Fire-and-forget lifecycle notifications for UI/AI consumers

use crate::domain::{
    GroupId, HealthState, ProcessId, ProcessType, SpaceId, StrategyKind, TabId,
};
use serde::{Deserialize, Serialize};

/// Why a tab was suspended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SuspendReason {
    Manual,
    Strategy(StrategyKind),
    MemoryPressure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum LifecycleEvent {
    TabCreated {
        tab_id: TabId,
        process_id: ProcessId,
        space_id: SpaceId,
    },
    TabDestroyed {
        tab_id: TabId,
        process_id: ProcessId,
    },
    TabMoved {
        tab_id: TabId,
        from_group: Option<GroupId>,
        to_group: Option<GroupId>,
    },
    TabSuspended {
        tab_id: TabId,
        reason: SuspendReason,
    },
    TabRestored {
        tab_id: TabId,
    },
    TabPinned {
        tab_id: TabId,
    },
    TabUnpinned {
        tab_id: TabId,
    },
    ProcessCreated {
        process_id: ProcessId,
        process_type: ProcessType,
    },
    ProcessDestroyed {
        process_id: ProcessId,
    },
    ProcessHealthChanged {
        process_id: ProcessId,
        from: HealthState,
        to: HealthState,
    },
    ProcessSuspended {
        process_id: ProcessId,
    },
    ProcessResumed {
        process_id: ProcessId,
    },
    MemoryOptimized {
        initial_utilization: f64,
        final_utilization: f64,
        tabs_suspended: usize,
        tabs_reduced: usize,
        memory_reclaimed: u64,
    },
    SpaceImported {
        space_id: SpaceId,
        tab_count: usize,
    },
}

impl LifecycleEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleEvent::TabCreated { .. } => "tab-created",
            LifecycleEvent::TabDestroyed { .. } => "tab-destroyed",
            LifecycleEvent::TabMoved { .. } => "tab-moved",
            LifecycleEvent::TabSuspended { .. } => "tab-suspended",
            LifecycleEvent::TabRestored { .. } => "tab-restored",
            LifecycleEvent::TabPinned { .. } => "tab-pinned",
            LifecycleEvent::TabUnpinned { .. } => "tab-unpinned",
            LifecycleEvent::ProcessCreated { .. } => "process-created",
            LifecycleEvent::ProcessDestroyed { .. } => "process-destroyed",
            LifecycleEvent::ProcessHealthChanged { .. } => "process-health-changed",
            LifecycleEvent::ProcessSuspended { .. } => "process-suspended",
            LifecycleEvent::ProcessResumed { .. } => "process-resumed",
            LifecycleEvent::MemoryOptimized { .. } => "memory-optimized",
            LifecycleEvent::SpaceImported { .. } => "space-imported",
        }
    }
}

/// Port for publishing lifecycle events. Publishing never fails the caller.
pub trait EventPublisher: Send + Sync {
    fn publish(&self, event: LifecycleEvent);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_its_name() {
        let event = LifecycleEvent::TabRestored {
            tab_id: TabId::generate(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], event.name());
    }
}
