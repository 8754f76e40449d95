//! ProcessRecord entity
//! Bookkeeping for one worker process owned by the orchestrator

use crate::domain::{
    ChannelId, HealthState, ProcessId, ProcessMetrics, ProcessType, ResourceAllocation, TabId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessRecord {
    // Identity
    id: ProcessId,
    process_type: ProcessType,
    os_pid: Option<u32>,

    // Sampled usage
    memory_usage: u64,
    cpu_usage: f64,

    // Ownership
    owned_tab_ids: Vec<TabId>, // insertion-ordered, no duplicates
    control_channel_id: ChannelId,

    // Budget
    allocation: Option<ResourceAllocation>,
    suspended: bool,

    // Health (mutated only by the health monitor)
    health: HealthState,
    remediated_since_escalation: bool,
    remediation_count: u32,

    // Timestamps
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
    last_sampled: Option<DateTime<Utc>>,
}

impl ProcessRecord {
    pub fn new(
        id: ProcessId,
        process_type: ProcessType,
        control_channel_id: ChannelId,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            process_type,
            os_pid: None,
            memory_usage: 0,
            cpu_usage: 0.0,
            owned_tab_ids: Vec::new(),
            control_channel_id,
            allocation: None,
            suspended: false,
            health: HealthState::Healthy,
            remediated_since_escalation: false,
            remediation_count: 0,
            created_at: now,
            last_active: now,
            last_sampled: None,
        }
    }

    // ===== Getters =====

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn process_type(&self) -> ProcessType {
        self.process_type
    }

    pub fn os_pid(&self) -> Option<u32> {
        self.os_pid
    }

    pub fn memory_usage(&self) -> u64 {
        self.memory_usage
    }

    pub fn cpu_usage(&self) -> f64 {
        self.cpu_usage
    }

    pub fn owned_tab_ids(&self) -> &[TabId] {
        &self.owned_tab_ids
    }

    pub fn owns_tabs(&self) -> bool {
        !self.owned_tab_ids.is_empty()
    }

    pub fn control_channel_id(&self) -> ChannelId {
        self.control_channel_id
    }

    pub fn allocation(&self) -> Option<&ResourceAllocation> {
        self.allocation.as_ref()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn health(&self) -> HealthState {
        self.health
    }

    pub fn remediation_count(&self) -> u32 {
        self.remediation_count
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    pub fn last_sampled(&self) -> Option<DateTime<Utc>> {
        self.last_sampled
    }

    // ===== Mutations =====

    pub fn set_os_pid(&mut self, pid: Option<u32>) {
        self.os_pid = pid;
    }

    pub fn attach_tab(&mut self, tab_id: TabId) {
        if !self.owned_tab_ids.contains(&tab_id) {
            self.owned_tab_ids.push(tab_id);
        }
    }

    /// Returns true if the tab was owned
    pub fn detach_tab(&mut self, tab_id: &TabId) -> bool {
        let before = self.owned_tab_ids.len();
        self.owned_tab_ids.retain(|t| t != tab_id);
        before != self.owned_tab_ids.len()
    }

    pub fn record_metrics(&mut self, metrics: &ProcessMetrics, now: DateTime<Utc>) {
        self.memory_usage = metrics.memory_bytes;
        self.cpu_usage = metrics.cpu_percent;
        self.last_sampled = Some(now);
    }

    /// Overwrite the recorded memory footprint (used by simulations and
    /// projections between samples)
    pub fn set_memory_usage(&mut self, bytes: u64) {
        self.memory_usage = bytes;
    }

    /// Record a new budget. The recorded footprint is projected down to the
    /// limit until the next sample says otherwise.
    pub fn apply_allocation(&mut self, allocation: ResourceAllocation, now: DateTime<Utc>) {
        self.memory_usage = self.memory_usage.min(allocation.memory_limit);
        self.cpu_usage = self.cpu_usage.min(allocation.cpu_quota);
        self.allocation = Some(allocation);
        self.last_active = now;
    }

    pub fn set_suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
    }

    /// Feed a classified sample into the health state machine.
    /// Returns `(from, to)` only when the state actually changed.
    pub fn observe_health(&mut self, observed: HealthState) -> Option<(HealthState, HealthState)> {
        let next = self.health.next(observed, self.remediated_since_escalation);
        if next == self.health {
            return None;
        }
        let from = self.health;
        self.health = next;
        self.remediated_since_escalation = false;
        Some((from, next))
    }

    pub fn mark_remediated(&mut self) {
        self.remediated_since_escalation = true;
        self.remediation_count += 1;
    }

    pub fn needs_remediation(&self) -> bool {
        matches!(self.health, HealthState::Degraded | HealthState::Critical)
            && !self.remediated_since_escalation
    }
}
