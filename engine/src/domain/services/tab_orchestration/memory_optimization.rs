//! Memory optimization
//!
//! Escalating remediation against the total process footprint. Each phase is
//! gated on the utilization measured when the pass started and stops as soon
//! as the live utilization falls under its target. Per-tab failures are
//! recorded and never abort a phase.

use super::TabOrchestrationService;
use crate::domain::constants::{
    AGGRESSIVE_SUSPEND_TARGET, AGGRESSIVE_SUSPEND_TRIGGER, INACTIVE_TAB_IDLE_SEC,
    NON_ESSENTIAL_REDUCTION_FACTOR, OPTIMIZE_MIN_UTILIZATION, REDUCE_NON_ESSENTIAL_TARGET,
    REDUCE_NON_ESSENTIAL_TRIGGER, SUSPEND_INACTIVE_TARGET, SUSPEND_INACTIVE_TRIGGER,
};
use crate::domain::ports::{LifecycleEvent, SuspendReason};
use crate::domain::{format_bytes, ProcessId, ResourceAllocation, Result, Tab, TabId};
use chrono::Duration as ChronoDuration;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_OPTIMIZE_INTERVAL: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptimizationPhase {
    SuspendInactive,
    ReduceNonEssential,
    AggressiveSuspend,
}

impl OptimizationPhase {
    fn trigger(self) -> f64 {
        match self {
            OptimizationPhase::SuspendInactive => SUSPEND_INACTIVE_TRIGGER,
            OptimizationPhase::ReduceNonEssential => REDUCE_NON_ESSENTIAL_TRIGGER,
            OptimizationPhase::AggressiveSuspend => AGGRESSIVE_SUSPEND_TRIGGER,
        }
    }

    fn target(self) -> f64 {
        match self {
            OptimizationPhase::SuspendInactive => SUSPEND_INACTIVE_TARGET,
            OptimizationPhase::ReduceNonEssential => REDUCE_NON_ESSENTIAL_TARGET,
            OptimizationPhase::AggressiveSuspend => AGGRESSIVE_SUSPEND_TARGET,
        }
    }
}

impl fmt::Display for OptimizationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimizationPhase::SuspendInactive => write!(f, "suspend-inactive"),
            OptimizationPhase::ReduceNonEssential => write!(f, "reduce-non-essential"),
            OptimizationPhase::AggressiveSuspend => write!(f, "aggressive-suspend"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseReport {
    pub phase: OptimizationPhase,
    pub triggered: bool,
    /// Tabs suspended or reduced by this phase
    pub tabs_affected: Vec<TabId>,
    pub memory_reclaimed: u64,
    /// Tab and error message of every failed action
    pub failures: Vec<(TabId, String)>,
}

impl PhaseReport {
    fn new(phase: OptimizationPhase, triggered: bool) -> Self {
        Self {
            phase,
            triggered,
            tabs_affected: Vec::new(),
            memory_reclaimed: 0,
            failures: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MemoryOptimizationReport {
    pub memory_limit: u64,
    pub initial_usage: u64,
    pub final_usage: u64,
    pub initial_utilization: f64,
    pub final_utilization: f64,
    /// Empty when utilization was under the optimization floor
    pub phases: Vec<PhaseReport>,
}

impl MemoryOptimizationReport {
    pub fn phase(&self, phase: OptimizationPhase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    pub fn triggered(&self, phase: OptimizationPhase) -> bool {
        self.phase(phase).is_some_and(|p| p.triggered)
    }

    pub fn tabs_suspended(&self) -> usize {
        self.phases
            .iter()
            .filter(|p| p.phase != OptimizationPhase::ReduceNonEssential)
            .map(|p| p.tabs_affected.len())
            .sum()
    }

    pub fn tabs_reduced(&self) -> usize {
        self.phase(OptimizationPhase::ReduceNonEssential)
            .map_or(0, |p| p.tabs_affected.len())
    }

    pub fn memory_reclaimed(&self) -> u64 {
        self.phases.iter().map(|p| p.memory_reclaimed).sum()
    }
}

/// Running usage tally for one pass
struct Budget {
    limit: u64,
    usage: u64,
}

impl Budget {
    fn utilization(&self) -> f64 {
        self.usage as f64 / self.limit as f64
    }

    fn reclaim(&mut self, bytes: u64) {
        self.usage = self.usage.saturating_sub(bytes);
    }
}

impl TabOrchestrationService {
    /// Run one optimization pass and publish its outcome
    pub async fn optimize_memory(&self) -> Result<MemoryOptimizationReport> {
        self.sync_tab_memory().await?;

        let initial_usage = self.processes.total_memory_usage().await?;
        let mut budget = Budget {
            limit: self.memory_limit,
            usage: initial_usage,
        };
        let initial_utilization = budget.utilization();

        let mut report = MemoryOptimizationReport {
            memory_limit: self.memory_limit,
            initial_usage,
            final_usage: initial_usage,
            initial_utilization,
            final_utilization: initial_utilization,
            phases: Vec::new(),
        };

        if initial_utilization < OPTIMIZE_MIN_UTILIZATION {
            debug!(
                utilization = initial_utilization,
                usage = %format_bytes(initial_usage),
                "Memory below optimization floor"
            );
            return Ok(report);
        }

        info!(
            utilization = initial_utilization,
            usage = %format_bytes(initial_usage),
            limit = %format_bytes(self.memory_limit),
            "Memory optimization started"
        );

        for phase in [
            OptimizationPhase::SuspendInactive,
            OptimizationPhase::ReduceNonEssential,
            OptimizationPhase::AggressiveSuspend,
        ] {
            let triggered = initial_utilization > phase.trigger();
            let mut phase_report = PhaseReport::new(phase, triggered);
            if triggered {
                self.run_phase(&mut phase_report, &mut budget).await?;
                info!(
                    phase = %phase,
                    affected = phase_report.tabs_affected.len(),
                    reclaimed = %format_bytes(phase_report.memory_reclaimed),
                    failures = phase_report.failures.len(),
                    "Optimization phase finished"
                );
            }
            report.phases.push(phase_report);
        }

        report.final_usage = self.processes.total_memory_usage().await?;
        report.final_utilization = report.final_usage as f64 / self.memory_limit as f64;

        info!(
            initial_utilization = report.initial_utilization,
            final_utilization = report.final_utilization,
            tabs_suspended = report.tabs_suspended(),
            tabs_reduced = report.tabs_reduced(),
            "Memory optimization finished"
        );
        self.events.publish(LifecycleEvent::MemoryOptimized {
            initial_utilization: report.initial_utilization,
            final_utilization: report.final_utilization,
            tabs_suspended: report.tabs_suspended(),
            tabs_reduced: report.tabs_reduced(),
            memory_reclaimed: report.memory_reclaimed(),
        });
        Ok(report)
    }

    async fn run_phase(&self, report: &mut PhaseReport, budget: &mut Budget) -> Result<()> {
        let phase = report.phase;
        for (tab_id, process_id, before) in self.phase_candidates(phase)? {
            if budget.utilization() < phase.target() {
                break;
            }

            let outcome = match phase {
                OptimizationPhase::ReduceNonEssential => {
                    self.reduce_tab(&tab_id, process_id, before).await
                }
                _ => self.evict_tab(&tab_id, process_id, before).await,
            };

            match outcome {
                Ok(Some(reclaimed)) => {
                    budget.reclaim(reclaimed);
                    report.memory_reclaimed += reclaimed;
                    report.tabs_affected.push(tab_id);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(phase = %phase, tab_id = %tab_id, error = %e, "Optimization action failed");
                    report.failures.push((tab_id, e.to_string()));
                }
            }
        }
        Ok(())
    }

    /// Unpinned live tabs eligible for a phase, least recently active first
    fn phase_candidates(&self, phase: OptimizationPhase) -> Result<Vec<(TabId, ProcessId, u64)>> {
        let now = self.clock.now();
        let idle_floor = ChronoDuration::seconds(INACTIVE_TAB_IDLE_SEC);

        let tables = self.read()?;
        let mut candidates: Vec<&Tab> = tables
            .tabs
            .values()
            .filter(|tab| !tab.is_suspended() && !tables.pinned.contains(&tab.id()))
            .filter(|tab| match phase {
                OptimizationPhase::SuspendInactive => tab.idle_duration(now) > idle_floor,
                OptimizationPhase::ReduceNonEssential => !tab.ai_metadata().has_topics(),
                OptimizationPhase::AggressiveSuspend => true,
            })
            .collect();
        candidates.sort_by_key(|tab| (tab.last_active(), tab.id()));

        Ok(candidates
            .into_iter()
            .map(|tab| (tab.id(), tab.process_id(), tab.memory_usage()))
            .collect())
    }

    async fn evict_tab(&self, id: &TabId, process_id: ProcessId, before: u64) -> Result<Option<u64>> {
        if !self
            .suspend_tab_with_reason(id, SuspendReason::MemoryPressure)
            .await?
        {
            return Ok(None);
        }
        let after = self.processes.get_process_info(&process_id).await?.memory_usage();
        Ok(Some(before.saturating_sub(after)))
    }

    /// Shrink a tab's process budget to a fraction of its current footprint,
    /// never below the minimal budget
    async fn reduce_tab(&self, id: &TabId, process_id: ProcessId, before: u64) -> Result<Option<u64>> {
        let _guard = self.tab_locks.lock(id).await;
        if self.read()?.tab(id)?.is_suspended() {
            return Ok(None);
        }

        let settings = self.processes.settings();
        let minimal = settings.minimal_budget;
        let record = self.processes.get_process_info(&process_id).await?;
        let current_cpu = record
            .allocation()
            .map_or(settings.normal_budget.cpu_quota, |a| a.cpu_quota);
        let network_priority = record
            .allocation()
            .map_or(settings.normal_budget.network_priority, |a| a.network_priority);

        let reduced_memory = (before as f64 * NON_ESSENTIAL_REDUCTION_FACTOR).round() as u64;
        let allocation = ResourceAllocation {
            process_id,
            memory_limit: reduced_memory.max(minimal.memory_bytes),
            cpu_quota: (current_cpu * NON_ESSENTIAL_REDUCTION_FACTOR).max(minimal.cpu_quota),
            network_priority,
            gpu_memory: None,
        };

        let updated = self.processes.allocate_resources(allocation).await?;
        let after = updated.memory_usage();
        {
            let mut tables = self.write()?;
            tables.tab_mut(id)?.set_memory_usage(after);
        }
        debug!(tab_id = %id, process_id = %process_id, allocation = ?updated.allocation(), "Tab budget reduced");
        Ok(Some(before.saturating_sub(after)))
    }

    pub async fn run_memory_optimizer(
        &self,
        interval: Duration,
        cancellation_token: CancellationToken,
    ) {
        info!(
            interval_ms = interval.as_millis() as u64,
            limit = %format_bytes(self.memory_limit),
            "Memory optimizer started"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("Memory optimizer received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.optimize_memory().await {
                        error!(error = %e, "Memory optimization failed");
                    }
                }
            }
        }

        info!("Memory optimizer stopped");
    }
}
