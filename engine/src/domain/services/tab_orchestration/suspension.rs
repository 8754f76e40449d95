//! Tab suspension and restoration
//!
//! A suspended tab keeps its record; its process drops to the minimal budget
//! and its resumable state lives in the snapshot store. Each step that can
//! fail is undone so a tab is never left half suspended.

use super::TabOrchestrationService;
use crate::domain::ports::{LifecycleEvent, SuspendReason, TabSnapshot};
use crate::domain::{Result, TabId};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_SUSPENSION_INTERVAL: Duration = Duration::from_secs(60);

impl TabOrchestrationService {
    /// Suspend a tab on request. Returns false if it already was.
    pub async fn suspend_tab(&self, id: &TabId) -> Result<bool> {
        self.suspend_tab_with_reason(id, SuspendReason::Manual)
            .await
    }

    pub(super) async fn suspend_tab_with_reason(
        &self,
        id: &TabId,
        reason: SuspendReason,
    ) -> Result<bool> {
        let _guard = self.tab_locks.lock(id).await;

        let (process_id, snapshot) = {
            let tables = self.read()?;
            let tab = tables.tab(id)?;
            if tab.is_suspended() {
                return Ok(false);
            }
            let snapshot = TabSnapshot {
                url: tab.url().to_string(),
                title: tab.title().to_string(),
                page_state: tab.page_state().clone(),
                captured_at: self.clock.now(),
            };
            (tab.process_id(), snapshot)
        };

        self.snapshots.save(*id, snapshot).await?;

        if let Err(e) = self.processes.suspend_process(&process_id).await {
            warn!(tab_id = %id, process_id = %process_id, error = %e, "Process suspend failed, dropping snapshot");
            self.discard_snapshot(id).await;
            return Err(e);
        }

        let memory = self
            .processes
            .get_process_info(&process_id)
            .await
            .map(|p| p.memory_usage())
            .ok();

        let marked = self.write().and_then(|mut tables| {
            let tab = tables.tab_mut(id)?;
            tab.mark_suspended();
            if let Some(bytes) = memory {
                tab.set_memory_usage(bytes);
            }
            Ok(())
        });
        if let Err(e) = marked {
            warn!(tab_id = %id, error = %e, "Could not mark tab suspended, resuming its process");
            if let Err(resume) = self.processes.resume_process(&process_id).await {
                warn!(process_id = %process_id, error = %resume, "Resume during rollback failed");
            }
            self.discard_snapshot(id).await;
            return Err(e);
        }

        info!(tab_id = %id, process_id = %process_id, reason = ?reason, "Tab suspended");
        self.events.publish(LifecycleEvent::TabSuspended {
            tab_id: *id,
            reason,
        });
        Ok(true)
    }

    /// Restore a suspended tab from its snapshot. Returns false if it was not
    /// suspended. On failure the tab stays suspended and keeps its snapshot.
    pub async fn restore_tab(&self, id: &TabId) -> Result<bool> {
        let _guard = self.tab_locks.lock(id).await;

        let process_id = {
            let tables = self.read()?;
            let tab = tables.tab(id)?;
            if !tab.is_suspended() {
                return Ok(false);
            }
            tab.process_id()
        };

        let snapshot = self.snapshots.load(*id).await?;

        if !self.processes.resume_process(&process_id).await? {
            // Not marked suspended on the process side; still re-assert the budget
            let budget = self.processes.settings().normal_budget;
            self.processes
                .allocate_resources(budget.for_process(process_id))
                .await?;
        }

        let now = self.clock.now();
        {
            let mut tables = self.write()?;
            tables
                .tab_mut(id)?
                .mark_restored(snapshot.url, snapshot.title, snapshot.page_state, now);
        }
        self.discard_snapshot(id).await;

        info!(tab_id = %id, process_id = %process_id, "Tab restored");
        self.events
            .publish(LifecycleEvent::TabRestored { tab_id: *id });
        Ok(true)
    }

    async fn discard_snapshot(&self, id: &TabId) {
        if let Err(e) = self.snapshots.delete(*id).await {
            warn!(tab_id = %id, error = %e, "Failed to drop tab snapshot");
        }
    }

    /// Apply the suspension strategy once. Only live, unpinned tabs of spaces
    /// with auto-suspend enabled are considered. Returns the suspended tabs.
    pub async fn run_suspension_cycle(&self) -> Result<Vec<TabId>> {
        self.sync_tab_memory().await?;

        let now = self.clock.now();
        let selected = {
            let tables = self.read()?;
            let candidates: Vec<_> = tables
                .tabs
                .values()
                .filter(|tab| {
                    !tab.is_suspended()
                        && !tables.pinned.contains(&tab.id())
                        && tables
                            .spaces
                            .get(&tab.space_id())
                            .is_some_and(|s| s.settings().auto_suspend)
                })
                .collect();
            self.policy.select(&candidates, now)
        };

        let reason = SuspendReason::Strategy(self.policy.kind());
        let mut suspended = Vec::with_capacity(selected.len());
        for id in selected {
            match self.suspend_tab_with_reason(&id, reason).await {
                Ok(true) => suspended.push(id),
                Ok(false) => {}
                Err(e) if e.is_not_found() => {
                    debug!(tab_id = %id, "Tab vanished before suspension");
                }
                Err(e) => {
                    warn!(tab_id = %id, error = %e, "Failed to suspend tab");
                }
            }
        }

        if !suspended.is_empty() {
            info!(
                strategy = %self.policy.kind(),
                suspended = suspended.len(),
                "Suspension cycle completed"
            );
        }
        Ok(suspended)
    }

    pub async fn run_suspension_monitor(
        &self,
        interval: Duration,
        cancellation_token: CancellationToken,
    ) {
        info!(
            interval_ms = interval.as_millis() as u64,
            strategy = %self.policy.kind(),
            "Suspension monitor started"
        );

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("Suspension monitor received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.run_suspension_cycle().await {
                        error!(error = %e, "Suspension cycle failed");
                    }
                }
            }
        }

        info!("Suspension monitor stopped");
    }
}
