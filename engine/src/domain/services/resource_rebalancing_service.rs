//! Resource rebalancing service
//! Suspends idle processes that still hold a large footprint

use crate::domain::constants::DEFAULT_IDLE_MEMORY_THRESHOLD_BYTES;
use crate::domain::ports::ProcessRepository;
use crate::domain::services::ProcessManagementService;
use crate::domain::{ProcessId, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_REBALANCE_INTERVAL: Duration = Duration::from_secs(30);

pub struct ResourceRebalancingService {
    repository: Arc<dyn ProcessRepository>,
    processes: Arc<ProcessManagementService>,
    idle_memory_threshold: u64,
}

impl ResourceRebalancingService {
    pub fn new(
        repository: Arc<dyn ProcessRepository>,
        processes: Arc<ProcessManagementService>,
        idle_memory_threshold: u64,
    ) -> Self {
        Self {
            repository,
            processes,
            idle_memory_threshold,
        }
    }

    pub fn with_default_threshold(
        repository: Arc<dyn ProcessRepository>,
        processes: Arc<ProcessManagementService>,
    ) -> Self {
        Self::new(repository, processes, DEFAULT_IDLE_MEMORY_THRESHOLD_BYTES)
    }

    pub async fn run(&self, interval: Duration, cancellation_token: CancellationToken) {
        info!(interval_ms = interval.as_millis() as u64, "Resource rebalancer started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("Resource rebalancer received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.rebalance_once().await {
                        error!(error = %e, "Rebalance pass failed");
                    }
                }
            }
        }

        info!("Resource rebalancer stopped");
    }

    /// Suspend every process with no tabs, not yet suspended, whose footprint
    /// is above the idle threshold. Returns the suspended ids.
    pub async fn rebalance_once(&self) -> Result<Vec<ProcessId>> {
        let candidates: Vec<ProcessId> = self
            .repository
            .find_all()
            .await?
            .into_iter()
            .filter(|p| {
                !p.owns_tabs()
                    && !p.is_suspended()
                    && !p.health().is_dead()
                    && p.memory_usage() > self.idle_memory_threshold
            })
            .map(|p| p.id())
            .collect();

        let mut suspended = Vec::with_capacity(candidates.len());
        for id in candidates {
            match self.processes.suspend_process(&id).await {
                Ok(true) => {
                    info!(process_id = %id, "Suspended idle process");
                    suspended.push(id);
                }
                Ok(false) => {}
                Err(e) if e.is_not_found() => {
                    debug!(process_id = %id, "Process vanished before rebalancing");
                }
                Err(e) => {
                    warn!(process_id = %id, error = %e, "Failed to suspend idle process");
                }
            }
        }

        Ok(suspended)
    }
}
