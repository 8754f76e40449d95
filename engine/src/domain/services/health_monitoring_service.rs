//! Health monitoring service
//! Periodically samples every process and drives its health state machine
//!
//! Rules per sample, in order: no metrics => Dead, cpu above ceiling =>
//! Critical, memory above ceiling => Degraded, otherwise a Healthy candidate.
//! Escalations are applied at once and followed by a remediation pass; a
//! process only goes back to Healthy after that pass.

use crate::domain::ports::{Clock, EventPublisher, LifecycleEvent, ProcessRepository, ProcessSubstrate};
use crate::domain::services::ProcessManagementService;
use crate::domain::{HealthState, HealthThresholds, ProcessId, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Outcome of one health pass over all processes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthReport {
    pub checked: usize,
    pub transitions: Vec<(ProcessId, HealthState, HealthState)>,
    pub remediated: usize,
}

pub struct HealthMonitoringService {
    repository: Arc<dyn ProcessRepository>,
    substrate: Arc<dyn ProcessSubstrate>,
    processes: Arc<ProcessManagementService>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    thresholds: HealthThresholds,
}

impl HealthMonitoringService {
    pub fn new(
        repository: Arc<dyn ProcessRepository>,
        substrate: Arc<dyn ProcessSubstrate>,
        processes: Arc<ProcessManagementService>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        thresholds: HealthThresholds,
    ) -> Self {
        Self {
            repository,
            substrate,
            processes,
            events,
            clock,
            thresholds,
        }
    }

    /// Run health passes every `interval` until cancelled
    pub async fn run(&self, interval: Duration, cancellation_token: CancellationToken) {
        info!(interval_ms = interval.as_millis() as u64, "Health monitor started");

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancellation_token.cancelled() => {
                    info!("Health monitor received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.check_all().await {
                        error!(error = %e, "Health pass failed");
                    }
                }
            }
        }

        info!("Health monitor stopped");
    }

    /// Sample every process once
    pub async fn check_all(&self) -> Result<HealthReport> {
        let mut report = HealthReport::default();

        for process in self.repository.find_all().await? {
            let id = process.id();
            match self.check_process(&id).await {
                Ok(Some(outcome)) => {
                    report.checked += 1;
                    if let Some((from, to)) = outcome.transition {
                        report.transitions.push((id, from, to));
                    }
                    if outcome.remediated {
                        report.remediated += 1;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    error!(process_id = %id, error = %e, "Health check failed");
                }
            }
        }

        debug!(
            checked = report.checked,
            transitions = report.transitions.len(),
            remediated = report.remediated,
            "Health pass complete"
        );
        Ok(report)
    }

    /// Sample one process. `None` if it is gone or already Dead.
    async fn check_process(&self, id: &ProcessId) -> Result<Option<CheckOutcome>> {
        let _guard = self.processes.lock_process(id).await;

        let mut record = match self.repository.find_by_id(id).await? {
            Some(record) => record,
            None => {
                debug!(process_id = %id, "Process no longer exists, skipping health check");
                return Ok(None);
            }
        };
        if record.health().is_dead() {
            return Ok(None);
        }

        let metrics = match self.substrate.sample_metrics(*id).await {
            Ok(metrics) => metrics,
            Err(e) => {
                warn!(process_id = %id, error = %e, "Sampling failed, treating metrics as unavailable");
                None
            }
        };
        if let Some(metrics) = &metrics {
            record.record_metrics(metrics, self.clock.now());
        }

        let observed = self.thresholds.classify(metrics.as_ref());
        let transition = record.observe_health(observed);

        if let Some((from, to)) = transition {
            if to == HealthState::Healthy {
                info!(process_id = %id, from = %from, to = %to, "Process recovered");
            } else {
                warn!(
                    process_id = %id,
                    from = %from,
                    to = %to,
                    memory_bytes = record.memory_usage(),
                    cpu_percent = record.cpu_usage(),
                    "Process health escalated"
                );
            }
            self.events.publish(LifecycleEvent::ProcessHealthChanged {
                process_id: *id,
                from,
                to,
            });
        }

        let mut remediated = false;
        if record.needs_remediation() {
            match self.processes.remediate_locked(&mut record) {
                Ok(()) => remediated = true,
                Err(e) => {
                    warn!(process_id = %id, error = %e, "Remediation pass failed");
                }
            }
        }

        self.repository.save(record).await?;
        Ok(Some(CheckOutcome {
            transition,
            remediated,
        }))
    }
}

struct CheckOutcome {
    transition: Option<(HealthState, HealthState)>,
    remediated: bool,
}
