//! Process Management Service
//! Creates, budgets, suspends and destroys worker processes
//!
//! Every process gets exactly one control channel between `main` and its own
//! endpoint. All budget changes travel over that channel as
//! `resource-allocation` messages and are then recorded on the process.
//! Mutations of one process are serialized through an entity lock.

use crate::domain::ports::{Clock, EventPublisher, LifecycleEvent, ProcessRepository, ProcessSubstrate};
use crate::domain::services::entity_locks::{EntityGuard, EntityLocks};
use crate::domain::services::ipc_manager::IpcManager;
use crate::domain::{
    ChannelId, ChannelType, CreateProcessCommand, CreateProcessResponse, DomainError, EndpointId,
    IpcMessage, MessageKind, ProcessId, ProcessRecord, ResourceAllocation, ResourceBudget, Result,
    TabId,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_SPAWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProcessManagerSettings {
    /// Budget of a live tab's process
    pub normal_budget: ResourceBudget,
    /// Budget of a suspended process
    pub minimal_budget: ResourceBudget,
    pub spawn_timeout: Duration,
}

impl Default for ProcessManagerSettings {
    fn default() -> Self {
        Self {
            normal_budget: ResourceBudget::normal(),
            minimal_budget: ResourceBudget::minimal(),
            spawn_timeout: DEFAULT_SPAWN_TIMEOUT,
        }
    }
}

pub struct ProcessManagementService {
    repository: Arc<dyn ProcessRepository>,
    substrate: Arc<dyn ProcessSubstrate>,
    ipc: IpcManager,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    locks: EntityLocks<ProcessId>,
    settings: ProcessManagerSettings,
}

impl ProcessManagementService {
    pub fn new(
        repository: Arc<dyn ProcessRepository>,
        substrate: Arc<dyn ProcessSubstrate>,
        ipc: IpcManager,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        settings: ProcessManagerSettings,
    ) -> Self {
        Self {
            repository,
            substrate,
            ipc,
            events,
            clock,
            locks: EntityLocks::new(),
            settings,
        }
    }

    pub fn settings(&self) -> &ProcessManagerSettings {
        &self.settings
    }

    pub fn ipc(&self) -> &IpcManager {
        &self.ipc
    }

    /// Spawn a worker, open its control channel and register it.
    /// Leaves nothing behind on failure.
    pub async fn create_process(
        &self,
        command: CreateProcessCommand,
    ) -> Result<CreateProcessResponse> {
        let id = ProcessId::generate();
        let process_type = command.process_type;

        debug!(process_id = %id, process_type = %process_type, "Spawning process");

        let spawned = tokio::time::timeout(
            self.settings.spawn_timeout,
            self.substrate.spawn(id, process_type, command.spawn.clone()),
        )
        .await;

        let handle = match spawned {
            Ok(Ok(handle)) => handle,
            Ok(Err(e)) => {
                warn!(process_id = %id, process_type = %process_type, error = %e, "Spawn failed");
                return Err(match e {
                    DomainError::SpawnFailed(_) => e,
                    other => DomainError::SpawnFailed(other.to_string()),
                });
            }
            Err(_) => {
                let timeout_ms = self.settings.spawn_timeout.as_millis() as u64;
                warn!(process_id = %id, timeout_ms, "Spawn timed out");
                // The substrate may have finished half of the work
                let _ = self.substrate.terminate(id).await;
                return Err(DomainError::SpawnFailed(format!(
                    "spawn of {} process timed out after {}ms",
                    process_type, timeout_ms
                )));
            }
        };

        let channel = self.ipc.create_channel(
            format!("control-{}", id),
            ChannelType::Control,
            [EndpointId::main(), EndpointId::from(id)],
        );

        let mut record = ProcessRecord::new(id, process_type, channel.id, self.clock.now());
        record.set_os_pid(handle.os_pid);
        if let Some(tab_id) = command.owner_tab {
            record.attach_tab(tab_id);
        }

        if let Err(e) = self.repository.save(record).await {
            self.rollback_create(id, channel.id).await;
            return Err(e);
        }

        if let Some(budget) = command.initial_budget {
            if let Err(e) = self.apply_allocation(budget.for_process(id)).await {
                self.rollback_create(id, channel.id).await;
                return Err(e);
            }
        }
        self.record_initial_sample(id).await;

        info!(
            process_id = %id,
            process_type = %process_type,
            os_pid = ?handle.os_pid,
            owner_tab = ?command.owner_tab,
            "Process created"
        );
        self.events.publish(LifecycleEvent::ProcessCreated {
            process_id: id,
            process_type,
        });

        Ok(CreateProcessResponse { id, process_type })
    }

    /// Seed the recorded footprint so totals are meaningful before the first
    /// health pass. Sampling failures are not fatal here.
    async fn record_initial_sample(&self, id: ProcessId) {
        let metrics = match self.substrate.sample_metrics(id).await {
            Ok(Some(metrics)) => metrics,
            Ok(None) => return,
            Err(e) => {
                debug!(process_id = %id, error = %e, "Initial sample unavailable");
                return;
            }
        };
        match self.repository.get(&id).await {
            Ok(mut record) => {
                record.record_metrics(&metrics, self.clock.now());
                if let Err(e) = self.repository.save(record).await {
                    warn!(process_id = %id, error = %e, "Failed to record initial sample");
                }
            }
            Err(e) => warn!(process_id = %id, error = %e, "Failed to record initial sample"),
        }
    }

    async fn rollback_create(&self, id: ProcessId, channel_id: ChannelId) {
        warn!(process_id = %id, "Rolling back process creation");
        if let Err(e) = self.substrate.terminate(id).await {
            warn!(process_id = %id, error = %e, "Terminate during rollback failed");
        }
        let _ = self.ipc.destroy_channel(&channel_id);
        if let Err(e) = self.repository.delete(&id).await {
            warn!(process_id = %id, error = %e, "Record cleanup during rollback failed");
        }
    }

    /// Terminate a worker and drop its channel and record.
    /// Terminate failures are logged; cleanup always completes.
    pub async fn destroy_process(&self, id: &ProcessId) -> Result<()> {
        let guard = self.locks.lock(id).await;
        let result = self.destroy_locked(id).await;
        drop(guard);
        self.locks.forget(id);
        result
    }

    async fn destroy_locked(&self, id: &ProcessId) -> Result<()> {
        let record = self.repository.get(id).await?;

        if let Err(e) = self.substrate.terminate(*id).await {
            warn!(process_id = %id, error = %e, "Terminate failed, continuing cleanup");
        }
        if let Err(e) = self.ipc.destroy_channel(&record.control_channel_id()) {
            debug!(process_id = %id, error = %e, "Control channel already gone");
        }
        self.repository.delete(id).await?;

        info!(
            process_id = %id,
            process_type = %record.process_type(),
            "Process destroyed"
        );
        self.events
            .publish(LifecycleEvent::ProcessDestroyed { process_id: *id });
        Ok(())
    }

    /// Send a budget to the worker and record it. Does not wait for an
    /// acknowledgement.
    pub async fn allocate_resources(&self, allocation: ResourceAllocation) -> Result<ProcessRecord> {
        let _guard = self.locks.lock(&allocation.process_id).await;
        self.apply_allocation(allocation).await
    }

    async fn apply_allocation(&self, allocation: ResourceAllocation) -> Result<ProcessRecord> {
        let id = allocation.process_id;
        let mut record = self.repository.get(&id).await?;

        self.send_control(id, MessageKind::ResourceAllocation, serde_json::to_value(&allocation)?)?;
        self.substrate.apply_budget(allocation.clone()).await?;

        debug!(process_id = %id, allocation = %allocation, "Resources allocated");
        record.apply_allocation(allocation, self.clock.now());
        self.repository.save(record.clone()).await?;
        Ok(record)
    }

    fn send_control(
        &self,
        id: ProcessId,
        kind: MessageKind,
        payload: serde_json::Value,
    ) -> Result<usize> {
        self.ipc
            .send_message(IpcMessage::new(kind, EndpointId::main(), id, payload))
    }

    /// Drop a process to the minimal budget and mark it suspended.
    /// Returns false if it already was.
    pub async fn suspend_process(&self, id: &ProcessId) -> Result<bool> {
        let _guard = self.locks.lock(id).await;
        let record = self.repository.get(id).await?;
        if record.is_suspended() {
            return Ok(false);
        }

        let previous = record
            .allocation()
            .cloned()
            .unwrap_or_else(|| self.settings.normal_budget.for_process(*id));

        self.apply_allocation(self.settings.minimal_budget.for_process(*id))
            .await?;
        if let Err(e) = self.mark_suspended(id).await {
            warn!(process_id = %id, error = %e, "Suspend failed, restoring previous budget");
            if let Err(restore) = self.apply_allocation(previous).await {
                warn!(process_id = %id, error = %restore, "Failed to restore previous budget");
            }
            return Err(e);
        }

        info!(process_id = %id, "Process suspended");
        self.events
            .publish(LifecycleEvent::ProcessSuspended { process_id: *id });
        Ok(true)
    }

    async fn mark_suspended(&self, id: &ProcessId) -> Result<()> {
        self.send_control(*id, MessageKind::Suspend, json!({}))?;
        let mut record = self.repository.get(id).await?;
        record.set_suspended(true);
        self.repository.save(record).await
    }

    /// Restore the normal budget of a suspended process.
    /// Returns false if it was not suspended.
    pub async fn resume_process(&self, id: &ProcessId) -> Result<bool> {
        let _guard = self.locks.lock(id).await;
        let record = self.repository.get(id).await?;
        if !record.is_suspended() {
            return Ok(false);
        }

        self.apply_allocation(self.settings.normal_budget.for_process(*id))
            .await?;
        self.send_control(*id, MessageKind::Resume, json!({}))?;

        let mut record = self.repository.get(id).await?;
        record.set_suspended(false);
        self.repository.save(record).await?;

        info!(process_id = %id, "Process resumed");
        self.events
            .publish(LifecycleEvent::ProcessResumed { process_id: *id });
        Ok(true)
    }

    pub async fn attach_tab(&self, id: &ProcessId, tab_id: TabId) -> Result<()> {
        let _guard = self.locks.lock(id).await;
        let mut record = self.repository.get(id).await?;
        record.attach_tab(tab_id);
        self.repository.save(record).await
    }

    /// Returns whether the tab was owned by the process
    pub async fn detach_tab(&self, id: &ProcessId, tab_id: &TabId) -> Result<bool> {
        let _guard = self.locks.lock(id).await;
        let mut record = self.repository.get(id).await?;
        let owned = record.detach_tab(tab_id);
        if owned {
            self.repository.save(record).await?;
        }
        Ok(owned)
    }

    pub async fn list_processes(&self) -> Result<Vec<ProcessRecord>> {
        self.repository.find_all().await
    }

    pub async fn get_process_info(&self, id: &ProcessId) -> Result<ProcessRecord> {
        self.repository.get(id).await
    }

    /// Sum of the last recorded footprint of every process
    pub async fn total_memory_usage(&self) -> Result<u64> {
        Ok(self
            .repository
            .find_all()
            .await?
            .iter()
            .map(|p| p.memory_usage())
            .sum())
    }

    /// Hold the process's exclusive section
    pub(crate) async fn lock_process(&self, id: &ProcessId) -> EntityGuard {
        self.locks.lock(id).await
    }

    /// Re-assert the process budget over its control channel and ask the
    /// worker to trim. Caller holds the process lock and saves the record.
    pub(crate) fn remediate_locked(&self, record: &mut ProcessRecord) -> Result<()> {
        let id = record.id();
        let allocation = match record.allocation() {
            Some(allocation) => allocation.clone(),
            None if record.is_suspended() => self.settings.minimal_budget.for_process(id),
            None => self.settings.normal_budget.for_process(id),
        };

        self.send_control(id, MessageKind::ResourceAllocation, serde_json::to_value(&allocation)?)?;
        self.send_control(id, MessageKind::Trim, json!({ "health": record.health() }))?;

        record.apply_allocation(allocation, self.clock.now());
        record.mark_remediated();

        info!(
            process_id = %id,
            health = %record.health(),
            remediation_count = record.remediation_count(),
            "Remediation pass sent"
        );
        Ok(())
    }
}
