//! Tab/Space Orchestrator
//!
//! Owns the tab, group and space tables and binds every tab to exactly one
//! renderer process. All multi-record updates happen under a single write
//! lock on the workspace tables so they are observed atomically; operations on
//! one tab are additionally serialized through an entity lock so that a
//! destroy waits for an in-flight suspend or restore.
//!
//! Substrate and snapshot calls never run while the tables are locked.

mod memory_optimization;
mod space_transfer;
mod suspension;

pub use memory_optimization::{
    MemoryOptimizationReport, OptimizationPhase, PhaseReport, DEFAULT_OPTIMIZE_INTERVAL,
};
pub use suspension::DEFAULT_SUSPENSION_INTERVAL;

use crate::domain::constants::{DEFAULT_MEMORY_LIMIT_BYTES, DEFAULT_SPACE_NAME};
use crate::domain::ports::{Clock, EventPublisher, LifecycleEvent, SnapshotStore};
use crate::domain::services::entity_locks::EntityLocks;
use crate::domain::services::suspension_policy::SuspensionPolicy;
use crate::domain::services::tab_search::search_tabs;
use crate::domain::services::ProcessManagementService;
use crate::domain::{
    AiMetadata, CreateProcessCommand, DomainError, GroupId, PageState, ProcessId, Result, Space,
    SpaceId, SpaceSettings, SuspensionStrategy, Tab, TabGroup, TabId, TabOptions,
    TabSearchQuery, TabSearchResults, TabUpdate,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct TabOrchestratorSettings {
    pub suspension_strategy: SuspensionStrategy,
    /// Total memory budget that utilization is measured against
    pub memory_limit: u64,
}

impl Default for TabOrchestratorSettings {
    fn default() -> Self {
        Self {
            suspension_strategy: SuspensionStrategy::default(),
            memory_limit: DEFAULT_MEMORY_LIMIT_BYTES,
        }
    }
}

struct WorkspaceTables {
    tabs: HashMap<TabId, Tab>,
    groups: HashMap<GroupId, TabGroup>,
    spaces: HashMap<SpaceId, Space>,
    pinned: HashSet<TabId>,
    default_space: SpaceId,
    active_space: SpaceId,
}

impl WorkspaceTables {
    fn tab(&self, id: &TabId) -> Result<&Tab> {
        self.tabs
            .get(id)
            .ok_or_else(|| DomainError::TabNotFound(id.to_string()))
    }

    fn tab_mut(&mut self, id: &TabId) -> Result<&mut Tab> {
        self.tabs
            .get_mut(id)
            .ok_or_else(|| DomainError::TabNotFound(id.to_string()))
    }

    fn group(&self, id: &GroupId) -> Result<&TabGroup> {
        self.groups
            .get(id)
            .ok_or_else(|| DomainError::GroupNotFound(id.to_string()))
    }

    fn group_mut(&mut self, id: &GroupId) -> Result<&mut TabGroup> {
        self.groups
            .get_mut(id)
            .ok_or_else(|| DomainError::GroupNotFound(id.to_string()))
    }

    fn space(&self, id: &SpaceId) -> Result<&Space> {
        self.spaces
            .get(id)
            .ok_or_else(|| DomainError::SpaceNotFound(id.to_string()))
    }

    fn space_mut(&mut self, id: &SpaceId) -> Result<&mut Space> {
        self.spaces
            .get_mut(id)
            .ok_or_else(|| DomainError::SpaceNotFound(id.to_string()))
    }

    /// Resolve the space and group a new tab lands in
    fn placement(&self, options: &TabOptions) -> Result<(SpaceId, Option<GroupId>)> {
        if let Some(group_id) = options.group_id {
            let group_space = self.group(&group_id)?.space_id();
            if let Some(space_id) = options.space_id {
                if space_id != group_space {
                    return Err(DomainError::InvalidCommand(format!(
                        "group {} does not belong to space {}",
                        group_id, space_id
                    )));
                }
            }
            return Ok((group_space, Some(group_id)));
        }
        let space_id = options.space_id.unwrap_or(self.active_space);
        self.space(&space_id)?;
        Ok((space_id, None))
    }

    /// Remove a tab from every table. Returns the removed tab.
    fn unlink_tab(&mut self, id: &TabId) -> Option<Tab> {
        let tab = self.tabs.remove(id)?;
        if let Some(group) = tab.group_id().and_then(|g| self.groups.get_mut(&g)) {
            group.remove_tab(id);
        }
        if let Some(space) = self.spaces.get_mut(&tab.space_id()) {
            space.forget_tab(id);
        }
        self.pinned.remove(id);
        Some(tab)
    }
}

pub struct TabOrchestrationService {
    tables: RwLock<WorkspaceTables>,
    tab_locks: EntityLocks<TabId>,
    processes: Arc<ProcessManagementService>,
    snapshots: Arc<dyn SnapshotStore>,
    events: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    policy: SuspensionPolicy,
    memory_limit: u64,
}

impl TabOrchestrationService {
    /// Build the orchestrator with its default space
    pub fn new(
        processes: Arc<ProcessManagementService>,
        snapshots: Arc<dyn SnapshotStore>,
        events: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
        settings: TabOrchestratorSettings,
    ) -> Result<Self> {
        if settings.memory_limit == 0 {
            return Err(DomainError::InvalidConfiguration(
                "memory limit must be greater than zero".to_string(),
            ));
        }
        let policy = SuspensionPolicy::new(settings.suspension_strategy)?;

        let default_space = Space::new(
            SpaceId::generate(),
            DEFAULT_SPACE_NAME.to_string(),
            SpaceSettings::default(),
            clock.now(),
        )?;
        let default_id = default_space.id();

        Ok(Self {
            tables: RwLock::new(WorkspaceTables {
                tabs: HashMap::new(),
                groups: HashMap::new(),
                spaces: HashMap::from([(default_id, default_space)]),
                pinned: HashSet::new(),
                default_space: default_id,
                active_space: default_id,
            }),
            tab_locks: EntityLocks::new(),
            processes,
            snapshots,
            events,
            clock,
            policy,
            memory_limit: settings.memory_limit,
        })
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, WorkspaceTables>> {
        self.tables
            .read()
            .map_err(|_| DomainError::LockPoisoned("workspace tables".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, WorkspaceTables>> {
        self.tables
            .write()
            .map_err(|_| DomainError::LockPoisoned("workspace tables".to_string()))
    }

    pub fn processes(&self) -> &Arc<ProcessManagementService> {
        &self.processes
    }

    pub fn memory_limit(&self) -> u64 {
        self.memory_limit
    }

    // ===== Spaces =====

    pub fn default_space_id(&self) -> Result<SpaceId> {
        Ok(self.read()?.default_space)
    }

    pub fn active_space_id(&self) -> Result<SpaceId> {
        Ok(self.read()?.active_space)
    }

    pub fn create_space(&self, name: &str, settings: Option<SpaceSettings>) -> Result<Space> {
        let space = Space::new(
            SpaceId::generate(),
            name.to_string(),
            settings.unwrap_or_default(),
            self.clock.now(),
        )?;
        self.write()?.spaces.insert(space.id(), space.clone());

        info!(space_id = %space.id(), name = %space.name(), "Space created");
        Ok(space)
    }

    pub fn get_space(&self, id: &SpaceId) -> Result<Space> {
        self.read()?.space(id).cloned()
    }

    /// All spaces, oldest first
    pub fn list_spaces(&self) -> Result<Vec<Space>> {
        let mut spaces: Vec<Space> = self.read()?.spaces.values().cloned().collect();
        spaces.sort_by_key(|s| (s.created_at(), s.id()));
        Ok(spaces)
    }

    pub fn set_active_space(&self, id: &SpaceId) -> Result<()> {
        let mut tables = self.write()?;
        tables.space(id)?;
        tables.active_space = *id;
        Ok(())
    }

    pub fn update_space_settings(&self, id: &SpaceId, settings: SpaceSettings) -> Result<Space> {
        let mut tables = self.write()?;
        let space = tables.space_mut(id)?;
        space.set_settings(settings);
        debug!(space_id = %id, "Space settings updated");
        Ok(space.clone())
    }

    /// Delete a space together with its groups and tabs. The default space
    /// cannot be deleted. Returns the number of tabs destroyed.
    ///
    /// The space and its groups leave the tables before any tab is destroyed,
    /// so no tab can be created in or moved into them meanwhile.
    pub async fn delete_space(&self, id: &SpaceId) -> Result<usize> {
        let tab_ids: Vec<TabId> = {
            let mut tables = self.write()?;
            if *id == tables.default_space {
                return Err(DomainError::InvalidCommand(
                    "the default space cannot be deleted".to_string(),
                ));
            }
            let space = tables
                .spaces
                .remove(id)
                .ok_or_else(|| DomainError::SpaceNotFound(id.to_string()))?;
            for group_id in space.group_ids() {
                tables.groups.remove(group_id);
            }
            if tables.active_space == *id {
                tables.active_space = tables.default_space;
            }
            tables
                .tabs
                .values()
                .filter(|t| t.space_id() == *id)
                .map(|t| t.id())
                .collect()
        };

        let mut destroyed = 0;
        for tab_id in &tab_ids {
            if self.destroy_tab(tab_id).await? {
                destroyed += 1;
            }
        }

        info!(space_id = %id, tabs_destroyed = destroyed, "Space deleted");
        Ok(destroyed)
    }

    // ===== Groups =====

    pub fn create_group(&self, space_id: &SpaceId, name: &str, color: &str) -> Result<TabGroup> {
        let group = TabGroup::new(
            GroupId::generate(),
            *space_id,
            name.to_string(),
            color.to_string(),
        )?;

        let mut tables = self.write()?;
        tables.space_mut(space_id)?.add_group(group.id());
        tables.groups.insert(group.id(), group.clone());

        debug!(group_id = %group.id(), space_id = %space_id, name = %name, "Group created");
        Ok(group)
    }

    pub fn get_group(&self, id: &GroupId) -> Result<TabGroup> {
        self.read()?.group(id).cloned()
    }

    /// Groups of one space in display order, or every group
    pub fn list_groups(&self, space_id: Option<&SpaceId>) -> Result<Vec<TabGroup>> {
        let tables = self.read()?;
        match space_id {
            Some(space_id) => Ok(tables
                .space(space_id)?
                .group_ids()
                .iter()
                .filter_map(|g| tables.groups.get(g).cloned())
                .collect()),
            None => Ok(tables.groups.values().cloned().collect()),
        }
    }

    pub fn rename_group(&self, id: &GroupId, name: &str) -> Result<TabGroup> {
        let mut tables = self.write()?;
        let group = tables.group_mut(id)?;
        group.rename(name.to_string())?;
        Ok(group.clone())
    }

    pub fn set_group_color(&self, id: &GroupId, color: &str) -> Result<TabGroup> {
        let mut tables = self.write()?;
        let group = tables.group_mut(id)?;
        group.set_color(color.to_string());
        Ok(group.clone())
    }

    pub fn set_group_collapsed(&self, id: &GroupId, collapsed: bool) -> Result<TabGroup> {
        let mut tables = self.write()?;
        let group = tables.group_mut(id)?;
        group.set_collapsed(collapsed);
        Ok(group.clone())
    }

    /// Remove a group; its tabs stay in the space, ungrouped
    pub fn delete_group(&self, id: &GroupId) -> Result<()> {
        let mut tables = self.write()?;
        let group = tables
            .groups
            .remove(id)
            .ok_or_else(|| DomainError::GroupNotFound(id.to_string()))?;
        for tab_id in group.tab_ids() {
            if let Some(tab) = tables.tabs.get_mut(tab_id) {
                tab.set_group(None);
            }
        }
        if let Some(space) = tables.spaces.get_mut(&group.space_id()) {
            space.remove_group(id);
        }

        debug!(group_id = %id, ungrouped = group.tab_ids().len(), "Group deleted");
        Ok(())
    }

    // ===== Tabs =====

    /// Create a tab and its dedicated renderer process
    pub async fn create_tab(&self, url: &str, options: TabOptions) -> Result<Tab> {
        if url.trim().is_empty() {
            return Err(DomainError::InvalidCommand(
                "Tab URL cannot be empty".to_string(),
            ));
        }
        self.read()?.placement(&options)?;

        let tab_id = TabId::generate();
        let budget = self.processes.settings().normal_budget;
        let created = self
            .processes
            .create_process(CreateProcessCommand::for_tab(tab_id, url, budget))
            .await?;

        match self.insert_tab(tab_id, url, &options, created.id) {
            Ok(tab) => {
                info!(
                    tab_id = %tab_id,
                    process_id = %created.id,
                    space_id = %tab.space_id(),
                    group_id = ?tab.group_id(),
                    "Tab created"
                );
                self.events.publish(LifecycleEvent::TabCreated {
                    tab_id,
                    process_id: created.id,
                    space_id: tab.space_id(),
                });
                if options.pinned {
                    self.events.publish(LifecycleEvent::TabPinned { tab_id });
                }
                Ok(tab)
            }
            Err(e) => {
                warn!(tab_id = %tab_id, error = %e, "Tab registration failed, destroying its process");
                if let Err(cleanup) = self.processes.destroy_process(&created.id).await {
                    warn!(process_id = %created.id, error = %cleanup, "Process cleanup failed");
                }
                Err(e)
            }
        }
    }

    fn insert_tab(
        &self,
        tab_id: TabId,
        url: &str,
        options: &TabOptions,
        process_id: ProcessId,
    ) -> Result<Tab> {
        let now = self.clock.now();
        let mut tables = self.write()?;
        // The group or space may have gone away while the process spawned
        let (space_id, group_id) = tables.placement(options)?;

        let mut tab = Tab::new(tab_id, url.to_string(), space_id, group_id, process_id, now)?;
        if let Some(title) = &options.title {
            tab.set_title(title.clone(), now);
        }

        if let Some(group_id) = group_id {
            tables.group_mut(&group_id)?.add_tab(tab_id);
        }
        let space = tables.space_mut(&space_id)?;
        if space.active_tab_id().is_none() {
            space.set_active_tab(Some(tab_id));
        }
        if options.pinned {
            tables.pinned.insert(tab_id);
        }
        tables.tabs.insert(tab_id, tab.clone());
        Ok(tab)
    }

    /// Destroy a tab and its process. Returns false if the tab did not exist.
    pub async fn destroy_tab(&self, id: &TabId) -> Result<bool> {
        let guard = self.tab_locks.lock(id).await;
        let result = self.destroy_tab_locked(id).await;
        drop(guard);
        self.tab_locks.forget(id);
        result
    }

    async fn destroy_tab_locked(&self, id: &TabId) -> Result<bool> {
        let tab = match self.write()?.unlink_tab(id) {
            Some(tab) => tab,
            None => return Ok(false),
        };
        let process_id = tab.process_id();

        match self.processes.destroy_process(&process_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                debug!(tab_id = %id, process_id = %process_id, "Process already gone");
            }
            Err(e) => {
                warn!(tab_id = %id, process_id = %process_id, error = %e, "Failed to destroy tab process");
            }
        }
        if let Err(e) = self.snapshots.delete(*id).await {
            warn!(tab_id = %id, error = %e, "Failed to drop tab snapshot");
        }

        info!(tab_id = %id, process_id = %process_id, "Tab destroyed");
        self.events.publish(LifecycleEvent::TabDestroyed {
            tab_id: *id,
            process_id,
        });
        Ok(true)
    }

    pub fn get_tab(&self, id: &TabId) -> Result<Tab> {
        self.read()?.tab(id).cloned()
    }

    /// Tabs of one space or of all spaces, oldest first
    pub fn list_tabs(&self, space_id: Option<&SpaceId>) -> Result<Vec<Tab>> {
        let mut tabs: Vec<Tab> = self
            .read()?
            .tabs
            .values()
            .filter(|t| space_id.map_or(true, |s| t.space_id() == *s))
            .cloned()
            .collect();
        tabs.sort_by_key(|t| (t.created_at(), t.id()));
        Ok(tabs)
    }

    pub fn tab_count(&self) -> Result<usize> {
        Ok(self.read()?.tabs.len())
    }

    /// Move a tab into a group (possibly in another space) or out of its
    /// group with `None`
    pub async fn move_tab(&self, id: &TabId, target: Option<GroupId>) -> Result<()> {
        let _guard = self.tab_locks.lock(id).await;

        let from = {
            let mut tables = self.write()?;
            let WorkspaceTables {
                tabs,
                groups,
                spaces,
                ..
            } = &mut *tables;

            let tab = tabs
                .get_mut(id)
                .ok_or_else(|| DomainError::TabNotFound(id.to_string()))?;
            // A tab whose space is being deleted is about to be destroyed
            if !spaces.contains_key(&tab.space_id()) {
                return Err(DomainError::SpaceNotFound(tab.space_id().to_string()));
            }
            let from = tab.group_id();
            if from == target {
                return Ok(());
            }
            let target_space = match target {
                Some(group_id) => groups
                    .get(&group_id)
                    .map(|g| g.space_id())
                    .ok_or_else(|| DomainError::GroupNotFound(group_id.to_string()))?,
                None => tab.space_id(),
            };

            if let Some(group) = from.and_then(|g| groups.get_mut(&g)) {
                group.remove_tab(id);
            }
            if let Some(group) = target.and_then(|g| groups.get_mut(&g)) {
                group.add_tab(*id);
            }
            if target_space != tab.space_id() {
                if let Some(space) = spaces.get_mut(&tab.space_id()) {
                    space.forget_tab(id);
                }
                tab.set_space(target_space);
            }
            tab.set_group(target);
            from
        };

        debug!(tab_id = %id, from = ?from, to = ?target, "Tab moved");
        self.events.publish(LifecycleEvent::TabMoved {
            tab_id: *id,
            from_group: from,
            to_group: target,
        });
        Ok(())
    }

    /// Make a tab the active tab of its space, restoring it if suspended
    pub async fn activate_tab(&self, id: &TabId) -> Result<Tab> {
        let suspended = {
            let now = self.clock.now();
            let mut tables = self.write()?;
            let tab = tables.tab_mut(id)?;
            tab.touch(now);
            let space_id = tab.space_id();
            let suspended = tab.is_suspended();
            tables.space_mut(&space_id)?.set_active_tab(Some(*id));
            tables.active_space = space_id;
            suspended
        };

        if suspended {
            self.restore_tab(id).await?;
        }
        self.get_tab(id)
    }

    /// Navigate, retitle or change the load status of a live tab
    pub fn update_tab(&self, id: &TabId, update: TabUpdate) -> Result<Tab> {
        let now = self.clock.now();
        let mut tables = self.write()?;
        let tab = tables.tab_mut(id)?;
        if tab.is_suspended() {
            return Err(DomainError::InvalidStateTransition {
                from: tab.status().to_string(),
                to: "updated".to_string(),
            });
        }

        if let Some(url) = update.url {
            tab.navigate(url, now)?;
        }
        if let Some(title) = update.title {
            tab.set_title(title, now);
        }
        if let Some(status) = update.status {
            tab.set_status(status)?;
        }
        tab.touch(now);
        Ok(tab.clone())
    }

    pub fn update_page_state(&self, id: &TabId, page_state: PageState) -> Result<()> {
        self.write()?.tab_mut(id)?.set_page_state(page_state);
        Ok(())
    }

    pub fn set_ai_metadata(&self, id: &TabId, metadata: AiMetadata) -> Result<()> {
        self.write()?.tab_mut(id)?.set_ai_metadata(metadata);
        Ok(())
    }

    /// `None` removes the bookmark
    pub fn bookmark_tab(&self, id: &TabId, folder: Option<&str>) -> Result<()> {
        self.write()?
            .tab_mut(id)?
            .set_bookmark_folder(folder.map(str::to_string));
        Ok(())
    }

    /// Returns false if the tab was already pinned
    pub fn pin_tab(&self, id: &TabId) -> Result<bool> {
        let newly = {
            let mut tables = self.write()?;
            tables.tab(id)?;
            tables.pinned.insert(*id)
        };
        if newly {
            self.events.publish(LifecycleEvent::TabPinned { tab_id: *id });
        }
        Ok(newly)
    }

    /// Returns false if the tab was not pinned
    pub fn unpin_tab(&self, id: &TabId) -> Result<bool> {
        let removed = {
            let mut tables = self.write()?;
            tables.tab(id)?;
            tables.pinned.remove(id)
        };
        if removed {
            self.events
                .publish(LifecycleEvent::TabUnpinned { tab_id: *id });
        }
        Ok(removed)
    }

    pub fn is_pinned(&self, id: &TabId) -> Result<bool> {
        Ok(self.read()?.pinned.contains(id))
    }

    pub fn search_tabs_advanced(&self, query: &TabSearchQuery) -> Result<TabSearchResults> {
        let tables = self.read()?;
        Ok(search_tabs(tables.tabs.values(), &tables.pinned, query))
    }

    /// Copy the latest recorded process footprint onto each tab
    async fn sync_tab_memory(&self) -> Result<()> {
        let usage: HashMap<ProcessId, u64> = self
            .processes
            .list_processes()
            .await?
            .iter()
            .map(|p| (p.id(), p.memory_usage()))
            .collect();

        let mut tables = self.write()?;
        for tab in tables.tabs.values_mut() {
            if let Some(bytes) = usage.get(&tab.process_id()) {
                tab.set_memory_usage(*bytes);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::domain::services::{IpcManager, ProcessManagerSettings};
    use crate::infrastructure::{
        BroadcastEventBus, InMemoryProcessRepository, InMemorySnapshotStore, ManualClock,
        SimulatedSubstrate,
    };
    use chrono::Utc;

    pub(crate) struct Harness {
        pub orchestrator: TabOrchestrationService,
        pub repo: Arc<InMemoryProcessRepository>,
        pub substrate: Arc<SimulatedSubstrate>,
        pub snapshots: Arc<InMemorySnapshotStore>,
        pub bus: Arc<BroadcastEventBus>,
        pub clock: Arc<ManualClock>,
    }

    impl Harness {
        pub(crate) async fn set_process_memory(&self, process_id: ProcessId, bytes: u64) {
            use crate::domain::ports::ProcessRepository;
            let mut record = self.repo.get(&process_id).await.unwrap();
            record.set_memory_usage(bytes);
            self.repo.save(record).await.unwrap();
        }
    }

    pub(crate) fn harness_with(settings: TabOrchestratorSettings) -> Harness {
        harness_with_store(settings, None)
    }

    pub(crate) fn harness_with_store(
        settings: TabOrchestratorSettings,
        store: Option<Arc<dyn SnapshotStore>>,
    ) -> Harness {
        let repo = Arc::new(InMemoryProcessRepository::new());
        let substrate = Arc::new(SimulatedSubstrate::new());
        let snapshots = Arc::new(InMemorySnapshotStore::new());
        let bus = Arc::new(BroadcastEventBus::default());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let processes = Arc::new(ProcessManagementService::new(
            repo.clone(),
            substrate.clone(),
            IpcManager::default(),
            bus.clone(),
            clock.clone(),
            ProcessManagerSettings::default(),
        ));
        let orchestrator = TabOrchestrationService::new(
            processes,
            store.unwrap_or_else(|| snapshots.clone()),
            bus.clone(),
            clock.clone(),
            settings,
        )
        .unwrap();
        Harness {
            orchestrator,
            repo,
            substrate,
            snapshots,
            bus,
            clock,
        }
    }

    pub(crate) fn harness() -> Harness {
        harness_with(TabOrchestratorSettings::default())
    }
}
