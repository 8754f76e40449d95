use crate::domain::{DomainError, GroupId, SpaceId, SpaceSettings, TabId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Top-level workspace holding groups, settings and one active tab
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Space {
    id: SpaceId,
    name: String,
    group_ids: Vec<GroupId>,
    active_tab_id: Option<TabId>,
    settings: SpaceSettings,
    created_at: DateTime<Utc>,
}

impl Space {
    pub fn new(
        id: SpaceId,
        name: String,
        settings: SpaceSettings,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::InvalidCommand(
                "Space name cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            id,
            name,
            group_ids: Vec::new(),
            active_tab_id: None,
            settings,
            created_at: now,
        })
    }

    pub fn id(&self) -> SpaceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn group_ids(&self) -> &[GroupId] {
        &self.group_ids
    }

    pub fn active_tab_id(&self) -> Option<TabId> {
        self.active_tab_id
    }

    pub fn settings(&self) -> &SpaceSettings {
        &self.settings
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn set_settings(&mut self, settings: SpaceSettings) {
        self.settings = settings;
    }

    pub fn set_active_tab(&mut self, tab_id: Option<TabId>) {
        self.active_tab_id = tab_id;
    }

    /// Clear the active tab if it is the given one
    pub fn forget_tab(&mut self, tab_id: &TabId) {
        if self.active_tab_id.as_ref() == Some(tab_id) {
            self.active_tab_id = None;
        }
    }

    pub fn add_group(&mut self, group_id: GroupId) {
        if !self.group_ids.contains(&group_id) {
            self.group_ids.push(group_id);
        }
    }

    pub fn remove_group(&mut self, group_id: &GroupId) {
        self.group_ids.retain(|g| g != group_id);
    }
}
