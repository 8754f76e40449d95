//! CreateTab / UpdateTab Commands

use crate::domain::{GroupId, SpaceId, TabStatus};

/// Options for creating a tab
#[derive(Debug, Clone, Default)]
pub struct TabOptions {
    /// Target space; defaults to the group's space, then the active space
    pub space_id: Option<SpaceId>,
    pub group_id: Option<GroupId>,
    pub title: Option<String>,
    pub pinned: bool,
}

impl TabOptions {
    pub fn in_space(space_id: SpaceId) -> Self {
        Self {
            space_id: Some(space_id),
            ..Default::default()
        }
    }

    pub fn in_group(group_id: GroupId) -> Self {
        Self {
            group_id: Some(group_id),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn pinned(mut self) -> Self {
        self.pinned = true;
        self
    }
}

/// Partial update of a live tab
#[derive(Debug, Clone, Default)]
pub struct TabUpdate {
    pub url: Option<String>,
    pub title: Option<String>,
    pub status: Option<TabStatus>,
}
