use crate::domain::{DomainError, GroupId, SpaceId, TabId};
use serde::{Deserialize, Serialize};

/// Named, ordered collection of tabs inside one space
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TabGroup {
    id: GroupId,
    space_id: SpaceId,
    name: String,
    color: String,
    tab_ids: Vec<TabId>,
    collapsed: bool,
}

impl TabGroup {
    pub fn new(
        id: GroupId,
        space_id: SpaceId,
        name: String,
        color: String,
    ) -> Result<Self, DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::InvalidCommand(
                "Group name cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            id,
            space_id,
            name,
            color,
            tab_ids: Vec::new(),
            collapsed: false,
        })
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn space_id(&self) -> SpaceId {
        self.space_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> &str {
        &self.color
    }

    pub fn tab_ids(&self) -> &[TabId] {
        &self.tab_ids
    }

    pub fn contains(&self, tab_id: &TabId) -> bool {
        self.tab_ids.contains(tab_id)
    }

    pub fn is_collapsed(&self) -> bool {
        self.collapsed
    }

    pub fn rename(&mut self, name: String) -> Result<(), DomainError> {
        if name.trim().is_empty() {
            return Err(DomainError::InvalidCommand(
                "Group name cannot be empty".to_string(),
            ));
        }
        self.name = name;
        Ok(())
    }

    pub fn set_color(&mut self, color: String) {
        self.color = color;
    }

    pub fn set_collapsed(&mut self, collapsed: bool) {
        self.collapsed = collapsed;
    }

    pub fn add_tab(&mut self, tab_id: TabId) {
        if !self.tab_ids.contains(&tab_id) {
            self.tab_ids.push(tab_id);
        }
    }

    pub fn remove_tab(&mut self, tab_id: &TabId) -> bool {
        let before = self.tab_ids.len();
        self.tab_ids.retain(|t| t != tab_id);
        before != self.tab_ids.len()
    }

    /// Put members listed in `order` first, in that order. Ids that are not
    /// members are ignored; unlisted members keep their relative order.
    pub fn reorder(&mut self, order: &[TabId]) {
        let mut ordered: Vec<TabId> = Vec::with_capacity(self.tab_ids.len());
        for id in order {
            if self.tab_ids.contains(id) && !ordered.contains(id) {
                ordered.push(*id);
            }
        }
        let rest: Vec<TabId> = self
            .tab_ids
            .iter()
            .filter(|t| !ordered.contains(t))
            .copied()
            .collect();
        ordered.extend(rest);
        self.tab_ids = ordered;
    }
}
