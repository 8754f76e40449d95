//! SearchTabs Query

use crate::domain::{GroupId, SecurityRating, Sentiment, SpaceId, Tab, TabStatus};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    Title,
    Url,
    #[default]
    LastActive,
    Created,
    /// Last activity plus a large bonus for pinned tabs
    Relevance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

/// Filters combine with AND; unset filters match everything
#[derive(Debug, Clone, Default)]
pub struct TabSearchQuery {
    /// Matches title, url, AI summary or AI topics (case-insensitive)
    pub text: Option<String>,
    pub url_contains: Option<String>,
    pub title_contains: Option<String>,
    pub group_id: Option<GroupId>,
    pub space_id: Option<SpaceId>,
    pub status: Option<TabStatus>,
    pub suspended: Option<bool>,
    pub ai_topic: Option<String>,
    pub sentiment: Option<Sentiment>,
    pub security_rating: Option<SecurityRating>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub sort_by: SortField,
    pub sort_order: SortOrder,
    pub offset: usize,
    pub limit: Option<usize>,
}

impl TabSearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn in_space(mut self, space_id: SpaceId) -> Self {
        self.space_id = Some(space_id);
        self
    }

    pub fn in_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    pub fn suspended(mut self, suspended: bool) -> Self {
        self.suspended = Some(suspended);
        self
    }

    pub fn sort(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_by = field;
        self.sort_order = order;
        self
    }

    pub fn page(mut self, offset: usize, limit: usize) -> Self {
        self.offset = offset;
        self.limit = Some(limit);
        self
    }
}

/// One page of results plus the number of matches before pagination
#[derive(Debug, Clone)]
pub struct TabSearchResults {
    pub tabs: Vec<Tab>,
    pub total: usize,
}
