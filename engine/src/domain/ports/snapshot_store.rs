//! SnapshotStore port
//! Keeps the minimal resumable state of suspended tabs

use crate::domain::{DomainError, PageState, TabId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabSnapshot {
    pub url: String,
    pub title: String,
    pub page_state: PageState,
    pub captured_at: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn save(&self, tab_id: TabId, snapshot: TabSnapshot) -> Result<(), DomainError>;

    /// Fails with `SnapshotFailed` if nothing was saved for the tab
    async fn load(&self, tab_id: TabId) -> Result<TabSnapshot, DomainError>;

    /// Returns whether a snapshot existed
    async fn delete(&self, tab_id: TabId) -> Result<bool, DomainError>;
}
