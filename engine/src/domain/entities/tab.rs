//! Tab entity
//! A browsing context bound to exactly one process and one space

use crate::domain::{
    AiMetadata, DomainError, GroupId, PageState, ProcessId, SpaceId, TabId, TabStatus,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tab {
    // Identity
    id: TabId,
    process_id: ProcessId,

    // Content
    url: String,
    title: String,
    status: TabStatus,
    suspended: bool,
    page_state: PageState,
    history: Vec<String>,

    // Organization
    space_id: SpaceId,
    group_id: Option<GroupId>,
    bookmark_folder: Option<String>,

    // Metadata
    ai_metadata: AiMetadata,
    memory_usage: u64,

    // Timestamps
    created_at: DateTime<Utc>,
    last_active: DateTime<Utc>,
    last_content_update: Option<DateTime<Utc>>,
}

impl Tab {
    pub fn new(
        id: TabId,
        url: String,
        space_id: SpaceId,
        group_id: Option<GroupId>,
        process_id: ProcessId,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if url.trim().is_empty() {
            return Err(DomainError::InvalidCommand(
                "Tab URL cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            id,
            process_id,
            title: url.clone(),
            history: vec![url.clone()],
            url,
            status: TabStatus::Loading,
            suspended: false,
            page_state: PageState::default(),
            space_id,
            group_id,
            bookmark_folder: None,
            ai_metadata: AiMetadata::default(),
            memory_usage: 0,
            created_at: now,
            last_active: now,
            last_content_update: None,
        })
    }

    // ===== Getters =====

    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn process_id(&self) -> ProcessId {
        self.process_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn status(&self) -> TabStatus {
        self.status
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn page_state(&self) -> &PageState {
        &self.page_state
    }

    pub fn history(&self) -> &[String] {
        &self.history
    }

    pub fn space_id(&self) -> SpaceId {
        self.space_id
    }

    pub fn group_id(&self) -> Option<GroupId> {
        self.group_id
    }

    pub fn bookmark_folder(&self) -> Option<&str> {
        self.bookmark_folder.as_deref()
    }

    pub fn ai_metadata(&self) -> &AiMetadata {
        &self.ai_metadata
    }

    pub fn memory_usage(&self) -> u64 {
        self.memory_usage
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn last_active(&self) -> DateTime<Utc> {
        self.last_active
    }

    pub fn last_content_update(&self) -> Option<DateTime<Utc>> {
        self.last_content_update
    }

    /// Time since last activity, never negative
    pub fn idle_duration(&self, now: DateTime<Utc>) -> Duration {
        (now - self.last_active).max(Duration::zero())
    }

    // ===== Mutations =====

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_active = now;
    }

    pub fn navigate(&mut self, url: String, now: DateTime<Utc>) -> Result<(), DomainError> {
        if url.trim().is_empty() {
            return Err(DomainError::InvalidCommand(
                "Tab URL cannot be empty".to_string(),
            ));
        }
        if self.history.last() != Some(&url) {
            self.history.push(url.clone());
        }
        self.url = url;
        self.status = TabStatus::Loading;
        self.page_state = PageState::default();
        self.last_content_update = Some(now);
        self.last_active = now;
        Ok(())
    }

    pub fn set_title(&mut self, title: String, now: DateTime<Utc>) {
        self.title = title;
        self.last_content_update = Some(now);
    }

    /// Loading/Complete/Error only; Suspended is reached through `mark_suspended`
    pub fn set_status(&mut self, status: TabStatus) -> Result<(), DomainError> {
        if status == TabStatus::Suspended || self.suspended {
            return Err(DomainError::InvalidStateTransition {
                from: self.status.to_string(),
                to: status.to_string(),
            });
        }
        self.status = status;
        Ok(())
    }

    pub fn set_page_state(&mut self, page_state: PageState) {
        self.page_state = page_state;
    }

    pub fn set_ai_metadata(&mut self, metadata: AiMetadata) {
        self.ai_metadata = metadata;
    }

    pub fn set_bookmark_folder(&mut self, folder: Option<String>) {
        self.bookmark_folder = folder;
    }

    pub fn set_memory_usage(&mut self, bytes: u64) {
        self.memory_usage = bytes;
    }

    pub(crate) fn set_group(&mut self, group_id: Option<GroupId>) {
        self.group_id = group_id;
    }

    pub(crate) fn set_space(&mut self, space_id: SpaceId) {
        self.space_id = space_id;
    }

    pub(crate) fn set_history(&mut self, history: Vec<String>) {
        self.history = history;
    }

    pub(crate) fn set_created_at(&mut self, created_at: DateTime<Utc>) {
        self.created_at = created_at;
    }

    pub fn mark_suspended(&mut self) {
        self.suspended = true;
        self.status = TabStatus::Suspended;
    }

    /// Restore content from a snapshot and mark the tab live again
    pub fn mark_restored(
        &mut self,
        url: String,
        title: String,
        page_state: PageState,
        now: DateTime<Utc>,
    ) {
        self.url = url;
        self.title = title;
        self.page_state = page_state;
        self.suspended = false;
        self.status = TabStatus::Complete;
        self.last_active = now;
    }
}
