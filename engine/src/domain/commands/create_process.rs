//! CreateProcess Command
//!
//! Command data structure for creating a worker process.

use crate::domain::ports::SpawnConfig;
use crate::domain::{ProcessId, ProcessType, ResourceBudget, TabId};

/// Command to create a new worker process
#[derive(Debug, Clone, Default)]
pub struct CreateProcessCommand {
    pub process_type: ProcessType,
    pub spawn: SpawnConfig,

    /// Tab that will own the process
    pub owner_tab: Option<TabId>,

    /// Budget applied right after the control channel is opened
    pub initial_budget: Option<ResourceBudget>,
}

impl CreateProcessCommand {
    pub fn new(process_type: ProcessType) -> Self {
        Self {
            process_type,
            ..Default::default()
        }
    }

    /// Renderer process dedicated to one tab
    pub fn for_tab(tab_id: TabId, url: &str, budget: ResourceBudget) -> Self {
        Self {
            process_type: ProcessType::Renderer,
            spawn: SpawnConfig::for_url(url),
            owner_tab: Some(tab_id),
            initial_budget: Some(budget),
        }
    }
}

/// Response from creating a process
#[derive(Debug, Clone)]
pub struct CreateProcessResponse {
    pub id: ProcessId,
    pub process_type: ProcessType,
}
