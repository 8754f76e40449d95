use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resumable per-page state captured in suspension snapshots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PageState {
    pub scroll_x: f64,
    pub scroll_y: f64,
    /// Form field name -> value
    #[serde(default)]
    pub form_state: BTreeMap<String, String>,
}
