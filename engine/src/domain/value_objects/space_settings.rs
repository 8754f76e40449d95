use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SpaceLayout {
    #[default]
    Horizontal,
    Vertical,
    Grid,
}

/// Per-space settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpaceSettings {
    pub theme: String,
    pub layout: SpaceLayout,
    /// When false the suspension monitor leaves this space's tabs alone
    pub auto_suspend: bool,
    /// Advisory memory limit for the space in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<u64>,
    pub ai_enabled: bool,
}

impl Default for SpaceSettings {
    fn default() -> Self {
        Self {
            theme: "system".to_string(),
            layout: SpaceLayout::default(),
            auto_suspend: true,
            memory_limit: None,
            ai_enabled: true,
        }
    }
}
