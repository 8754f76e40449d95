//! TabStatus value object

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TabStatus {
    #[default]
    Loading,
    Complete,
    Error,
    Suspended,
}

impl fmt::Display for TabStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TabStatus::Loading => write!(f, "loading"),
            TabStatus::Complete => write!(f, "complete"),
            TabStatus::Error => write!(f, "error"),
            TabStatus::Suspended => write!(f, "suspended"),
        }
    }
}
