//! ProcessType value object
//! Role of a worker process in the browser

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProcessType {
    Main,
    /// Hosts one tab
    #[default]
    Renderer,
    Gpu,
    Network,
    Utility,
    Ai,
}

impl fmt::Display for ProcessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProcessType::Main => "main",
            ProcessType::Renderer => "renderer",
            ProcessType::Gpu => "gpu",
            ProcessType::Network => "network",
            ProcessType::Utility => "utility",
            ProcessType::Ai => "ai",
        };
        f.write_str(s)
    }
}

impl FromStr for ProcessType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "main" => Ok(ProcessType::Main),
            "renderer" => Ok(ProcessType::Renderer),
            "gpu" => Ok(ProcessType::Gpu),
            "network" => Ok(ProcessType::Network),
            "utility" => Ok(ProcessType::Utility),
            "ai" => Ok(ProcessType::Ai),
            _ => Err(format!(
                "Invalid process type '{}'. Valid values: main, renderer, gpu, network, utility, ai",
                s
            )),
        }
    }
}
