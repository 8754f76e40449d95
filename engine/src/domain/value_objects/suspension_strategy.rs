//! SuspensionStrategy value object
//! Configures which tabs the suspension monitor evicts

use crate::domain::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum StrategyKind {
    Lru,
    UsageBased,
    TimeBased,
    MemoryBased,
    #[default]
    Hybrid,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Lru => write!(f, "lru"),
            StrategyKind::UsageBased => write!(f, "usage-based"),
            StrategyKind::TimeBased => write!(f, "time-based"),
            StrategyKind::MemoryBased => write!(f, "memory-based"),
            StrategyKind::Hybrid => write!(f, "hybrid"),
        }
    }
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "lru" => Ok(StrategyKind::Lru),
            "usage-based" | "usage" => Ok(StrategyKind::UsageBased),
            "time-based" | "time" => Ok(StrategyKind::TimeBased),
            "memory-based" | "memory" => Ok(StrategyKind::MemoryBased),
            "hybrid" => Ok(StrategyKind::Hybrid),
            _ => Err(format!(
                "Invalid suspension strategy '{}'. Valid values: lru, usage-based, time-based, memory-based, hybrid",
                s
            )),
        }
    }
}

/// Relative weights of the hybrid score components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HybridWeights {
    pub time: f64,
    pub memory: f64,
    pub usage: f64,
}

impl Default for HybridWeights {
    /// Equal thirds
    fn default() -> Self {
        Self {
            time: 1.0 / 3.0,
            memory: 1.0 / 3.0,
            usage: 1.0 / 3.0,
        }
    }
}

impl HybridWeights {
    /// Scale the weights so they sum to 1.0
    pub fn normalized(&self) -> Result<Self, DomainError> {
        if self.time < 0.0 || self.memory < 0.0 || self.usage < 0.0 {
            return Err(DomainError::InvalidConfiguration(
                "Hybrid weights cannot be negative".to_string(),
            ));
        }
        let sum = self.time + self.memory + self.usage;
        if sum <= 0.0 {
            return Err(DomainError::InvalidConfiguration(
                "Hybrid weights must not all be zero".to_string(),
            ));
        }
        Ok(Self {
            time: self.time / sum,
            memory: self.memory / sum,
            usage: self.usage / sum,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SuspensionStrategy {
    pub kind: StrategyKind,
    /// Minutes for usage-based, megabytes for memory-based
    pub threshold: f64,
    pub grace_period: Duration,
    pub weights: Option<HybridWeights>,
}

impl Default for SuspensionStrategy {
    fn default() -> Self {
        Self {
            kind: StrategyKind::default(),
            threshold: 30.0,
            grace_period: Duration::from_secs(30 * 60),
            weights: None,
        }
    }
}

impl SuspensionStrategy {
    pub fn new(kind: StrategyKind) -> Self {
        Self {
            kind,
            ..Default::default()
        }
    }

    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn with_weights(mut self, weights: HybridWeights) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Weights actually used by the hybrid score
    pub fn effective_weights(&self) -> Result<HybridWeights, DomainError> {
        self.weights.unwrap_or_default().normalized()
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.threshold < 0.0 || !self.threshold.is_finite() {
            return Err(DomainError::InvalidConfiguration(format!(
                "Suspension threshold must be a non-negative number, got {}",
                self.threshold
            )));
        }
        if self.grace_period.is_zero() {
            return Err(DomainError::InvalidConfiguration(
                "Suspension grace period must be greater than zero".to_string(),
            ));
        }
        self.effective_weights().map(|_| ())
    }
}
