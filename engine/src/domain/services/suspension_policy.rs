//! Suspension policy
//! Picks which tabs a suspension cycle should evict
//!
//! Candidates are expected to be pre-filtered (live, unpinned, in an
//! auto-suspend space). The policy only ranks and thresholds them.

use crate::domain::constants::{
    BYTES_PER_MB, HYBRID_MEMORY_REFERENCE_MB, HYBRID_SUSPEND_SCORE, LRU_MAX_PER_CYCLE,
    LRU_MIN_PER_CYCLE, LRU_SUSPEND_FRACTION,
};
use crate::domain::{HybridWeights, Result, StrategyKind, SuspensionStrategy, Tab, TabId};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct SuspensionPolicy {
    strategy: SuspensionStrategy,
    weights: HybridWeights,
}

impl SuspensionPolicy {
    pub fn new(strategy: SuspensionStrategy) -> Result<Self> {
        strategy.validate()?;
        let weights = strategy.effective_weights()?;
        Ok(Self { strategy, weights })
    }

    pub fn strategy(&self) -> &SuspensionStrategy {
        &self.strategy
    }

    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind
    }

    /// Tabs to suspend, in the order they should be suspended
    pub fn select(&self, candidates: &[&Tab], now: DateTime<Utc>) -> Vec<TabId> {
        match self.strategy.kind {
            StrategyKind::Lru => self.select_lru(candidates),
            _ => candidates
                .iter()
                .filter(|tab| self.should_suspend(tab, now))
                .map(|tab| tab.id())
                .collect(),
        }
    }

    fn select_lru(&self, candidates: &[&Tab]) -> Vec<TabId> {
        if candidates.is_empty() {
            return Vec::new();
        }
        let mut ranked: Vec<&&Tab> = candidates.iter().collect();
        ranked.sort_by_key(|tab| (tab.last_active(), tab.created_at(), tab.id()));

        let count = lru_batch_size(candidates.len());
        ranked.into_iter().take(count).map(|tab| tab.id()).collect()
    }

    fn should_suspend(&self, tab: &Tab, now: DateTime<Utc>) -> bool {
        match self.strategy.kind {
            StrategyKind::TimeBased => idle_secs(tab, now) > self.grace_secs(),
            StrategyKind::UsageBased => self.usage_score(tab, now) > self.strategy.threshold,
            StrategyKind::MemoryBased => memory_mb(tab) > self.strategy.threshold,
            StrategyKind::Hybrid => self.hybrid_score(tab, now) > HYBRID_SUSPEND_SCORE,
            StrategyKind::Lru => false,
        }
    }

    fn grace_secs(&self) -> f64 {
        self.strategy.grace_period.as_secs_f64()
    }

    /// Idle minutes, halved when the content changed within the grace period
    pub fn usage_score(&self, tab: &Tab, now: DateTime<Utc>) -> f64 {
        let idle_minutes = idle_secs(tab, now) / 60.0;
        let recently_updated = tab.last_content_update().is_some_and(|updated| {
            let since = (now - updated).num_milliseconds() as f64 / 1000.0;
            since <= self.grace_secs()
        });
        if recently_updated {
            idle_minutes / 2.0
        } else {
            idle_minutes
        }
    }

    /// Weighted sum of normalized time, memory and usage scores in [0, 1]
    pub fn hybrid_score(&self, tab: &Tab, now: DateTime<Utc>) -> f64 {
        let time = ratio(idle_secs(tab, now), self.grace_secs());
        let memory = ratio(memory_mb(tab), HYBRID_MEMORY_REFERENCE_MB);
        let usage = ratio(self.usage_score(tab, now), self.strategy.threshold);

        self.weights.time * time + self.weights.memory * memory + self.weights.usage * usage
    }
}

/// Number of tabs the LRU strategy evicts per cycle
pub fn lru_batch_size(eligible: usize) -> usize {
    if eligible == 0 {
        return 0;
    }
    let fraction = (eligible as f64 * LRU_SUSPEND_FRACTION).floor() as usize;
    fraction.clamp(LRU_MIN_PER_CYCLE, LRU_MAX_PER_CYCLE)
}

fn idle_secs(tab: &Tab, now: DateTime<Utc>) -> f64 {
    tab.idle_duration(now).num_milliseconds() as f64 / 1000.0
}

fn memory_mb(tab: &Tab) -> f64 {
    tab.memory_usage() as f64 / BYTES_PER_MB as f64
}

/// value / reference capped at 1.0; a zero reference saturates any positive value
fn ratio(value: f64, reference: f64) -> f64 {
    if reference <= 0.0 {
        return if value > 0.0 { 1.0 } else { 0.0 };
    }
    (value / reference).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ProcessId, SpaceId};
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;

    fn tab_idle_for(now: DateTime<Utc>, minutes: i64) -> Tab {
        Tab::new(
            TabId::generate(),
            "https://a.example".to_string(),
            SpaceId::generate(),
            None,
            ProcessId::generate(),
            now - ChronoDuration::minutes(minutes),
        )
        .unwrap()
    }

    fn policy(strategy: SuspensionStrategy) -> SuspensionPolicy {
        SuspensionPolicy::new(strategy).unwrap()
    }

    #[test]
    fn test_lru_batch_size_bounds() {
        assert_eq!(lru_batch_size(0), 0);
        assert_eq!(lru_batch_size(1), 1);
        assert_eq!(lru_batch_size(10), 1);
        assert_eq!(lru_batch_size(25), 2);
        assert_eq!(lru_batch_size(100), 3);
    }

    #[test]
    fn test_lru_picks_the_oldest() {
        let now = Utc::now();
        let tabs: Vec<Tab> = (0..10).map(|i| tab_idle_for(now, i)).collect();
        let refs: Vec<&Tab> = tabs.iter().collect();

        let selected = policy(SuspensionStrategy::new(StrategyKind::Lru)).select(&refs, now);
        assert_eq!(selected, vec![tabs[9].id()]);
    }

    #[test]
    fn test_time_based_uses_grace_period() {
        let now = Utc::now();
        let fresh = tab_idle_for(now, 5);
        let stale = tab_idle_for(now, 45);
        let p = policy(
            SuspensionStrategy::new(StrategyKind::TimeBased)
                .with_grace_period(Duration::from_secs(30 * 60)),
        );

        assert_eq!(p.select(&[&fresh, &stale], now), vec![stale.id()]);
    }

    #[test]
    fn test_usage_score_halves_after_recent_update() {
        let now = Utc::now();
        let mut tab = tab_idle_for(now, 40);
        let p = policy(SuspensionStrategy::new(StrategyKind::UsageBased).with_threshold(30.0));
        assert!((p.usage_score(&tab, now) - 40.0).abs() < 0.01);
        assert_eq!(p.select(&[&tab], now), vec![tab.id()]);

        tab.set_title("Updated".to_string(), now - ChronoDuration::minutes(1));
        assert!((p.usage_score(&tab, now) - 20.0).abs() < 0.01);
        assert!(p.select(&[&tab], now).is_empty());
    }

    #[test]
    fn test_memory_based_threshold_in_megabytes() {
        let now = Utc::now();
        let mut heavy = tab_idle_for(now, 0);
        heavy.set_memory_usage(300 * BYTES_PER_MB);
        let mut light = tab_idle_for(now, 0);
        light.set_memory_usage(50 * BYTES_PER_MB);

        let p = policy(SuspensionStrategy::new(StrategyKind::MemoryBased).with_threshold(200.0));
        assert_eq!(p.select(&[&heavy, &light], now), vec![heavy.id()]);
    }

    #[test]
    fn test_hybrid_requires_combined_pressure() {
        let now = Utc::now();
        let p = policy(SuspensionStrategy::default());

        let mut idle_heavy = tab_idle_for(now, 120);
        idle_heavy.set_memory_usage(600 * BYTES_PER_MB);
        let idle_light = tab_idle_for(now, 120);

        assert!(p.hybrid_score(&idle_heavy, now) > HYBRID_SUSPEND_SCORE);
        // time and usage saturate but memory is zero: 2/3 < 0.7
        assert!(p.hybrid_score(&idle_light, now) < HYBRID_SUSPEND_SCORE);
        assert_eq!(p.select(&[&idle_heavy, &idle_light], now), vec![idle_heavy.id()]);
    }

    #[test]
    fn test_invalid_weights_are_rejected() {
        let strategy = SuspensionStrategy::default().with_weights(HybridWeights {
            time: 0.0,
            memory: 0.0,
            usage: 0.0,
        });
        assert!(SuspensionPolicy::new(strategy).is_err());
    }
}
