//! Domain Constants
//!
//! Budgets, thresholds and limits used throughout the domain layer

/// Memory unit constants
pub const BYTES_PER_KB: u64 = 1024;
pub const BYTES_PER_MB: u64 = 1024 * 1024;
pub const BYTES_PER_GB: u64 = 1024 * 1024 * 1024;
pub const BYTES_PER_TB: u64 = 1024 * 1024 * 1024 * 1024;

/// Endpoint name of the orchestrator side of every control channel
pub const MAIN_ENDPOINT: &str = "main";

/// Normal per-tab budget: memory in bytes (512 MB)
pub const DEFAULT_NORMAL_MEMORY_BYTES: u64 = 512 * BYTES_PER_MB;

/// Normal per-tab budget: CPU quota in percent
pub const DEFAULT_NORMAL_CPU_QUOTA: f64 = 50.0;

/// Minimal (suspended) budget: memory in bytes (10 MB)
pub const DEFAULT_MINIMAL_MEMORY_BYTES: u64 = 10 * BYTES_PER_MB;

/// Minimal (suspended) budget: CPU quota in percent
pub const DEFAULT_MINIMAL_CPU_QUOTA: f64 = 5.0;

/// Health thresholds
pub const DEFAULT_MEMORY_CEILING_BYTES: u64 = BYTES_PER_GB;
pub const DEFAULT_CPU_CEILING_PERCENT: f64 = 90.0;

/// Rebalancer: idle processes above this are suspended (100 MB)
pub const DEFAULT_IDLE_MEMORY_THRESHOLD_BYTES: u64 = 100 * BYTES_PER_MB;

/// Total memory budget used by memory optimization (4 GB)
pub const DEFAULT_MEMORY_LIMIT_BYTES: u64 = 4 * BYTES_PER_GB;

/// Memory optimization utilization gates (fractions of the limit)
pub const OPTIMIZE_MIN_UTILIZATION: f64 = 0.80;
pub const SUSPEND_INACTIVE_TRIGGER: f64 = 0.85;
pub const SUSPEND_INACTIVE_TARGET: f64 = 0.90;
pub const REDUCE_NON_ESSENTIAL_TRIGGER: f64 = 0.90;
pub const REDUCE_NON_ESSENTIAL_TARGET: f64 = 0.85;
pub const AGGRESSIVE_SUSPEND_TRIGGER: f64 = 0.95;
pub const AGGRESSIVE_SUSPEND_TARGET: f64 = 0.80;

/// Idle time after which a tab counts as inactive for memory optimization
pub const INACTIVE_TAB_IDLE_SEC: i64 = 10 * 60;

/// Fraction of the current footprint kept when reducing a non-essential tab
pub const NON_ESSENTIAL_REDUCTION_FACTOR: f64 = 0.7;

/// Hybrid strategy: suspend when the combined score exceeds this
pub const HYBRID_SUSPEND_SCORE: f64 = 0.7;

/// Hybrid strategy: memory score reaches 1.0 at this footprint (MB)
pub const HYBRID_MEMORY_REFERENCE_MB: f64 = 512.0;

/// LRU strategy: fraction of eligible tabs suspended per cycle and bounds
pub const LRU_SUSPEND_FRACTION: f64 = 0.1;
pub const LRU_MIN_PER_CYCLE: usize = 1;
pub const LRU_MAX_PER_CYCLE: usize = 3;

/// Relevance bonus for pinned tabs in search ranking (milliseconds)
pub const PINNED_RELEVANCE_BONUS_MS: i64 = 1_000_000_000_000;

/// Current space bundle format version
pub const SPACE_BUNDLE_VERSION: u32 = 1;

/// Name of the space that always exists
pub const DEFAULT_SPACE_NAME: &str = "Default";
