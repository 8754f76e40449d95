use chrono::{DateTime, Utc};

/// Source of the current time, injected so idle-time policies are testable
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
