pub mod clock;
pub mod event_publisher;
pub mod process_repository;
pub mod process_substrate;
pub mod snapshot_store;

pub use clock::Clock;
pub use event_publisher::{EventPublisher, LifecycleEvent, SuspendReason};
pub use process_repository::ProcessRepository;
pub use process_substrate::{ProcessSubstrate, SpawnConfig, SpawnHandle};
pub use snapshot_store::{SnapshotStore, TabSnapshot};

#[cfg(test)]
pub use process_substrate::MockProcessSubstrate;
#[cfg(test)]
pub use snapshot_store::MockSnapshotStore;
