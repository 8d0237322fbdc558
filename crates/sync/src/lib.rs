#![warn(clippy::unwrap_used)]

pub mod coordinator;
pub mod defaults;
pub mod store;

pub use coordinator::{LoadStatus, Loaded, RemoteOp, SyncCoordinator, SyncState};
pub use store::{RewardsStore, StoreDeps};
