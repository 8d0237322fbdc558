#![warn(clippy::unwrap_used)]

pub mod client;
pub mod local;
pub mod offline;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod wire;

pub use client::{HttpRewardsClient, RemoteRewards};
pub use local::{FileStore, LocalStore, MemoryStore};
pub use offline::OfflineRemote;
