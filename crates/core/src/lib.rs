#![warn(clippy::unwrap_used)]

pub mod config;
pub mod error;
pub mod event_bus;
pub mod rewards;

pub use config::AppConfig;
pub use error::{LedgerError, RewardsError, RewardsResult};
pub use rewards::{Bundle, BundleItem, Offer, OfferType, Product, RewardsProfile, Tier};
