//! Pure rewards arithmetic: tiers, the free-gift cycle, the points ledger,
//! offer matching and bundle savings. Nothing in this crate performs I/O.

#![warn(clippy::unwrap_used)]

pub mod bundles;
pub mod cycle;
pub mod ledger;
pub mod offers;
pub mod tier;

pub use cycle::{cycle_of, GiftCycle};
pub use ledger::{Accrual, PointsLedger, PointsRedemption};
pub use tier::{tier_of, tier_progress, TierProgress};
