//! Purchase count → membership tier.

use rewards_core::Tier;
use serde::Serialize;

/// The highest tier whose threshold does not exceed `total_purchases`.
pub fn tier_of(total_purchases: u32) -> Tier {
    Tier::ALL
        .iter()
        .rev()
        .copied()
        .find(|t| total_purchases >= t.min_purchases())
        .unwrap_or(Tier::Bronze)
}

/// Where a purchase count sits relative to the next tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TierProgress {
    pub tier: Tier,
    /// `None` at the top tier.
    pub next_tier: Option<Tier>,
    pub purchases_to_next: Option<u32>,
}

pub fn tier_progress(total_purchases: u32) -> TierProgress {
    let tier = tier_of(total_purchases);
    let next_tier = tier.next();
    TierProgress {
        tier,
        next_tier,
        purchases_to_next: next_tier.map(|n| n.min_purchases() - total_purchases),
    }
}
