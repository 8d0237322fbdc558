//! The repeating "one free gift every N purchases" counter.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GiftCycle {
    /// Always in `1..=threshold`. Equal to `threshold` right after a gift is
    /// earned and before the first purchase.
    pub purchases_until_gift: u32,
    pub gifts_earned: u32,
}

/// Gift cycle position after `total_purchases` purchases.
///
/// A zero threshold is treated as one.
pub fn cycle_of(total_purchases: u32, threshold: u32) -> GiftCycle {
    let threshold = threshold.max(1);
    GiftCycle {
        purchases_until_gift: threshold - (total_purchases % threshold),
        gifts_earned: total_purchases / threshold,
    }
}

impl GiftCycle {
    /// A gift was earned by the purchase that completed this cycle.
    pub fn just_completed(&self, threshold: u32) -> bool {
        self.gifts_earned > 0 && self.purchases_until_gift == threshold.max(1)
    }

    /// Progress through the current cycle, 0.0 to below 100.0.
    pub fn progress_percent(&self, threshold: u32) -> f64 {
        let threshold = threshold.max(1);
        f64::from(threshold - self.purchases_until_gift) / f64::from(threshold) * 100.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_purchases() {
        let c = cycle_of(0, 10);
        assert_eq!(c.purchases_until_gift, 10);
        assert_eq!(c.gifts_earned, 0);
        assert!(!c.just_completed(10));
    }

    #[test]
    fn test_mid_cycle() {
        let c = cycle_of(13, 10);
        assert_eq!(c.purchases_until_gift, 7);
        assert_eq!(c.gifts_earned, 1);
        assert!((c.progress_percent(10) - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_exact_multiple() {
        let c = cycle_of(20, 10);
        assert_eq!(c.purchases_until_gift, 10);
        assert_eq!(c.gifts_earned, 2);
        assert!(c.just_completed(10));
        assert_eq!(c.progress_percent(10), 0.0);
    }

    #[test]
    fn test_bounds_hold_for_all_counts() {
        for threshold in [1, 3, 10] {
            for total in 0..100 {
                let c = cycle_of(total, threshold);
                assert!(c.purchases_until_gift > 0);
                assert!(c.purchases_until_gift <= threshold);
                assert_eq!(
                    c.purchases_until_gift == threshold,
                    total % threshold == 0
                );
            }
        }
    }

    #[test]
    fn test_zero_threshold() {
        let c = cycle_of(7, 0);
        assert_eq!(c.purchases_until_gift, 1);
        assert_eq!(c.gifts_earned, 7);
    }
}
