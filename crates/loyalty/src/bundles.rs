//! Bundle savings and the featured "best value" pick.

use rewards_core::Bundle;
use tracing::warn;

/// Bundles saving at least this percent may be featured.
pub const FEATURED_MIN_SAVINGS_PERCENT: u32 = 25;

/// Dollar savings, rounded to cents.
pub fn savings_of(original_price: f64, bundle_price: f64) -> f64 {
    ((original_price - bundle_price) * 100.0).round() / 100.0
}

/// Savings as a whole percent of the original price.
pub fn savings_percent_of(original_price: f64, bundle_price: f64) -> u32 {
    if original_price <= 0.0 {
        return 0;
    }
    (savings_of(original_price, bundle_price) / original_price * 100.0).round() as u32
}

/// Recompute derived savings. Bundles whose prices break
/// `0 <= bundle_price <= original_price` are dropped.
pub fn normalize(bundle: Bundle) -> Option<Bundle> {
    let valid = bundle.original_price.is_finite()
        && bundle.bundle_price.is_finite()
        && bundle.bundle_price >= 0.0
        && bundle.bundle_price <= bundle.original_price;
    if !valid {
        warn!(
            bundle_id = %bundle.id,
            original = bundle.original_price,
            price = bundle.bundle_price,
            "Dropping bundle with invalid pricing"
        );
        return None;
    }

    Some(Bundle {
        savings: savings_of(bundle.original_price, bundle.bundle_price),
        savings_percent: savings_percent_of(bundle.original_price, bundle.bundle_price),
        ..bundle
    })
}

pub fn normalize_all(bundles: Vec<Bundle>) -> Vec<Bundle> {
    bundles.into_iter().filter_map(normalize).collect()
}

/// Highest savings percent; on ties the earliest bundle wins.
pub fn featured(bundles: &[Bundle]) -> Option<&Bundle> {
    bundles.iter().fold(None, |best, b| match best {
        Some(current) if b.savings_percent <= current.savings_percent => Some(current),
        _ => Some(b),
    })
}

pub fn is_featurable(bundle: &Bundle) -> bool {
    bundle.savings_percent >= FEATURED_MIN_SAVINGS_PERCENT
}
