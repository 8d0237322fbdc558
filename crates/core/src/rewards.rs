//! Rewards program domain types: purchase-count tiers, points balance,
//! the free-gift cycle, and the promotional offers and bundles shown
//! alongside them.
//!
//! Wire and cache representations use camelCase field names so the same
//! shapes round-trip between the remote authority and the local cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Purchases per free gift unless configured otherwise.
pub const DEFAULT_FREE_GIFT_THRESHOLD: u32 = 10;

/// Category value that matches every product.
pub const ALL_CATEGORIES: &str = "All";

// ─── Tier System ────────────────────────────────────────────────────────────

/// Membership tiers, ordered by ascending purchase threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Tier {
    /// Entry level. 1x points.
    Bronze,
    /// 5 purchases. 1.5x points.
    Silver,
    /// 10 purchases. 2x points.
    Gold,
    /// 20 purchases. 3x points.
    Platinum,
}

impl Tier {
    /// All tiers from lowest to highest.
    pub const ALL: [Tier; 4] = [Tier::Bronze, Tier::Silver, Tier::Gold, Tier::Platinum];

    /// Lifetime purchase count at which this tier begins.
    pub fn min_purchases(&self) -> u32 {
        match self {
            Tier::Bronze => 0,
            Tier::Silver => 5,
            Tier::Gold => 10,
            Tier::Platinum => 20,
        }
    }

    /// Points multiplier for purchases made while in this tier.
    pub fn points_multiplier(&self) -> f64 {
        match self {
            Tier::Bronze => 1.0,
            Tier::Silver => 1.5,
            Tier::Gold => 2.0,
            Tier::Platinum => 3.0,
        }
    }

    /// The tier above this one, if any.
    pub fn next(&self) -> Option<Tier> {
        match self {
            Tier::Bronze => Some(Tier::Silver),
            Tier::Silver => Some(Tier::Gold),
            Tier::Gold => Some(Tier::Platinum),
            Tier::Platinum => None,
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Tier::Bronze => "Bronze",
            Tier::Silver => "Silver",
            Tier::Gold => "Gold",
            Tier::Platinum => "Platinum",
        }
    }
}

impl Default for Tier {
    fn default() -> Self {
        Tier::Bronze
    }
}

// ─── Rewards Profile ────────────────────────────────────────────────────────

/// Rewards state for one authenticated user.
///
/// `tier` and `purchases_until_free_gift` are derived from `total_purchases`
/// and are only ever written by the points ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RewardsProfile {
    /// Redeemable balance.
    pub points: u64,
    /// Every point ever earned. Redemption does not reduce it.
    pub lifetime_points: u64,
    pub total_purchases: u32,
    pub tier: Tier,
    pub free_gifts_earned: u32,
    pub free_gifts_redeemed: u32,
    pub purchases_until_free_gift: u32,
    pub last_updated: Option<DateTime<Utc>>,
}

impl RewardsProfile {
    /// The all-zero profile for a gift cycle of `threshold` purchases.
    pub fn zero(threshold: u32) -> Self {
        Self {
            points: 0,
            lifetime_points: 0,
            total_purchases: 0,
            tier: Tier::Bronze,
            free_gifts_earned: 0,
            free_gifts_redeemed: 0,
            purchases_until_free_gift: threshold.max(1),
            last_updated: None,
        }
    }

    /// Gifts earned but not yet redeemed.
    pub fn available_free_gifts(&self) -> u32 {
        self.free_gifts_earned.saturating_sub(self.free_gifts_redeemed)
    }

    /// Whether every counter still holds its zero value.
    pub fn is_zero(&self) -> bool {
        self.points == 0
            && self.lifetime_points == 0
            && self.total_purchases == 0
            && self.free_gifts_earned == 0
            && self.free_gifts_redeemed == 0
    }
}

impl Default for RewardsProfile {
    fn default() -> Self {
        Self::zero(DEFAULT_FREE_GIFT_THRESHOLD)
    }
}

// ─── Offers ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OfferType {
    /// Buy one, get one.
    Bogo,
    Discount,
    Bundle,
    #[serde(other)]
    Other,
}

/// A promotional offer. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offer {
    pub id: String,
    #[serde(rename = "type")]
    pub offer_type: OfferType,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// `"All"` or a single product category.
    #[serde(default = "default_category")]
    pub product_category: String,
    #[serde(default)]
    pub discount_percent: u32,
    #[serde(default = "default_min_quantity")]
    pub min_quantity: u32,
    #[serde(default)]
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl Offer {
    /// Whether the offer covers products in `category`.
    pub fn applies_to(&self, category: &str) -> bool {
        self.product_category == ALL_CATEGORIES || self.product_category == category
    }

    /// Active and not past its expiry at `now`.
    pub fn is_live_at(&self, now: DateTime<Utc>) -> bool {
        self.active && self.valid_until.map(|v| now <= v).unwrap_or(true)
    }
}

/// The slice of a catalog product the offer matcher needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
}

// ─── Bundles ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleItem {
    pub name: String,
    #[serde(default = "default_min_quantity")]
    pub quantity: u32,
    #[serde(default)]
    pub original_price: f64,
}

/// A fixed-price group of products.
///
/// `savings` and `savings_percent` are recomputed from the two prices when a
/// bundle enters the client; values sent by the remote are not trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub items: Vec<BundleItem>,
    pub original_price: f64,
    pub bundle_price: f64,
    #[serde(default)]
    pub savings: f64,
    #[serde(default)]
    pub savings_percent: u32,
    #[serde(default)]
    pub is_customizable: bool,
    #[serde(default = "default_true")]
    pub active: bool,
}

// ─── History & Gift Options ─────────────────────────────────────────────────

/// One entry in the remote rewards history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HistoryEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub points: i64,
    pub description: String,
    pub date: Option<DateTime<Utc>>,
}

/// A product that can be chosen when redeeming a free gift.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FreeGiftOption {
    pub id: String,
    pub name: String,
    pub description: String,
    pub image: Option<String>,
}

fn default_category() -> String {
    ALL_CATEGORIES.to_string()
}
fn default_min_quantity() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
