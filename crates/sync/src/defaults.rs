//! Static offers and bundles shown when the remote catalog can't be reached.

use chrono::{Duration, Utc};
use rewards_core::{Bundle, BundleItem, Offer, OfferType};
use rewards_loyalty::bundles;

pub fn default_offers() -> Vec<Offer> {
    let now = Utc::now();
    vec![
        Offer {
            id: "bogo-seamoss".to_string(),
            offer_type: OfferType::Bogo,
            title: "Buy 1 Get 1 FREE".to_string(),
            description: "Sea Moss Soap - Buy one, get one free!".to_string(),
            product_category: "Sea Moss".to_string(),
            discount_percent: 100,
            min_quantity: 1,
            valid_until: Some(now + Duration::days(30)),
            active: true,
        },
        Offer {
            id: "bogo-any".to_string(),
            offer_type: OfferType::Bogo,
            title: "Weekend Special".to_string(),
            description: "Buy any 2 soaps, get the 3rd 50% off!".to_string(),
            product_category: "All".to_string(),
            discount_percent: 50,
            min_quantity: 2,
            valid_until: Some(now + Duration::days(7)),
            active: true,
        },
    ]
}

fn item(name: &str, quantity: u32, original_price: f64) -> BundleItem {
    BundleItem {
        name: name.to_string(),
        quantity,
        original_price,
    }
}

fn bundle(
    id: &str,
    name: &str,
    description: &str,
    items: Vec<BundleItem>,
    original_price: f64,
    bundle_price: f64,
    is_customizable: bool,
) -> Bundle {
    Bundle {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        items,
        original_price,
        bundle_price,
        savings: 0.0,
        savings_percent: 0,
        is_customizable,
        active: true,
    }
}

pub fn default_bundles() -> Vec<Bundle> {
    bundles::normalize_all(vec![
        bundle(
            "bundle-sampler",
            "Sisters Sampler Bundle",
            "Try our best sellers! Includes Pink Soap, Kush Soap, and Sea Moss Soap.",
            vec![
                item("Pink Soap", 1, 12.99),
                item("Kush Soap", 1, 12.99),
                item("Sea Moss Soap", 1, 14.99),
            ],
            40.97,
            32.99,
            false,
        ),
        bundle(
            "bundle-seamoss-3",
            "Sea Moss Triple Pack",
            "Stock up on our popular Sea Moss Soap! 3 bars at a great price.",
            vec![item("Sea Moss Soap", 3, 44.97)],
            44.97,
            36.99,
            false,
        ),
        bundle(
            "bundle-mix-10",
            "Mix & Match 10-Pack",
            "Choose any 10 soaps and save big! Perfect for gifts or stocking up.",
            vec![item("Any Soap (Your Choice)", 10, 129.90)],
            129.90,
            89.99,
            true,
        ),
    ])
}
