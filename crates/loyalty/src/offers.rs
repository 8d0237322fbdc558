//! Matching promotional offers against a product.

use chrono::{DateTime, Utc};
use rewards_core::{Offer, OfferType, Product};

/// First live BOGO offer covering the product's category, in list order.
pub fn match_bogo<'a>(offers: &'a [Offer], product: &Product) -> Option<&'a Offer> {
    match_bogo_at(offers, product, Utc::now())
}

/// `match_bogo` evaluated at a fixed instant.
pub fn match_bogo_at<'a>(
    offers: &'a [Offer],
    product: &Product,
    now: DateTime<Utc>,
) -> Option<&'a Offer> {
    let category = product.category.as_deref()?;
    offers.iter().find(|o| {
        o.offer_type == OfferType::Bogo && o.is_live_at(now) && o.applies_to(category)
    })
}

/// Every live offer, of any type, covering `category`.
pub fn offers_for_category<'a>(offers: &'a [Offer], category: &str) -> Vec<&'a Offer> {
    let now = Utc::now();
    offers
        .iter()
        .filter(|o| o.is_live_at(now) && o.applies_to(category))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn offer(id: &str, offer_type: OfferType, category: &str) -> Offer {
        Offer {
            id: id.to_string(),
            offer_type,
            title: String::new(),
            description: String::new(),
            product_category: category.to_string(),
            discount_percent: 100,
            min_quantity: 1,
            valid_until: None,
            active: true,
        }
    }

    fn product(category: Option<&str>) -> Product {
        Product {
            id: "p1".to_string(),
            name: "Soap".to_string(),
            category: category.map(str::to_string),
        }
    }

    #[test]
    fn test_match_by_category() {
        let offers = vec![offer("sea", OfferType::Bogo, "Sea Moss")];
        let found = match_bogo(&offers, &product(Some("Sea Moss")));
        assert_eq!(found.map(|o| o.id.as_str()), Some("sea"));
        assert!(match_bogo(&offers, &product(Some("Other"))).is_none());
    }

    #[test]
    fn test_all_category_matches_everything() {
        let offers = vec![offer("any", OfferType::Bogo, "All")];
        assert!(match_bogo(&offers, &product(Some("Kush"))).is_some());
    }

    #[test]
    fn test_first_match_wins() {
        let offers = vec![
            offer("discount", OfferType::Discount, "All"),
            offer("any", OfferType::Bogo, "All"),
            offer("sea", OfferType::Bogo, "Sea Moss"),
        ];
        let found = match_bogo(&offers, &product(Some("Sea Moss"))).unwrap();
        assert_eq!(found.id, "any");
    }

    #[test]
    fn test_skips_inactive_and_expired() {
        let now = Utc::now();
        let mut inactive = offer("inactive", OfferType::Bogo, "All");
        inactive.active = false;
        let mut expired = offer("expired", OfferType::Bogo, "All");
        expired.valid_until = Some(now - Duration::hours(1));
        let live = offer("live", OfferType::Bogo, "All");

        let offers = vec![inactive, expired, live];
        let found = match_bogo_at(&offers, &product(Some("Pink")), now).unwrap();
        assert_eq!(found.id, "live");
    }

    #[test]
    fn test_no_match_cases() {
        assert!(match_bogo(&[], &product(Some("Sea Moss"))).is_none());
        let offers = vec![offer("any", OfferType::Bogo, "All")];
        assert!(match_bogo(&offers, &product(None)).is_none());
    }

    #[test]
    fn test_offers_for_category() {
        let offers = vec![
            offer("discount", OfferType::Discount, "Kush"),
            offer("any", OfferType::Bogo, "All"),
            offer("sea", OfferType::Bogo, "Sea Moss"),
        ];
        let ids: Vec<&str> = offers_for_category(&offers, "Kush")
            .iter()
            .map(|o| o.id.as_str())
            .collect();
        assert_eq!(ids, vec!["discount", "any"]);
    }
}
