//! Request/response bodies for the remote rewards API, and normalization of
//! the response envelopes it has used over time.
//!
//! The same endpoint may answer with a bare value, `{"data": ...}`,
//! `{"rewards": ...}`, or for lists `{"offers": [...]}` and similar. Nothing
//! outside this module sees those variants.

use rewards_core::{RewardsError, RewardsProfile, RewardsResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

static OBJECT_ENVELOPE_KEYS: [&str; 2] = ["data", "rewards"];
static LIST_ENVELOPE_KEYS: [&str; 6] = ["data", "offers", "bundles", "history", "gifts", "items"];

/// Stored counters as reported by `GET /api/rewards/user`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteProfile {
    pub points: u64,
    pub total_purchases: u32,
    pub free_gifts_earned: u32,
    pub free_gifts_redeemed: u32,
    pub lifetime_points: u64,
}

impl RemoteProfile {
    /// Counters copied onto a zero profile. Derived fields still need
    /// recomputing by the caller.
    pub fn into_profile(self, free_gift_threshold: u32) -> RewardsProfile {
        RewardsProfile {
            points: self.points,
            total_purchases: self.total_purchases,
            free_gifts_earned: self.free_gifts_earned,
            free_gifts_redeemed: self.free_gifts_redeemed,
            lifetime_points: self.lifetime_points,
            ..RewardsProfile::zero(free_gift_threshold)
        }
    }
}

/// Body of `POST /api/rewards/update`: only the delta of one purchase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccrualDelta {
    pub points_earned: u64,
    pub purchase_amount: f64,
    pub purchase_count: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RedeemPointsRequest {
    pub points: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyBogoRequest<'a> {
    pub offer_id: &'a str,
    pub product_id: &'a str,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SuccessResponse {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DiscountResponse {
    pub discount: f64,
}

/// Outcome of applying a BOGO offer to the cart on the remote side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BogoApplication {
    pub success: bool,
    pub message: Option<String>,
    pub discount: Option<f64>,
}

/// Decode a single object, unwrapping a `data`/`rewards` envelope if present.
pub fn decode_object<T: DeserializeOwned>(body: Value) -> RewardsResult<T> {
    let inner = match body {
        Value::Object(mut map) => {
            let wrapped = OBJECT_ENVELOPE_KEYS
                .iter()
                .find(|k| map.get(**k).map(Value::is_object).unwrap_or(false))
                .and_then(|k| map.remove(*k));
            wrapped.unwrap_or(Value::Object(map))
        }
        other => other,
    };
    serde_json::from_value(inner)
        .map_err(|e| RewardsError::RemoteUnavailable(format!("unexpected response shape: {e}")))
}

/// Decode a list, unwrapping a known envelope. Entries that fail to decode
/// are skipped rather than failing the whole list.
pub fn decode_list<T: DeserializeOwned>(body: Value) -> RewardsResult<Vec<T>> {
    let items = match body {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let key = LIST_ENVELOPE_KEYS
                .iter()
                .find(|k| map.get(**k).map(Value::is_array).unwrap_or(false));
            match key.and_then(|k| map.remove(*k)) {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(RewardsError::RemoteUnavailable(
                        "expected a list response".to_string(),
                    ))
                }
            }
        }
        Value::Null => Vec::new(),
        _ => {
            return Err(RewardsError::RemoteUnavailable(
                "expected a list response".to_string(),
            ))
        }
    };

    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!(error = %e, "Skipping malformed list entry");
                None
            }
        })
        .collect();
    if decoded.len() < total {
        metrics::counter!("rewards.remote.malformed_entries")
            .increment((total - decoded.len()) as u64);
    }
    Ok(decoded)
}
