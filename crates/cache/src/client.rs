//! HTTP client for the remote rewards authority.
//!
//! Transport failures surface as `RemoteUnavailable`, non-2xx answers as
//! `RemoteRejected`. Retrying is left to the layer above; nothing here retries.

use crate::wire::{
    decode_list, decode_object, AccrualDelta, ApplyBogoRequest, BogoApplication,
    DiscountResponse, RedeemPointsRequest, RemoteProfile, SuccessResponse,
};
use async_trait::async_trait;
use rewards_core::config::RemoteConfig;
use rewards_core::rewards::{FreeGiftOption, HistoryEntry};
use rewards_core::{Bundle, Offer, RewardsError, RewardsResult};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The remote rewards API as consumed by the sync layer.
#[async_trait]
pub trait RemoteRewards: Send + Sync {
    async fn fetch_profile(&self) -> RewardsResult<RemoteProfile>;
    async fn update_rewards(&self, delta: &AccrualDelta) -> RewardsResult<()>;
    async fn redeem_free_gift(&self) -> RewardsResult<()>;
    /// Returns the dollar discount granted by the remote.
    async fn redeem_points(&self, points: u64) -> RewardsResult<f64>;
    async fn list_offers(&self) -> RewardsResult<Vec<Offer>>;
    async fn list_bundles(&self) -> RewardsResult<Vec<Bundle>>;
    async fn bundle_details(&self, bundle_id: &str) -> RewardsResult<Bundle>;
    async fn apply_bogo(&self, offer_id: &str, product_id: &str)
        -> RewardsResult<BogoApplication>;
    async fn history(&self) -> RewardsResult<Vec<HistoryEntry>>;
    async fn free_gift_options(&self) -> RewardsResult<Vec<FreeGiftOption>>;
}

/// `reqwest`-backed implementation of [`RemoteRewards`].
#[derive(Clone)]
pub struct HttpRewardsClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpRewardsClient {
    pub fn new(config: &RemoteConfig) -> RewardsResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| RewardsError::Config(format!("HTTP client: {e}")))?;

        let base_url = config.base_url.trim_end_matches('/').to_string();
        info!(base_url = %base_url, timeout_ms = config.timeout_ms, "Rewards API client ready");

        Ok(Self {
            http,
            base_url,
            auth_token: config.auth_token.clone(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str) -> RewardsResult<Value> {
        let mut request = self.http.get(self.url(path));
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await.map_err(|e| transport_error(path, e))?;
        self.check_response_json(path, response).await
    }

    async fn post_json<B: Serialize + Sync>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> RewardsResult<Value> {
        let mut request = self.http.post(self.url(path));
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }
        let response = request.send().await.map_err(|e| transport_error(path, e))?;
        self.check_response_json(path, response).await
    }

    /// Check response status and parse the body. An empty body parses as null.
    async fn check_response_json(
        &self,
        path: &str,
        response: reqwest::Response,
    ) -> RewardsResult<Value> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(path, e))?;

        if !status.is_success() {
            metrics::counter!("rewards.remote.rejected").increment(1);
            if status.as_u16() == 401 {
                warn!(path = path, "Rewards API rejected credentials (401)");
            }
            return Err(RewardsError::RemoteRejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(path = path, status = status.as_u16(), bytes = body.len(), "Rewards API response");
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| RewardsError::RemoteUnavailable(format!("{path}: invalid JSON: {e}")))
    }

    async fn post_expect_success<B: Serialize + Sync>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> RewardsResult<()> {
        let value = self.post_json(path, body).await?;
        let response: SuccessResponse = if value.is_null() {
            SuccessResponse::default()
        } else {
            decode_object(value)?
        };
        match response.success {
            Some(false) => Err(RewardsError::RemoteRejected {
                status: 200,
                body: response.message.unwrap_or_default(),
            }),
            _ => Ok(()),
        }
    }
}

fn transport_error(path: &str, e: reqwest::Error) -> RewardsError {
    metrics::counter!("rewards.remote.unavailable").increment(1);
    RewardsError::RemoteUnavailable(format!("{path}: {e}"))
}

#[async_trait]
impl RemoteRewards for HttpRewardsClient {
    async fn fetch_profile(&self) -> RewardsResult<RemoteProfile> {
        decode_object(self.get_json("/api/rewards/user").await?)
    }

    async fn update_rewards(&self, delta: &AccrualDelta) -> RewardsResult<()> {
        self.post_expect_success("/api/rewards/update", Some(delta))
            .await
    }

    async fn redeem_free_gift(&self) -> RewardsResult<()> {
        self.post_expect_success::<()>("/api/rewards/redeem-gift", None)
            .await
    }

    async fn redeem_points(&self, points: u64) -> RewardsResult<f64> {
        let body = RedeemPointsRequest { points };
        let value = self
            .post_json("/api/rewards/redeem-points", Some(&body))
            .await?;
        let response: DiscountResponse = decode_object(value)?;
        Ok(response.discount)
    }

    async fn list_offers(&self) -> RewardsResult<Vec<Offer>> {
        decode_list(self.get_json("/api/rewards/offers").await?)
    }

    async fn list_bundles(&self) -> RewardsResult<Vec<Bundle>> {
        decode_list(self.get_json("/api/rewards/bundles").await?)
    }

    async fn bundle_details(&self, bundle_id: &str) -> RewardsResult<Bundle> {
        let path = format!("/api/rewards/bundles/{bundle_id}");
        decode_object(self.get_json(&path).await?)
    }

    async fn apply_bogo(
        &self,
        offer_id: &str,
        product_id: &str,
    ) -> RewardsResult<BogoApplication> {
        let body = ApplyBogoRequest {
            offer_id,
            product_id,
        };
        let value = self.post_json("/api/rewards/apply-bogo", Some(&body)).await?;
        if value.is_null() {
            return Ok(BogoApplication {
                success: true,
                ..Default::default()
            });
        }
        decode_object(value)
    }

    async fn history(&self) -> RewardsResult<Vec<HistoryEntry>> {
        decode_list(self.get_json("/api/rewards/history").await?)
    }

    async fn free_gift_options(&self) -> RewardsResult<Vec<FreeGiftOption>> {
        decode_list(self.get_json("/api/rewards/free-gifts").await?)
    }
}
