//! A remote that is never reachable, for running against the local cache only.

use crate::client::RemoteRewards;
use crate::wire::{AccrualDelta, BogoApplication, RemoteProfile};
use async_trait::async_trait;
use rewards_core::rewards::{FreeGiftOption, HistoryEntry};
use rewards_core::{Bundle, Offer, RewardsError, RewardsResult};

/// Answers every call with `RemoteUnavailable`, so loads fall back to the
/// cache and writes stay local.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineRemote;

fn offline<T>() -> RewardsResult<T> {
    Err(RewardsError::RemoteUnavailable("offline mode".to_string()))
}

#[async_trait]
impl RemoteRewards for OfflineRemote {
    async fn fetch_profile(&self) -> RewardsResult<RemoteProfile> {
        offline()
    }

    async fn update_rewards(&self, _delta: &AccrualDelta) -> RewardsResult<()> {
        offline()
    }

    async fn redeem_free_gift(&self) -> RewardsResult<()> {
        offline()
    }

    async fn redeem_points(&self, _points: u64) -> RewardsResult<f64> {
        offline()
    }

    async fn list_offers(&self) -> RewardsResult<Vec<Offer>> {
        offline()
    }

    async fn list_bundles(&self) -> RewardsResult<Vec<Bundle>> {
        offline()
    }

    async fn bundle_details(&self, _bundle_id: &str) -> RewardsResult<Bundle> {
        offline()
    }

    async fn apply_bogo(
        &self,
        _offer_id: &str,
        _product_id: &str,
    ) -> RewardsResult<BogoApplication> {
        offline()
    }

    async fn history(&self) -> RewardsResult<Vec<HistoryEntry>> {
        offline()
    }

    async fn free_gift_options(&self) -> RewardsResult<Vec<FreeGiftOption>> {
        offline()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_every_call_is_unavailable() {
        let remote = OfflineRemote;
        assert!(matches!(
            remote.fetch_profile().await,
            Err(RewardsError::RemoteUnavailable(_))
        ));
        assert!(remote.redeem_points(100).await.unwrap_err().is_remote());
        assert!(remote.list_offers().await.is_err());
        assert!(remote.apply_bogo("bogo-any", "p1").await.is_err());
    }
}
