//! In-process stand-ins for the remote authority and local storage, used by
//! tests of the sync layer. Compiled only for tests or with the `testing`
//! feature.

use crate::client::RemoteRewards;
use crate::local::{LocalStore, MemoryStore};
use crate::wire::{AccrualDelta, BogoApplication, RemoteProfile};
use async_trait::async_trait;
use parking_lot::Mutex;
use rewards_core::rewards::{FreeGiftOption, HistoryEntry};
use rewards_core::{Bundle, Offer, RewardsError, RewardsResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Debug, Clone, PartialEq)]
pub enum RemoteCall {
    FetchProfile,
    Update(AccrualDelta),
    RedeemGift,
    RedeemPoints(u64),
    ListOffers,
    ListBundles,
    BundleDetails(String),
    ApplyBogo { offer_id: String, product_id: String },
    History,
    FreeGiftOptions,
}

impl RemoteCall {
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            RemoteCall::Update(_) | RemoteCall::RedeemGift | RemoteCall::RedeemPoints(_)
        )
    }
}

/// A remote authority kept in memory. Writes are applied to its own copy of
/// the profile, so a later fetch reflects them the way the real backend would.
pub struct ScriptedRemote {
    profile: Mutex<RemoteProfile>,
    offers: Mutex<Vec<Offer>>,
    bundles: Mutex<Vec<Bundle>>,
    history: Mutex<Vec<HistoryEntry>>,
    reachable: AtomicBool,
    calls: Mutex<Vec<RemoteCall>>,
    write_gate: Mutex<Option<Arc<Semaphore>>>,
    update_delay: Duration,
}

impl ScriptedRemote {
    pub fn new(profile: RemoteProfile) -> Self {
        Self {
            profile: Mutex::new(profile),
            offers: Mutex::new(Vec::new()),
            bundles: Mutex::new(Vec::new()),
            history: Mutex::new(Vec::new()),
            reachable: AtomicBool::new(true),
            calls: Mutex::new(Vec::new()),
            write_gate: Mutex::new(None),
            update_delay: Duration::ZERO,
        }
    }

    /// A remote that refuses every call.
    pub fn unreachable() -> Self {
        let remote = Self::new(RemoteProfile::default());
        remote.set_reachable(false);
        remote
    }

    pub fn with_offers(self, offers: Vec<Offer>) -> Self {
        *self.offers.lock() = offers;
        self
    }

    pub fn with_bundles(self, bundles: Vec<Bundle>) -> Self {
        *self.bundles.lock() = bundles;
        self
    }

    pub fn with_history(self, history: Vec<HistoryEntry>) -> Self {
        *self.history.lock() = history;
        self
    }

    /// Make every `update_rewards` call take at least `delay`.
    pub fn with_update_delay(mut self, delay: Duration) -> Self {
        self.update_delay = delay;
        self
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn profile(&self) -> RemoteProfile {
        self.profile.lock().clone()
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().clone()
    }

    pub fn write_calls(&self) -> Vec<RemoteCall> {
        self.calls.lock().iter().filter(|c| c.is_write()).cloned().collect()
    }

    /// Park every subsequent write until `release_writes` is called.
    pub fn hold_writes(&self) {
        *self.write_gate.lock() = Some(Arc::new(Semaphore::new(0)));
    }

    pub fn release_writes(&self) {
        if let Some(gate) = self.write_gate.lock().take() {
            gate.close();
        }
    }

    fn record(&self, call: RemoteCall) -> RewardsResult<()> {
        self.calls.lock().push(call);
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RewardsError::RemoteUnavailable("connection refused".to_string()))
        }
    }

    async fn write(&self, call: RemoteCall) -> RewardsResult<()> {
        self.record(call)?;
        let gate = self.write_gate.lock().clone();
        if let Some(gate) = gate {
            // Closed on release; the error just means "go ahead".
            let _ = gate.acquire().await;
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteRewards for ScriptedRemote {
    async fn fetch_profile(&self) -> RewardsResult<RemoteProfile> {
        self.record(RemoteCall::FetchProfile)?;
        Ok(self.profile())
    }

    async fn update_rewards(&self, delta: &AccrualDelta) -> RewardsResult<()> {
        self.write(RemoteCall::Update(delta.clone())).await?;
        if !self.update_delay.is_zero() {
            tokio::time::sleep(self.update_delay).await;
        }
        let mut profile = self.profile.lock();
        profile.points += delta.points_earned;
        profile.lifetime_points += delta.points_earned;
        profile.total_purchases += delta.purchase_count;
        profile.free_gifts_earned = profile.total_purchases / 10;
        Ok(())
    }

    async fn redeem_free_gift(&self) -> RewardsResult<()> {
        self.write(RemoteCall::RedeemGift).await?;
        self.profile.lock().free_gifts_redeemed += 1;
        Ok(())
    }

    async fn redeem_points(&self, points: u64) -> RewardsResult<f64> {
        self.write(RemoteCall::RedeemPoints(points)).await?;
        let mut profile = self.profile.lock();
        if points > profile.points {
            return Err(RewardsError::RemoteRejected {
                status: 400,
                body: format!("insufficient points: {} available", profile.points),
            });
        }
        profile.points -= points;
        Ok(points as f64 / 100.0)
    }

    async fn list_offers(&self) -> RewardsResult<Vec<Offer>> {
        self.record(RemoteCall::ListOffers)?;
        Ok(self.offers.lock().clone())
    }

    async fn list_bundles(&self) -> RewardsResult<Vec<Bundle>> {
        self.record(RemoteCall::ListBundles)?;
        Ok(self.bundles.lock().clone())
    }

    async fn bundle_details(&self, bundle_id: &str) -> RewardsResult<Bundle> {
        self.record(RemoteCall::BundleDetails(bundle_id.to_string()))?;
        self.bundles
            .lock()
            .iter()
            .find(|b| b.id == bundle_id)
            .cloned()
            .ok_or_else(|| RewardsError::RemoteRejected {
                status: 404,
                body: format!("bundle {bundle_id} not found"),
            })
    }

    async fn apply_bogo(
        &self,
        offer_id: &str,
        product_id: &str,
    ) -> RewardsResult<BogoApplication> {
        self.record(RemoteCall::ApplyBogo {
            offer_id: offer_id.to_string(),
            product_id: product_id.to_string(),
        })?;
        Ok(BogoApplication {
            success: true,
            message: Some(format!("{offer_id} applied to {product_id}")),
            discount: None,
        })
    }

    async fn history(&self) -> RewardsResult<Vec<HistoryEntry>> {
        self.record(RemoteCall::History)?;
        Ok(self.history.lock().clone())
    }

    async fn free_gift_options(&self) -> RewardsResult<Vec<FreeGiftOption>> {
        self.record(RemoteCall::FreeGiftOptions)?;
        Ok(Vec::new())
    }
}

/// A local store whose writes and removals can be made to fail, as on a
/// full or read-only disk.
#[derive(Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    fail_writes: AtomicBool,
    fail_removes: AtomicBool,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_removes(&self, fail: bool) {
        self.fail_removes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl LocalStore for FlakyStore {
    async fn get(&self, key: &str) -> RewardsResult<Option<String>> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: &str) -> RewardsResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RewardsError::Storage("no space left on device".to_string()));
        }
        self.inner.put(key, value).await
    }

    async fn remove(&self, key: &str) -> RewardsResult<()> {
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(RewardsError::Storage("read-only file system".to_string()));
        }
        self.inner.remove(key).await
    }
}
