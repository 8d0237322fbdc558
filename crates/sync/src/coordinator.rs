//! Reconciles the on-device rewards cache with the remote authority.
//!
//! Reads are remote-first: a fresh remote profile is re-derived, written to
//! the cache and returned; when the remote is down the cache is returned as
//! stored, and when the cache is empty or corrupt the zero profile is.
//!
//! Writes are local-first: the new profile is persisted before the caller
//! sees it, and the delta is then queued for a single background writer that
//! sends to the remote in commit order. A failed send is logged and dropped.
//! The remote never gates a local write.

use chrono::Utc;
use parking_lot::Mutex;
use rewards_cache::wire::{AccrualDelta, BogoApplication};
use rewards_cache::{LocalStore, RemoteRewards};
use rewards_core::rewards::{FreeGiftOption, HistoryEntry};
use rewards_core::{Bundle, Offer, RewardsError, RewardsProfile, RewardsResult};
use rewards_loyalty::{bundles, PointsLedger};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

/// Lifecycle of the profile held by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Unloaded,
    Loading,
    /// Loaded from the remote.
    Ready,
    /// Loaded from the cache or zero defaults while the remote was down.
    ReadyStale,
}

impl SyncState {
    pub fn accepts_mutations(&self) -> bool {
        matches!(self, SyncState::Ready | SyncState::ReadyStale)
    }
}

/// Where a loaded value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadStatus {
    Fresh,
    Cached,
    /// Neither remote nor cache had it; defaults are in use.
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct Loaded {
    pub profile: RewardsProfile,
    pub status: LoadStatus,
}

/// A write to replay against the remote after the local write succeeded.
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteOp {
    Accrue(AccrualDelta),
    RedeemFreeGift,
    RedeemPoints(u64),
}

impl RemoteOp {
    fn name(&self) -> &'static str {
        match self {
            RemoteOp::Accrue(_) => "accrue",
            RemoteOp::RedeemFreeGift => "redeem_gift",
            RemoteOp::RedeemPoints(_) => "redeem_points",
        }
    }

    async fn send(&self, remote: &dyn RemoteRewards) -> RewardsResult<()> {
        match self {
            RemoteOp::Accrue(delta) => remote.update_rewards(delta).await,
            RemoteOp::RedeemFreeGift => remote.redeem_free_gift().await,
            RemoteOp::RedeemPoints(points) => {
                let discount = remote.redeem_points(*points).await?;
                debug!(points = points, discount = discount, "Remote confirmed redemption");
                Ok(())
            }
        }
    }
}

enum Outbound {
    Write(RemoteOp),
    Flush(oneshot::Sender<()>),
}

/// Background writer: sends queued ops strictly one after another.
async fn drain_outbox(remote: Arc<dyn RemoteRewards>, mut receiver: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(message) = receiver.recv().await {
        match message {
            Outbound::Write(op) => match op.send(remote.as_ref()).await {
                Ok(()) => debug!(op = op.name(), "Remote rewards sync complete"),
                Err(e) => {
                    metrics::counter!("rewards.sync.remote_failures").increment(1);
                    warn!(op = op.name(), error = %e, "Remote rewards sync failed, keeping local state");
                }
            },
            Outbound::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Remote sync writer stopped");
}

/// Sole owner of the local cache record.
pub struct SyncCoordinator {
    remote: Arc<dyn RemoteRewards>,
    local: Arc<dyn LocalStore>,
    ledger: PointsLedger,
    cache_key: String,
    state: Mutex<SyncState>,
    outbox: Mutex<Option<mpsc::UnboundedSender<Outbound>>>,
}

impl SyncCoordinator {
    pub fn new(
        remote: Arc<dyn RemoteRewards>,
        local: Arc<dyn LocalStore>,
        ledger: PointsLedger,
        cache_key: impl Into<String>,
    ) -> Self {
        Self {
            remote,
            local,
            ledger,
            cache_key: cache_key.into(),
            state: Mutex::new(SyncState::Unloaded),
            outbox: Mutex::new(None),
        }
    }

    pub fn state(&self) -> SyncState {
        *self.state.lock()
    }

    fn set_state(&self, next: SyncState) {
        let mut state = self.state.lock();
        if *state != next {
            debug!(from = ?*state, to = ?next, "Sync state transition");
            *state = next;
        }
    }

    // ─── Profile ────────────────────────────────────────────────────────────

    /// Load the profile. Never fails: infrastructure errors are absorbed here.
    pub async fn load(&self) -> Loaded {
        self.set_state(SyncState::Loading);

        match self.remote.fetch_profile().await {
            Ok(remote) => {
                let mut profile = self
                    .ledger
                    .derive(&remote.into_profile(self.ledger.free_gift_threshold()));
                profile.last_updated = Some(Utc::now());

                if let Err(e) = self.write_cache(&profile).await {
                    warn!(error = %e, "Failed to cache fresh rewards profile");
                }
                self.set_state(SyncState::Ready);
                info!(
                    points = profile.points,
                    total_purchases = profile.total_purchases,
                    tier = ?profile.tier,
                    "Rewards profile loaded from remote"
                );
                Loaded {
                    profile,
                    status: LoadStatus::Fresh,
                }
            }
            Err(remote_err) => {
                warn!(error = %remote_err, "Remote rewards fetch failed, falling back to cache");
                metrics::counter!("rewards.sync.cache_fallbacks").increment(1);

                let loaded = match self.read_cache().await {
                    Ok(Some(profile)) => Loaded {
                        profile,
                        status: LoadStatus::Cached,
                    },
                    Ok(None) => {
                        warn!("No cached rewards profile, rewards unavailable");
                        self.unavailable()
                    }
                    Err(e) => {
                        warn!(error = %e, "Cached rewards profile unusable, rewards unavailable");
                        self.unavailable()
                    }
                };
                self.set_state(SyncState::ReadyStale);
                loaded
            }
        }
    }

    fn unavailable(&self) -> Loaded {
        Loaded {
            profile: self.ledger.zero_profile(),
            status: LoadStatus::Unavailable,
        }
    }

    /// The cached profile, if any. Unparseable records are `MalformedCache`.
    pub async fn read_cache(&self) -> RewardsResult<Option<RewardsProfile>> {
        let Some(raw) = self.local.get(&self.cache_key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| RewardsError::MalformedCache(e.to_string()))
    }

    async fn write_cache(&self, profile: &RewardsProfile) -> RewardsResult<()> {
        let json = serde_json::to_string(profile)?;
        self.local.put(&self.cache_key, &json).await
    }

    /// Phase one of a mutation. A failure here means the mutation did not
    /// happen and is returned to the caller.
    pub async fn persist(&self, profile: &RewardsProfile) -> RewardsResult<()> {
        self.write_cache(profile).await.map_err(|e| {
            metrics::counter!("rewards.sync.local_write_failures").increment(1);
            warn!(error = %e, "Local rewards write failed");
            e
        })
    }

    /// Phase two of a mutation: queue `op` for the remote. Queued writes are
    /// sent one at a time in the order they were committed locally. Failures
    /// are logged and never retried.
    pub fn propagate(&self, op: RemoteOp) {
        if let Err(mpsc::error::SendError(Outbound::Write(op))) =
            self.outbox().send(Outbound::Write(op))
        {
            metrics::counter!("rewards.sync.remote_failures").increment(1);
            warn!(op = op.name(), "Remote sync writer stopped, dropping write");
        }
    }

    /// Sender half of the outbound queue, starting the writer on first use.
    fn outbox(&self) -> mpsc::UnboundedSender<Outbound> {
        let mut outbox = self.outbox.lock();
        if let Some(sender) = outbox.as_ref().filter(|s| !s.is_closed()) {
            return sender.clone();
        }
        let (sender, receiver) = mpsc::unbounded_channel();
        tokio::spawn(drain_outbox(self.remote.clone(), receiver));
        *outbox = Some(sender.clone());
        sender
    }

    /// Wait until every write queued so far has been sent.
    pub async fn flush(&self) {
        let Some(sender) = self.outbox.lock().clone() else {
            return;
        };
        let (done, wait) = oneshot::channel();
        if sender.send(Outbound::Flush(done)).is_ok() && wait.await.is_err() {
            warn!("Remote sync writer stopped before flush completed");
        }
    }

    /// Drop the cached record and return to `Unloaded`. When the record
    /// can't be removed it is overwritten with the zero profile instead, so
    /// no later load can fall back to it.
    pub async fn reset(&self) -> RewardsResult<()> {
        if let Err(remove_err) = self.local.remove(&self.cache_key).await {
            warn!(error = %remove_err, "Failed to remove rewards cache, overwriting with zero profile");
            self.write_cache(&self.ledger.zero_profile())
                .await
                .map_err(|e| {
                    metrics::counter!("rewards.sync.local_write_failures").increment(1);
                    warn!(error = %e, "Failed to overwrite rewards cache");
                    e
                })?;
        }
        self.set_state(SyncState::Unloaded);
        info!("Rewards cache cleared");
        Ok(())
    }

    // ─── Reference Data ─────────────────────────────────────────────────────

    pub async fn fetch_offers(&self) -> RewardsResult<Vec<Offer>> {
        let offers = self.remote.list_offers().await.map_err(|e| {
            warn!(error = %e, "Failed to load special offers");
            e
        })?;
        debug!(count = offers.len(), "Special offers loaded");
        Ok(offers)
    }

    /// Remote bundles with savings recomputed and invalid pricing dropped.
    pub async fn fetch_bundles(&self) -> RewardsResult<Vec<Bundle>> {
        let raw = self.remote.list_bundles().await.map_err(|e| {
            warn!(error = %e, "Failed to load bundles");
            e
        })?;
        let normalized = bundles::normalize_all(raw);
        debug!(count = normalized.len(), "Bundles loaded");
        Ok(normalized)
    }

    /// Full bundle details, falling back to `known` when the remote fails.
    pub async fn bundle_details(&self, bundle_id: &str, known: &[Bundle]) -> Option<Bundle> {
        match self.remote.bundle_details(bundle_id).await {
            Ok(bundle) => bundles::normalize(bundle),
            Err(e) => {
                warn!(bundle_id = bundle_id, error = %e, "Bundle details unavailable, using list entry");
                known.iter().find(|b| b.id == bundle_id).cloned()
            }
        }
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.remote.history().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load rewards history");
            Vec::new()
        })
    }

    pub async fn free_gift_options(&self) -> Vec<FreeGiftOption> {
        self.remote.free_gift_options().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load free gift options");
            Vec::new()
        })
    }

    /// Unlike the background writes, the caller needs this outcome, so
    /// errors are returned.
    pub async fn apply_bogo(&self, offer_id: &str, product_id: &str) -> RewardsResult<BogoApplication> {
        self.remote.apply_bogo(offer_id, product_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use rewards_cache::testing::{FlakyStore, RemoteCall, ScriptedRemote};
    use rewards_cache::wire::RemoteProfile;
    use rewards_cache::MemoryStore;
    use rewards_core::Tier;
    use std::time::Duration;

    const KEY: &str = "rewards_cache";

    fn remote_profile() -> RemoteProfile {
        RemoteProfile {
            points: 350,
            total_purchases: 12,
            free_gifts_earned: 1,
            free_gifts_redeemed: 0,
            lifetime_points: 500,
        }
    }

    fn coordinator(remote: Arc<ScriptedRemote>, local: Arc<dyn LocalStore>) -> SyncCoordinator {
        SyncCoordinator::new(remote, local, PointsLedger::default(), KEY)
    }

    #[tokio::test]
    async fn test_load_from_remote_derives_and_caches() {
        let remote = Arc::new(ScriptedRemote::new(remote_profile()));
        let local = Arc::new(MemoryStore::new());
        let sync = coordinator(remote, local.clone());
        assert_eq!(sync.state(), SyncState::Unloaded);

        let loaded = sync.load().await;
        assert_eq!(loaded.status, LoadStatus::Fresh);
        assert_eq!(loaded.profile.tier, Tier::Gold);
        assert_eq!(loaded.profile.purchases_until_free_gift, 8);
        assert_eq!(loaded.profile.points, 350);
        assert!(loaded.profile.last_updated.is_some());
        assert_eq!(sync.state(), SyncState::Ready);

        let cached = sync.read_cache().await.unwrap().unwrap();
        assert_eq!(cached, loaded.profile);
    }

    #[tokio::test]
    async fn test_load_falls_back_to_cache_verbatim() {
        let local = Arc::new(MemoryStore::new());
        // Deliberately inconsistent derived fields: returned exactly as stored.
        let stored = RewardsProfile {
            points: 42,
            total_purchases: 7,
            tier: Tier::Bronze,
            purchases_until_free_gift: 5,
            ..Default::default()
        };
        local
            .put(KEY, &serde_json::to_string(&stored).unwrap())
            .await
            .unwrap();

        let sync = coordinator(Arc::new(ScriptedRemote::unreachable()), local);
        let loaded = sync.load().await;
        assert_eq!(loaded.status, LoadStatus::Cached);
        assert_eq!(loaded.profile, stored);
        assert_eq!(sync.state(), SyncState::ReadyStale);
    }

    #[tokio::test]
    async fn test_load_with_nothing_returns_zero_profile() {
        let sync = coordinator(
            Arc::new(ScriptedRemote::unreachable()),
            Arc::new(MemoryStore::new()),
        );
        let loaded = sync.load().await;
        assert_eq!(loaded.status, LoadStatus::Unavailable);
        assert!(loaded.profile.is_zero());
        assert_eq!(sync.state(), SyncState::ReadyStale);
        assert!(sync.state().accepts_mutations());
    }

    #[tokio::test]
    async fn test_malformed_cache_is_a_miss() {
        let local = Arc::new(MemoryStore::new());
        local.put(KEY, "{not json").await.unwrap();
        let sync = coordinator(Arc::new(ScriptedRemote::unreachable()), local);

        assert!(matches!(
            sync.read_cache().await,
            Err(RewardsError::MalformedCache(_))
        ));
        let loaded = sync.load().await;
        assert_eq!(loaded.status, LoadStatus::Unavailable);
        assert!(loaded.profile.is_zero());
    }

    #[tokio::test]
    async fn test_cache_write_failure_does_not_fail_load() {
        let local = Arc::new(FlakyStore::new());
        local.set_fail_writes(true);
        let sync = coordinator(Arc::new(ScriptedRemote::new(remote_profile())), local);

        let loaded = sync.load().await;
        assert_eq!(loaded.status, LoadStatus::Fresh);
        assert_eq!(loaded.profile.points, 350);
    }

    #[tokio::test]
    async fn test_persist_failure_propagates() {
        let local = Arc::new(FlakyStore::new());
        local.set_fail_writes(true);
        let sync = coordinator(Arc::new(ScriptedRemote::new(remote_profile())), local);

        let err = sync.persist(&RewardsProfile::default()).await.unwrap_err();
        assert!(matches!(err, RewardsError::Storage(_)));
    }

    #[tokio::test]
    async fn test_propagate_swallows_remote_failure() {
        let remote = Arc::new(ScriptedRemote::unreachable());
        let sync = coordinator(remote.clone(), Arc::new(MemoryStore::new()));

        sync.propagate(RemoteOp::RedeemPoints(100));
        sync.flush().await;
        assert_eq!(remote.write_calls(), vec![RemoteCall::RedeemPoints(100)]);
    }

    #[tokio::test]
    async fn test_remote_writes_arrive_in_commit_order() {
        // A slow update must still land before the redemption queued after it,
        // or a balance-checking remote would reject the redemption.
        let remote = Arc::new(
            ScriptedRemote::new(RemoteProfile::default())
                .with_update_delay(Duration::from_millis(50)),
        );
        let sync = coordinator(remote.clone(), Arc::new(MemoryStore::new()));
        let delta = AccrualDelta {
            points_earned: 200,
            purchase_amount: 20.0,
            purchase_count: 1,
        };

        sync.propagate(RemoteOp::Accrue(delta.clone()));
        sync.propagate(RemoteOp::RedeemPoints(150));
        sync.flush().await;

        assert_eq!(
            remote.write_calls(),
            vec![RemoteCall::Update(delta), RemoteCall::RedeemPoints(150)]
        );
        assert_eq!(remote.profile().points, 50);
    }

    #[tokio::test]
    async fn test_flush_without_writes_returns() {
        let sync = coordinator(
            Arc::new(ScriptedRemote::new(remote_profile())),
            Arc::new(MemoryStore::new()),
        );
        sync.flush().await;
    }

    #[tokio::test]
    async fn test_reset_overwrites_when_remove_fails() {
        let local = Arc::new(FlakyStore::new());
        let sync = coordinator(Arc::new(ScriptedRemote::new(remote_profile())), local.clone());
        sync.load().await;

        local.set_fail_removes(true);
        sync.reset().await.unwrap();
        assert_eq!(sync.state(), SyncState::Unloaded);
        let cached = sync.read_cache().await.unwrap().unwrap();
        assert!(cached.is_zero());
    }

    #[tokio::test]
    async fn test_reset_fails_when_record_cannot_be_cleared() {
        let local = Arc::new(FlakyStore::new());
        let sync = coordinator(Arc::new(ScriptedRemote::new(remote_profile())), local.clone());
        sync.load().await;

        local.set_fail_removes(true);
        local.set_fail_writes(true);
        assert!(matches!(sync.reset().await, Err(RewardsError::Storage(_))));
        assert_eq!(sync.state(), SyncState::Ready);
        assert_eq!(sync.read_cache().await.unwrap().unwrap().points, 350);
    }

    #[tokio::test]
    async fn test_reset_clears_cache() {
        let local = Arc::new(MemoryStore::new());
        let sync = coordinator(Arc::new(ScriptedRemote::new(remote_profile())), local.clone());
        sync.load().await;
        assert_eq!(local.len(), 1);

        sync.reset().await.unwrap();
        assert!(local.is_empty());
        assert_eq!(sync.state(), SyncState::Unloaded);
        assert!(!sync.state().accepts_mutations());
    }

    #[tokio::test]
    async fn test_bundles_are_normalized() {
        let bundle: Bundle = serde_json::from_value(serde_json::json!({
            "id": "b1", "name": "B1", "originalPrice": 20.0, "bundlePrice": 15.0,
            "savings": 1.0, "savingsPercent": 99
        }))
        .unwrap();
        let broken: Bundle = serde_json::from_value(serde_json::json!({
            "id": "b2", "name": "B2", "originalPrice": 10.0, "bundlePrice": 15.0
        }))
        .unwrap();
        let remote = Arc::new(ScriptedRemote::new(remote_profile()).with_bundles(vec![bundle, broken]));
        let sync = coordinator(remote, Arc::new(MemoryStore::new()));

        let bundles = sync.fetch_bundles().await.unwrap();
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].savings_percent, 25);
    }

    #[tokio::test]
    async fn test_reads_degrade_gracefully() {
        let sync = coordinator(
            Arc::new(ScriptedRemote::unreachable()),
            Arc::new(MemoryStore::new()),
        );
        assert!(sync.fetch_offers().await.is_err());
        assert!(sync.history().await.is_empty());
        assert!(sync.free_gift_options().await.is_empty());
        assert!(sync.apply_bogo("bogo-any", "p1").await.is_err());

        let known = crate::defaults::default_bundles();
        let details = sync.bundle_details("bundle-mix-10", &known).await.unwrap();
        assert_eq!(details.savings_percent, 31);
        assert!(sync.bundle_details("missing", &known).await.is_none());
    }
}
