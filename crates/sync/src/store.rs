//! The rewards store: the single owner of a user's rewards profile and of the
//! offer and bundle lists shown next to it.
//!
//! Readers get synchronous snapshots. Mutators are serialized through one
//! async lock held across read → compute → local write, so two overlapping
//! mutations can never both start from the same profile.

use crate::coordinator::{LoadStatus, RemoteOp, SyncCoordinator, SyncState};
use crate::defaults::{default_bundles, default_offers};
use parking_lot::RwLock;
use rewards_cache::wire::{AccrualDelta, BogoApplication};
use rewards_cache::{LocalStore, RemoteRewards};
use rewards_core::event_bus::{make_event, EventSink, RewardsEventType};
use rewards_core::rewards::{FreeGiftOption, HistoryEntry};
use rewards_core::{AppConfig, Bundle, Offer, Product, RewardsError, RewardsProfile, RewardsResult};
use rewards_loyalty::{bundles, cycle_of, offers, tier_progress, Accrual, PointsLedger, PointsRedemption, TierProgress};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collaborators injected into a [`RewardsStore`].
pub struct StoreDeps {
    pub remote: Arc<dyn RemoteRewards>,
    pub local: Arc<dyn LocalStore>,
    pub events: Arc<dyn EventSink>,
}

pub struct RewardsStore {
    coordinator: SyncCoordinator,
    ledger: PointsLedger,
    events: Arc<dyn EventSink>,
    user_id: RwLock<Option<String>>,
    profile: RwLock<RewardsProfile>,
    load_status: RwLock<Option<LoadStatus>>,
    offers: RwLock<Vec<Offer>>,
    bundles: RwLock<Vec<Bundle>>,
    mutations: tokio::sync::Mutex<()>,
}

impl RewardsStore {
    pub fn new(config: &AppConfig, deps: StoreDeps) -> Self {
        let ledger = PointsLedger::new(&config.rewards);
        let coordinator =
            SyncCoordinator::new(deps.remote, deps.local, ledger.clone(), config.cache.key.clone());
        Self {
            coordinator,
            profile: RwLock::new(ledger.zero_profile()),
            ledger,
            events: deps.events,
            user_id: RwLock::new(None),
            load_status: RwLock::new(None),
            offers: RwLock::new(Vec::new()),
            bundles: RwLock::new(Vec::new()),
            mutations: tokio::sync::Mutex::new(()),
        }
    }

    // ─── Snapshots ──────────────────────────────────────────────────────────

    pub fn profile(&self) -> RewardsProfile {
        self.profile.read().clone()
    }

    pub fn state(&self) -> SyncState {
        self.coordinator.state()
    }

    pub fn user_id(&self) -> Option<String> {
        self.user_id.read().clone()
    }

    pub fn load_status(&self) -> Option<LoadStatus> {
        *self.load_status.read()
    }

    /// True when the last load found neither the remote nor a cached profile.
    pub fn rewards_unavailable(&self) -> bool {
        self.load_status() == Some(LoadStatus::Unavailable)
    }

    pub fn available_free_gifts(&self) -> u32 {
        self.profile.read().available_free_gifts()
    }

    /// Percent of the way to the next free gift.
    pub fn gift_progress_percent(&self) -> f64 {
        let threshold = self.ledger.free_gift_threshold();
        cycle_of(self.profile.read().total_purchases, threshold).progress_percent(threshold)
    }

    pub fn tier_progress(&self) -> TierProgress {
        tier_progress(self.profile.read().total_purchases)
    }

    pub fn offers(&self) -> Vec<Offer> {
        self.offers.read().clone()
    }

    pub fn bundles(&self) -> Vec<Bundle> {
        self.bundles.read().clone()
    }

    /// The BOGO offer that applies to `product`, if any.
    pub fn match_bogo(&self, product: &Product) -> Option<Offer> {
        offers::match_bogo(&self.offers.read(), product).cloned()
    }

    /// The best-value bundle, when it saves enough to be worth featuring.
    pub fn featured_bundle(&self) -> Option<Bundle> {
        let list = self.bundles.read();
        bundles::featured(&list)
            .filter(|b| bundles::is_featurable(b))
            .cloned()
    }

    // ─── Session ────────────────────────────────────────────────────────────

    /// Load rewards, offers and bundles for `user_id`. Switching users
    /// without a logout performs one first.
    pub async fn login(&self, user_id: &str) -> RewardsResult<LoadStatus> {
        let previous = self.user_id();
        if previous.as_deref().is_some_and(|p| p != user_id) {
            info!(previous = ?previous, "Switching rewards user");
            self.logout().await?;
        }
        *self.user_id.write() = Some(user_id.to_string());

        let status = self.reload().await?;
        tokio::join!(self.load_offers(), self.load_bundles());
        Ok(status)
    }

    /// Re-fetch the profile. Cannot fail once a user is set; the outcome is
    /// reported as a [`LoadStatus`].
    pub async fn reload(&self) -> RewardsResult<LoadStatus> {
        let _guard = self.mutations.lock().await;
        if self.user_id.read().is_none() {
            return Err(RewardsError::NotLoaded);
        }

        let loaded = self.coordinator.load().await;
        *self.profile.write() = loaded.profile;
        *self.load_status.write() = Some(loaded.status);
        Ok(loaded.status)
    }

    /// Drop the cached record, then reset to the zero profile. If the record
    /// can be neither removed nor overwritten the session is left as it was
    /// and the error returned.
    pub async fn logout(&self) -> RewardsResult<()> {
        let _guard = self.mutations.lock().await;
        self.coordinator.reset().await?;

        *self.profile.write() = self.ledger.zero_profile();
        *self.load_status.write() = None;
        self.offers.write().clear();
        self.bundles.write().clear();
        let user = self.user_id.write().take();
        info!(user_id = ?user, "Rewards session ended");
        Ok(())
    }

    /// Wait for background remote writes to finish.
    pub async fn flush(&self) {
        self.coordinator.flush().await;
    }

    // ─── Mutations ──────────────────────────────────────────────────────────

    async fn mutate<T>(
        &self,
        apply: impl FnOnce(&RewardsProfile) -> RewardsResult<(RewardsProfile, T, RemoteOp)>,
    ) -> RewardsResult<T> {
        let _guard = self.mutations.lock().await;
        if !self.coordinator.state().accepts_mutations() {
            return Err(RewardsError::NotLoaded);
        }

        let current = self.profile();
        let (next, output, op) = apply(&current)?;
        self.coordinator.persist(&next).await?;
        *self.profile.write() = next;
        self.coordinator.propagate(op);
        Ok(output)
    }

    /// Credit a completed purchase.
    pub async fn record_purchase(
        &self,
        purchase_amount_usd: f64,
        purchase_count: u32,
    ) -> RewardsResult<Accrual> {
        self.ledger.check_purchase_amount(purchase_amount_usd)?;
        let ledger = &self.ledger;
        let accrual = self
            .mutate(|current| {
                let accrual = ledger.accrue(current, purchase_amount_usd, purchase_count);
                let op = RemoteOp::Accrue(AccrualDelta {
                    points_earned: accrual.points_earned,
                    purchase_amount: purchase_amount_usd,
                    purchase_count,
                });
                Ok((accrual.profile.clone(), accrual, op))
            })
            .await?;

        metrics::counter!("rewards.points_earned").increment(accrual.points_earned);
        let mut event = make_event(RewardsEventType::PointsEarned, self.user_id());
        event.points = Some(accrual.points_earned);
        event.amount = Some(purchase_amount_usd);
        event.tier = Some(accrual.previous_tier);
        self.events.emit(event);

        if accrual.gift_just_earned {
            self.events
                .emit(make_event(RewardsEventType::FreeGiftEarned, self.user_id()));
        }
        if accrual.tier_changed() {
            metrics::counter!("rewards.tier_upgrades").increment(1);
            info!(
                old = ?accrual.previous_tier,
                new = ?accrual.profile.tier,
                "Tier upgrade"
            );
            let mut event = make_event(RewardsEventType::TierUpgrade, self.user_id());
            event.tier = Some(accrual.profile.tier);
            self.events.emit(event);
        }

        info!(
            points_earned = accrual.points_earned,
            balance = accrual.profile.points,
            total_purchases = accrual.profile.total_purchases,
            gift_just_earned = accrual.gift_just_earned,
            "Purchase recorded"
        );
        Ok(accrual)
    }

    /// Exchange points for a discount. 100 points are worth one dollar.
    pub async fn redeem_points(&self, amount: u64) -> RewardsResult<PointsRedemption> {
        let ledger = &self.ledger;
        let redemption = self
            .mutate(|current| {
                let redemption = ledger.redeem_points(current, amount)?;
                Ok((
                    redemption.profile.clone(),
                    redemption,
                    RemoteOp::RedeemPoints(amount),
                ))
            })
            .await?;

        metrics::counter!("rewards.points_redeemed").increment(amount);
        let mut event = make_event(RewardsEventType::PointsRedeemed, self.user_id());
        event.points = Some(amount);
        event.amount = Some(redemption.discount_usd);
        self.events.emit(event);

        info!(
            redeemed = amount,
            discount = redemption.discount_usd,
            balance = redemption.profile.points,
            "Points redeemed"
        );
        Ok(redemption)
    }

    pub async fn redeem_free_gift(&self) -> RewardsResult<RewardsProfile> {
        let ledger = &self.ledger;
        let profile = self
            .mutate(|current| {
                let next = ledger.redeem_free_gift(current)?;
                Ok((next.clone(), next, RemoteOp::RedeemFreeGift))
            })
            .await?;

        metrics::counter!("rewards.gifts_redeemed").increment(1);
        self.events
            .emit(make_event(RewardsEventType::FreeGiftRedeemed, self.user_id()));
        info!(
            available = profile.available_free_gifts(),
            "Free gift redeemed"
        );
        Ok(profile)
    }

    // ─── Reference Data ─────────────────────────────────────────────────────

    /// Refresh offers. On failure the last loaded list is kept, or the
    /// built-in offers if nothing was loaded yet.
    pub async fn load_offers(&self) -> LoadStatus {
        let status = match self.coordinator.fetch_offers().await {
            Ok(fresh) => {
                *self.offers.write() = fresh;
                LoadStatus::Fresh
            }
            Err(_) => {
                let mut offers = self.offers.write();
                if offers.is_empty() {
                    *offers = default_offers();
                    LoadStatus::Unavailable
                } else {
                    LoadStatus::Cached
                }
            }
        };
        self.events
            .emit(make_event(RewardsEventType::OffersLoaded, self.user_id()));
        debug!(status = ?status, count = self.offers.read().len(), "Offers refreshed");
        status
    }

    /// Refresh bundles with the same fallback policy as offers.
    pub async fn load_bundles(&self) -> LoadStatus {
        let status = match self.coordinator.fetch_bundles().await {
            Ok(fresh) => {
                *self.bundles.write() = fresh;
                LoadStatus::Fresh
            }
            Err(_) => {
                let mut bundles = self.bundles.write();
                if bundles.is_empty() {
                    *bundles = default_bundles();
                    LoadStatus::Unavailable
                } else {
                    LoadStatus::Cached
                }
            }
        };
        self.events
            .emit(make_event(RewardsEventType::BundlesLoaded, self.user_id()));
        debug!(status = ?status, count = self.bundles.read().len(), "Bundles refreshed");
        status
    }

    pub async fn bundle_details(&self, bundle_id: &str) -> Option<Bundle> {
        let known = self.bundles();
        self.coordinator.bundle_details(bundle_id, &known).await
    }

    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.coordinator.history().await
    }

    pub async fn free_gift_options(&self) -> Vec<FreeGiftOption> {
        self.coordinator.free_gift_options().await
    }

    /// Ask the remote to apply a BOGO offer to `product`. Only offers that
    /// currently match the product are sent.
    pub async fn apply_bogo(&self, offer_id: &str, product: &Product) -> RewardsResult<BogoApplication> {
        let matched = self.match_bogo(product);
        if matched.as_ref().map(|o| o.id.as_str()) != Some(offer_id) {
            warn!(offer_id = offer_id, product_id = %product.id, "BOGO offer does not apply to product");
            return Ok(BogoApplication {
                success: false,
                message: Some("Offer does not apply to this product".to_string()),
                discount: None,
            });
        }
        self.coordinator.apply_bogo(offer_id, &product.id).await
    }
}
