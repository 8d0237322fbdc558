//! Analytics event bus: a trait for emitting rewards events as a side effect.
//!
//! The rewards store accepts an `Arc<dyn EventSink>` and emits into it
//! fire-and-forget. Nothing downstream of `emit` can affect rewards state.

use crate::rewards::Tier;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RewardsEventType {
    PointsEarned,
    PointsRedeemed,
    FreeGiftEarned,
    FreeGiftRedeemed,
    TierUpgrade,
    OffersLoaded,
    BundlesLoaded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardsEvent {
    pub event_id: Uuid,
    pub event_type: RewardsEventType,
    pub user_id: Option<String>,
    pub points: Option<u64>,
    pub amount: Option<f64>,
    pub tier: Option<Tier>,
    pub timestamp: DateTime<Utc>,
}

/// Trait for emitting analytics events. Implementations must not block.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: RewardsEvent);
}

/// No-op sink for callers that don't need event emission.
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _event: RewardsEvent) {}
}

/// In-memory sink that captures events for testing.
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<RewardsEvent>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn events(&self) -> Vec<RewardsEvent> {
        self.events.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().len()
    }

    pub fn count_type(&self, event_type: RewardsEventType) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for CaptureSink {
    fn emit(&self, event: RewardsEvent) {
        self.events.lock().push(event);
    }
}

/// Convenience builder for a `RewardsEvent` with no payload fields set.
pub fn make_event(event_type: RewardsEventType, user_id: Option<String>) -> RewardsEvent {
    RewardsEvent {
        event_id: Uuid::new_v4(),
        event_type,
        user_id,
        points: None,
        amount: None,
        tier: None,
        timestamp: Utc::now(),
    }
}

pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpSink)
}

pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}
