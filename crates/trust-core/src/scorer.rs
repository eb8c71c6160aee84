//! Application-layer (behavioral) trust scoring
//!
//! Scoring starts at 100 and subtracts independent penalties, each at most
//! once per evaluation:
//!
//! | signal | penalty |
//! |---|---|
//! | origin differs from the last recorded one | 20 |
//! | off-hours wall clock | 15 |
//! | request count in the current window above the burst threshold | 30 |
//! | sensitive operation | 10 |
//! | first sight of the device fingerprint | 25 |
//!
//! Gathering the stateful signals mutates the identity's state: the counter
//! is incremented, the fingerprint enrolled and the origin overwritten.

use crate::clock::Clock;
use crate::config::{BusinessHours, TrustConfig};
use crate::context::{RequestContext, OVERLAY_ORIGIN};
use crate::score::{Layer, LayeredScore, Score};
use crate::state::IdentityKeys;
use async_trait::async_trait;
use chrono::Timelike;
use identity_store::{SharedStore, StoreError};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const BASE_SCORE: i64 = 100;
pub const ORIGIN_CHANGE_PENALTY: i64 = 20;
pub const OFF_HOURS_PENALTY: i64 = 15;
pub const BURST_PENALTY: i64 = 30;
pub const SENSITIVE_PENALTY: i64 = 10;
pub const UNKNOWN_DEVICE_PENALTY: i64 = 25;

/// Risk signals observed for one request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signals {
    pub origin_changed: bool,
    pub off_hours: bool,
    pub burst: bool,
    pub sensitive: bool,
    pub unknown_device: bool,
}

impl Signals {
    /// Signals that need no stored state
    pub fn stateless(ctx: &RequestContext, hour: u32, hours: &BusinessHours) -> Self {
        Self {
            off_hours: hours.is_off_hours(hour),
            sensitive: ctx.sensitive,
            ..Default::default()
        }
    }

    pub fn penalty(&self) -> i64 {
        [
            (self.origin_changed, ORIGIN_CHANGE_PENALTY),
            (self.off_hours, OFF_HOURS_PENALTY),
            (self.burst, BURST_PENALTY),
            (self.sensitive, SENSITIVE_PENALTY),
            (self.unknown_device, UNKNOWN_DEVICE_PENALTY),
        ]
        .iter()
        .filter(|(active, _)| *active)
        .map(|(_, penalty)| penalty)
        .sum()
    }

    pub fn score(&self) -> Score {
        Score::clamped(BASE_SCORE - self.penalty())
    }
}

/// An origin change needs a prior origin on record that differs from the
/// current one. Overlay-delivered requests carry no comparable address.
pub fn origin_changed(previous: Option<&str>, current: &str) -> bool {
    match previous {
        Some(previous) if !previous.is_empty() => {
            !current.is_empty() && current != OVERLAY_ORIGIN && previous != current
        }
        _ => false,
    }
}

/// Scores a request for an identity
#[async_trait]
pub trait TrustScorer: Send + Sync {
    /// Score using (and updating) the identity's stored state
    async fn score(
        &self,
        identity: &str,
        ctx: &RequestContext,
    ) -> Result<LayeredScore, StoreError>;

    /// Score with default state, for when the store is unavailable
    fn fallback(&self, ctx: &RequestContext) -> LayeredScore;

    fn layer(&self) -> Layer;
}

/// Limits the behavior scorer applies
#[derive(Debug, Clone, Copy)]
pub struct ScoringRules {
    pub rate_window: Duration,
    pub burst_threshold: u64,
    pub business_hours: BusinessHours,
}

impl From<&TrustConfig> for ScoringRules {
    fn from(config: &TrustConfig) -> Self {
        Self {
            rate_window: config.rate_window,
            burst_threshold: config.burst_threshold,
            business_hours: config.business_hours,
        }
    }
}

/// Single-layer scorer over the identity state store
#[derive(Clone)]
pub struct BehaviorScorer {
    store: SharedStore,
    rules: ScoringRules,
    clock: Arc<dyn Clock>,
}

impl BehaviorScorer {
    pub fn new(store: SharedStore, rules: ScoringRules, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            rules,
            clock,
        }
    }

    fn stateless_signals(&self, ctx: &RequestContext) -> Signals {
        let hour = self.clock.now().hour();
        Signals::stateless(ctx, hour, &self.rules.business_hours)
    }

    /// Gather all signals, applying the state mutations along the way
    pub async fn observe(&self, identity: &str, ctx: &RequestContext) -> Result<Signals, StoreError> {
        let keys = IdentityKeys::new(identity);
        let mut signals = self.stateless_signals(ctx);

        let previous = self.store.get(&keys.last_origin).await?;
        signals.origin_changed = origin_changed(previous.as_deref(), &ctx.origin);

        let count = self
            .store
            .incr_window(&keys.access_count, self.rules.rate_window)
            .await?;
        signals.burst = count > self.rules.burst_threshold;

        // Enrolls the device on first sight
        signals.unknown_device = self.store.set_add(&keys.devices, &ctx.fingerprint()).await?;

        self.store.set(&keys.last_origin, &ctx.origin).await?;

        debug!(
            identity = %identity,
            origin_changed = signals.origin_changed,
            off_hours = signals.off_hours,
            burst = signals.burst,
            request_count = count,
            sensitive = signals.sensitive,
            unknown_device = signals.unknown_device,
            "Observed behavior signals"
        );
        Ok(signals)
    }
}

#[async_trait]
impl TrustScorer for BehaviorScorer {
    async fn score(
        &self,
        identity: &str,
        ctx: &RequestContext,
    ) -> Result<LayeredScore, StoreError> {
        let signals = self.observe(identity, ctx).await?;
        Ok(LayeredScore::single(signals.score()))
    }

    fn fallback(&self, ctx: &RequestContext) -> LayeredScore {
        LayeredScore::single(self.stateless_signals(ctx).score())
    }

    fn layer(&self) -> Layer {
        Layer::Standard
    }
}
