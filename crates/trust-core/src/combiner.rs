//! Multi-layer trust: the secure-overlay (network) channel
//!
//! The network score is independent of behavioral history: base 50, +30 when
//! the request arrived through the overlay, +20 when the overlay attested an
//! identity. [`LayeredScorer`] decorates any [`TrustScorer`] and blends the two
//! layers with a configurable [`Weighting`].

use crate::context::RequestContext;
use crate::metrics::TrustMetrics;
use crate::score::{Layer, LayeredScore, Score};
use crate::scorer::TrustScorer;
use async_trait::async_trait;
use identity_store::StoreError;
use std::sync::Arc;
use tracing::debug;

pub const NETWORK_BASE_SCORE: i64 = 50;
pub const OVERLAY_BONUS: i64 = 30;
pub const OVERLAY_IDENTITY_BONUS: i64 = 20;

/// Network-layer score for a request
pub fn network_score(ctx: &RequestContext) -> Score {
    let mut score = NETWORK_BASE_SCORE;
    if ctx.via_overlay {
        score += OVERLAY_BONUS;
    }
    if ctx.overlay_identity.is_some() {
        score += OVERLAY_IDENTITY_BONUS;
    }
    Score::clamped(score)
}

/// Share of the combined score contributed by the network layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Weighting {
    network_percent: u8,
}

impl Default for Weighting {
    fn default() -> Self {
        Self { network_percent: 30 }
    }
}

impl Weighting {
    /// `None` if `network_percent` exceeds 100
    pub fn new(network_percent: u8) -> Option<Self> {
        (network_percent <= 100).then_some(Self { network_percent })
    }

    pub fn network_percent(&self) -> u8 {
        self.network_percent
    }

    /// `round(network * w + app * (1 - w))`, rounding halves up
    pub fn blend(&self, network: Score, app: Score) -> Score {
        let w = i64::from(self.network_percent);
        let weighted =
            i64::from(network.value()) * w + i64::from(app.value()) * (100 - w);
        Score::clamped((weighted + 50) / 100)
    }
}

/// Combine layer scores; without a network score the app score passes through
/// unchanged.
pub fn combine(network: Option<Score>, app: Score, weighting: Weighting) -> Score {
    match network {
        Some(network) => weighting.blend(network, app),
        None => app,
    }
}

/// Adds the secure-overlay channel on top of an application-layer scorer
pub struct LayeredScorer<T> {
    inner: T,
    weighting: Weighting,
    metrics: Arc<dyn TrustMetrics>,
}

impl<T: TrustScorer> LayeredScorer<T> {
    pub fn new(inner: T, weighting: Weighting, metrics: Arc<dyn TrustMetrics>) -> Self {
        Self {
            inner,
            weighting,
            metrics,
        }
    }

    fn layer_up(&self, ctx: &RequestContext, app: Score) -> LayeredScore {
        let status = if ctx.via_overlay {
            "authenticated"
        } else {
            "direct"
        };
        self.metrics.record_overlay_connection(status);

        let network = network_score(ctx);
        let combined = combine(Some(network), app, self.weighting);
        debug!(
            network = network.value(),
            app = app.value(),
            combined = combined.value(),
            "Combined trust layers"
        );
        LayeredScore {
            combined,
            network: Some(network),
            app,
        }
    }
}

#[async_trait]
impl<T: TrustScorer> TrustScorer for LayeredScorer<T> {
    async fn score(
        &self,
        identity: &str,
        ctx: &RequestContext,
    ) -> Result<LayeredScore, StoreError> {
        let app = self.inner.score(identity, ctx).await?.app;
        Ok(self.layer_up(ctx, app))
    }

    fn fallback(&self, ctx: &RequestContext) -> LayeredScore {
        let app = self.inner.fallback(ctx).app;
        self.layer_up(ctx, app)
    }

    fn layer(&self) -> Layer {
        Layer::Overlay
    }
}
