//! Trust evaluation
//!
//! One call per inbound request:
//! 1. Score the request (behavior layer, plus the overlay layer when enabled)
//! 2. Apply the store failure policy if state could not be read
//! 3. Persist the combined score for inspection (best-effort)
//! 4. Run the decision table
//! 5. Append the decision to the audit ring (best-effort) and emit metrics

use crate::audit::AuditRecorder;
use crate::behavior::{self, BehaviorSnapshot};
use crate::clock::{Clock, SystemClock};
use crate::combiner::LayeredScorer;
use crate::config::{FailMode, TrustConfig};
use crate::context::RequestContext;
use crate::decision::Decision;
use crate::error::TrustError;
use crate::identity::Identity;
use crate::metrics::{NoopMetrics, TrustMetrics};
use crate::policy::{self, Policy};
use crate::score::{Layer, LayeredScore, Score};
use crate::scorer::{BehaviorScorer, ScoringRules, TrustScorer};
use crate::state::IdentityKeys;
use chrono::Utc;
use identity_store::{MemoryStore, RedisStore, SharedStore, TimedStore};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Result of a health probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Health {
    pub store_ok: bool,
    pub mode: Layer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Where an evaluation's score came from
enum Scored {
    /// Scored against the identity's stored state
    Stored(LayeredScore),
    /// Store unreachable; stateless signals only
    Fallback(LayeredScore),
    /// Store unreachable and the fail mode denies
    Unavailable,
}

/// Builder for [`TrustEngine`]
pub struct TrustEngineBuilder {
    config: TrustConfig,
    store: SharedStore,
    metrics: Arc<dyn TrustMetrics>,
    clock: Arc<dyn Clock>,
}

impl TrustEngineBuilder {
    pub fn metrics(mut self, metrics: Arc<dyn TrustMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn build(self) -> TrustEngine {
        // Every store call on the request path is bounded
        let store: SharedStore = Arc::new(TimedStore::new(self.store, self.config.store_timeout));

        let behavior = BehaviorScorer::new(
            store.clone(),
            ScoringRules::from(&self.config),
            self.clock.clone(),
        );
        let scorer: Box<dyn TrustScorer> = if self.config.secondary_channel {
            Box::new(LayeredScorer::new(
                behavior,
                self.config.weighting,
                self.metrics.clone(),
            ))
        } else {
            Box::new(behavior)
        };

        TrustEngine {
            recorder: AuditRecorder::new(store.clone(), self.config.audit_log_key.clone()),
            config: self.config,
            store,
            scorer,
            metrics: self.metrics,
            clock: self.clock,
        }
    }
}

/// Continuous-authorization engine
pub struct TrustEngine {
    config: TrustConfig,
    store: SharedStore,
    scorer: Box<dyn TrustScorer>,
    recorder: AuditRecorder,
    metrics: Arc<dyn TrustMetrics>,
    clock: Arc<dyn Clock>,
}

impl TrustEngine {
    /// Start building an engine over `store`
    pub fn builder(config: TrustConfig, store: SharedStore) -> TrustEngineBuilder {
        TrustEngineBuilder {
            config,
            store,
            metrics: Arc::new(NoopMetrics),
            clock: Arc::new(SystemClock),
        }
    }

    /// Engine with the system clock and no metrics
    pub fn new(config: TrustConfig, store: SharedStore) -> Self {
        Self::builder(config, store).build()
    }

    /// Open the backend named by the config: Redis when `redis_url` is set,
    /// otherwise process-local memory
    pub async fn open_store(config: &TrustConfig) -> Result<SharedStore, TrustError> {
        match &config.redis_url {
            Some(url) => Ok(Arc::new(RedisStore::connect(url).await?)),
            None => Ok(Arc::new(MemoryStore::new())),
        }
    }

    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    pub fn layer(&self) -> Layer {
        self.scorer.layer()
    }

    /// Evaluate one request from `identity` against `resource`
    ///
    /// `Err` means no decision could be made; it is never a substitute for a
    /// `deny`.
    pub async fn evaluate(
        &self,
        identity: &Identity,
        ctx: &RequestContext,
        resource: &str,
    ) -> Result<Decision, TrustError> {
        let start = Instant::now();
        let subject = identity.subject.as_str();
        if subject.trim().is_empty() {
            return Err(TrustError::MissingIdentity);
        }
        let layer = self.scorer.layer();

        let scored = match self.scorer.score(subject, ctx).await {
            Ok(score) => Scored::Stored(score),
            Err(err) => match self.config.store_failure {
                FailMode::Open => {
                    warn!(identity = %subject, error = %err, "Identity store unavailable - scoring with default state");
                    Scored::Fallback(self.scorer.fallback(ctx))
                }
                FailMode::Closed => {
                    warn!(identity = %subject, error = %err, "Identity store unavailable - denying request");
                    Scored::Unavailable
                }
                FailMode::Error => {
                    warn!(identity = %subject, error = %err, "Identity store unavailable - evaluation failed");
                    self.metrics.record_latency(start.elapsed().as_secs_f64());
                    return Err(TrustError::StoreUnavailable(err));
                }
            },
        };

        let now = self.clock.now().with_timezone(&Utc);
        let secondary_channel = layer == Layer::Overlay;
        let decision = match scored {
            Scored::Stored(score) => {
                self.persist_score(subject, score.combined).await;
                self.record_scores(&score);
                Decision::new(
                    now,
                    subject,
                    &score,
                    resource,
                    policy::decide(&score),
                    secondary_channel,
                )
            }
            // A fallback score says nothing about the identity's history
            Scored::Fallback(score) => {
                self.record_scores(&score);
                Decision::new(
                    now,
                    subject,
                    &score,
                    resource,
                    policy::decide(&score),
                    secondary_channel,
                )
            }
            Scored::Unavailable => Decision::new(
                now,
                subject,
                &LayeredScore::single(Score::MIN),
                resource,
                Policy::store_unavailable(),
                secondary_channel,
            ),
        };

        if let Err(err) = self.recorder.record(&decision).await {
            warn!(identity = %subject, error = %err, "Failed to record decision");
            self.metrics.record_audit_failure();
        }

        self.metrics.record_decision(
            decision.action.as_str(),
            decision.reason.as_str(),
            layer.as_str(),
        );
        self.metrics.record_latency(start.elapsed().as_secs_f64());
        debug!(
            identity = %subject,
            resource = %resource,
            score = decision.trust_score.value(),
            action = decision.action.as_str(),
            reason = %decision.reason,
            "Trust decision"
        );
        Ok(decision)
    }

    /// Read-only view of an identity's behavioral state
    pub async fn lookup(&self, identity: &str) -> Result<BehaviorSnapshot, TrustError> {
        if identity.trim().is_empty() {
            return Err(TrustError::MissingIdentity);
        }
        Ok(behavior::lookup(self.store.as_ref(), identity, self.config.secondary_channel).await?)
    }

    /// Most recent decisions, newest first
    pub async fn recent_decisions(&self, limit: usize) -> Result<Vec<Decision>, TrustError> {
        self.recorder.recent(limit).await
    }

    pub async fn health(&self) -> Health {
        let result = self.store.ping().await;
        Health {
            store_ok: result.is_ok(),
            mode: self.layer(),
            error: result.err().map(|e| e.to_string()),
        }
    }

    async fn persist_score(&self, identity: &str, combined: Score) {
        let key = IdentityKeys::new(identity).trust_score;
        if let Err(err) = self.store.set(&key, &combined.to_string()).await {
            warn!(identity = %identity, error = %err, "Failed to persist trust score");
        }
    }

    fn record_scores(&self, score: &LayeredScore) {
        if let Some(network) = score.network {
            self.metrics.record_score("network", network.value());
        }
        self.metrics.record_score("application", score.app.value());
        self.metrics.record_score("combined", score.combined.value());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::policy::{Action, Reason};
    use async_trait::async_trait;
    use identity_store::{IdentityStore, StoreError};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Store whose every operation fails
    struct DownStore;

    #[async_trait]
    impl IdentityStore for DownStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }
        async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }
        async fn incr_window(&self, _key: &str, _window: Duration) -> Result<u64, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }
        async fn counter(&self, _key: &str) -> Result<u64, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }
        async fn set_add(&self, _key: &str, _member: &str) -> Result<bool, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }
        async fn set_len(&self, _key: &str) -> Result<usize, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }
        async fn list_push_capped(
            &self,
            _key: &str,
            _value: &str,
            _capacity: usize,
        ) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }
        async fn list_range(&self, _key: &str, _limit: usize) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }
        async fn ping(&self) -> Result<(), StoreError> {
            Err(StoreError::Backend("connection refused".to_string()))
        }
    }

    /// Memory store whose behavioral reads fail; writes still land
    #[derive(Default)]
    struct ReadsDownStore {
        inner: MemoryStore,
    }

    #[async_trait]
    impl IdentityStore for ReadsDownStore {
        async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Backend("replica lost".to_string()))
        }
        async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
            self.inner.set(key, value).await
        }
        async fn incr_window(&self, key: &str, window: Duration) -> Result<u64, StoreError> {
            self.inner.incr_window(key, window).await
        }
        async fn counter(&self, key: &str) -> Result<u64, StoreError> {
            self.inner.counter(key).await
        }
        async fn set_add(&self, key: &str, member: &str) -> Result<bool, StoreError> {
            self.inner.set_add(key, member).await
        }
        async fn set_len(&self, key: &str) -> Result<usize, StoreError> {
            self.inner.set_len(key).await
        }
        async fn list_push_capped(
            &self,
            key: &str,
            value: &str,
            capacity: usize,
        ) -> Result<(), StoreError> {
            self.inner.list_push_capped(key, value, capacity).await
        }
        async fn list_range(&self, key: &str, limit: usize) -> Result<Vec<String>, StoreError> {
            self.inner.list_range(key, limit).await
        }
        async fn ping(&self) -> Result<(), StoreError> {
            self.inner.ping().await
        }
    }

    /// Records every metrics call for assertions
    #[derive(Default)]
    struct RecordingMetrics {
        decisions: Mutex<Vec<(String, String, String)>>,
        audit_failures: Mutex<u32>,
    }

    impl TrustMetrics for RecordingMetrics {
        fn record_decision(&self, action: &str, reason: &str, layer: &str) {
            self.decisions.lock().unwrap().push((
                action.to_string(),
                reason.to_string(),
                layer.to_string(),
            ));
        }
        fn record_latency(&self, _seconds: f64) {}
        fn record_score(&self, _layer: &str, _score: u8) {}
        fn record_overlay_connection(&self, _status: &str) {}
        fn record_audit_failure(&self) {
            *self.audit_failures.lock().unwrap() += 1;
        }
    }

    fn engine(config: TrustConfig, store: SharedStore) -> TrustEngine {
        TrustEngine::builder(config, store)
            .clock(Arc::new(FixedClock::at_hour(14).unwrap()))
            .build()
    }

    fn laptop() -> RequestContext {
        RequestContext::new("10.0.0.1")
            .with_user_agent("Mozilla/5.0")
            .with_accept_language("en-US")
    }

    #[tokio::test]
    async fn test_missing_identity_is_an_error() {
        let engine = engine(TrustConfig::default(), Arc::new(MemoryStore::new()));

        let err = engine
            .evaluate(&Identity::new("  "), &laptop(), "/")
            .await
            .unwrap_err();
        assert_eq!(err, TrustError::MissingIdentity);
        assert!(engine.lookup("").await.is_err());
    }

    #[tokio::test]
    async fn test_persists_combined_score() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let engine = engine(TrustConfig::default(), store.clone());

        engine
            .evaluate(&Identity::new("alice"), &laptop(), "/finance/report")
            .await
            .unwrap();

        assert_eq!(
            store.get("user:alice:trust_score").await.unwrap().as_deref(),
            Some("75")
        );
    }

    #[tokio::test]
    async fn test_store_down_fail_open() {
        let metrics = Arc::new(RecordingMetrics::default());
        let engine = TrustEngine::builder(TrustConfig::default(), Arc::new(DownStore))
            .clock(Arc::new(FixedClock::at_hour(14).unwrap()))
            .metrics(metrics.clone())
            .build();

        let decision = engine
            .evaluate(&Identity::new("alice"), &laptop(), "/finance/report")
            .await
            .unwrap();

        assert_eq!(decision.trust_score, Score::MAX);
        assert_eq!(decision.action, Action::Allow);
        assert_eq!(*metrics.audit_failures.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_fallback_score_is_not_persisted() {
        let store = Arc::new(ReadsDownStore::default());
        let engine = engine(TrustConfig::default(), store.clone());

        let decision = engine
            .evaluate(&Identity::new("alice"), &laptop().with_sensitive(true), "/admin")
            .await
            .unwrap();

        assert_eq!(decision.trust_score, Score::clamped(90));
        assert_eq!(store.inner.get("user:alice:trust_score").await.unwrap(), None);
        assert_eq!(engine.recent_decisions(10).await.unwrap(), vec![decision]);
    }

    #[tokio::test]
    async fn test_store_down_fail_closed() {
        let config = TrustConfig {
            store_failure: FailMode::Closed,
            ..Default::default()
        };
        let metrics = Arc::new(RecordingMetrics::default());
        let engine = TrustEngine::builder(config, Arc::new(DownStore))
            .metrics(metrics.clone())
            .build();

        let decision = engine
            .evaluate(&Identity::new("alice"), &laptop(), "/finance/report")
            .await
            .unwrap();

        assert_eq!(decision.action, Action::Deny);
        assert_eq!(decision.reason, Reason::StoreUnavailable);
        assert_eq!(
            metrics.decisions.lock().unwrap()[0],
            (
                "deny".to_string(),
                "store_unavailable".to_string(),
                "standard".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_store_down_fail_error() {
        let config = TrustConfig {
            store_failure: FailMode::Error,
            ..Default::default()
        };
        let engine = engine(config, Arc::new(DownStore));

        let err = engine
            .evaluate(&Identity::new("alice"), &laptop(), "/")
            .await
            .unwrap_err();
        assert!(matches!(err, TrustError::StoreUnavailable(_)));
        assert!(err.is_evaluation_failure());
    }

    #[tokio::test]
    async fn test_health() {
        let up = engine(TrustConfig::default(), Arc::new(MemoryStore::new()));
        let down = engine(TrustConfig::default(), Arc::new(DownStore));

        let health = up.health().await;
        assert!(health.store_ok);
        assert_eq!(health.mode, Layer::Standard);

        let health = down.health().await;
        assert!(!health.store_ok);
        assert!(health.error.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn test_open_store_defaults_to_memory() {
        let store = TrustEngine::open_store(&TrustConfig::default()).await.unwrap();
        store.ping().await.unwrap();
    }
}
