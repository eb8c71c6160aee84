//! Metrics emitted per evaluation
//!
//! The engine reports plain values through [`TrustMetrics`]; exposition is the
//! host's concern. [`PromMetrics`] adapts the trait onto a `prometheus_client`
//! registry.

use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;

/// Metrics callback trait for recording trust decisions
///
/// Implement this to integrate with your metrics system (Prometheus, etc.)
pub trait TrustMetrics: Send + Sync {
    /// Record a decision outcome
    fn record_decision(&self, action: &str, reason: &str, layer: &str);
    /// Record evaluation latency
    fn record_latency(&self, seconds: f64);
    /// Record a score for a layer ("network", "application" or "combined")
    fn record_score(&self, layer: &str, score: u8);
    /// Record whether a request arrived through the overlay ("authenticated" or "direct")
    fn record_overlay_connection(&self, status: &str);
    /// Record a failed audit write
    fn record_audit_failure(&self);
}

/// No-op metrics implementation for testing
pub struct NoopMetrics;

impl TrustMetrics for NoopMetrics {
    fn record_decision(&self, _action: &str, _reason: &str, _layer: &str) {}
    fn record_latency(&self, _seconds: f64) {}
    fn record_score(&self, _layer: &str, _score: u8) {}
    fn record_overlay_connection(&self, _status: &str) {}
    fn record_audit_failure(&self) {}
}

#[derive(Clone, Hash, Debug, PartialEq, Eq, EncodeLabelSet)]
pub struct DecisionLabels {
    pub action: String,
    pub reason: String,
    pub layer: String,
}

#[derive(Clone, Hash, Debug, PartialEq, Eq, EncodeLabelSet)]
pub struct LayerLabels {
    pub layer: String,
}

#[derive(Clone, Hash, Debug, PartialEq, Eq, EncodeLabelSet)]
pub struct StatusLabels {
    pub status: String,
}

const SCORE_BUCKETS: [f64; 10] = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0];

fn score_histogram() -> Histogram {
    Histogram::new(SCORE_BUCKETS.into_iter())
}

type ScoreFamily = Family<LayerLabels, Histogram, fn() -> Histogram>;

/// Prometheus-backed [`TrustMetrics`]
#[derive(Debug, Clone)]
pub struct PromMetrics {
    pub decisions: Family<DecisionLabels, Counter>,
    pub latency: Histogram,
    pub trust_score: ScoreFamily,
    pub overlay_connections: Family<StatusLabels, Counter>,
    pub audit_failures: Counter,
}

impl PromMetrics {
    pub fn new(registry: &mut Registry) -> Self {
        let decisions = Family::<DecisionLabels, Counter>::default();
        registry.register(
            "zt_decisions",
            "Zero trust decisions",
            decisions.clone(),
        );

        let latency = Histogram::new(exponential_buckets(0.0005, 2.0, 14));
        registry.register(
            "zt_decision_latency_seconds",
            "Decision latency seconds",
            latency.clone(),
        );

        let trust_score: ScoreFamily =
            Family::new_with_constructor(score_histogram as fn() -> Histogram);
        registry.register(
            "zt_trust_score",
            "Trust score distribution",
            trust_score.clone(),
        );

        let overlay_connections = Family::<StatusLabels, Counter>::default();
        registry.register(
            "zt_overlay_connections",
            "Requests by secure overlay status",
            overlay_connections.clone(),
        );

        let audit_failures = Counter::default();
        registry.register(
            "zt_audit_write_failures",
            "Decisions that could not be appended to the audit ring",
            audit_failures.clone(),
        );

        Self {
            decisions,
            latency,
            trust_score,
            overlay_connections,
            audit_failures,
        }
    }
}

impl TrustMetrics for PromMetrics {
    fn record_decision(&self, action: &str, reason: &str, layer: &str) {
        self.decisions
            .get_or_create(&DecisionLabels {
                action: action.to_string(),
                reason: reason.to_string(),
                layer: layer.to_string(),
            })
            .inc();
    }

    fn record_latency(&self, seconds: f64) {
        self.latency.observe(seconds);
    }

    fn record_score(&self, layer: &str, score: u8) {
        self.trust_score
            .get_or_create(&LayerLabels {
                layer: layer.to_string(),
            })
            .observe(f64::from(score));
    }

    fn record_overlay_connection(&self, status: &str) {
        self.overlay_connections
            .get_or_create(&StatusLabels {
                status: status.to_string(),
            })
            .inc();
    }

    fn record_audit_failure(&self) {
        self.audit_failures.inc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus_client::encoding::text::encode;

    #[test]
    fn test_prom_metrics_counts_decisions() {
        let mut registry = Registry::default();
        let metrics = PromMetrics::new(&mut registry);

        metrics.record_decision("allow", "low_risk", "standard");
        metrics.record_decision("allow", "low_risk", "standard");
        metrics.record_decision("deny", "very_high_risk", "standard");
        metrics.record_audit_failure();

        let allow = metrics
            .decisions
            .get_or_create(&DecisionLabels {
                action: "allow".to_string(),
                reason: "low_risk".to_string(),
                layer: "standard".to_string(),
            })
            .get();
        assert_eq!(allow, 2);
        assert_eq!(metrics.audit_failures.get(), 1);
    }

    #[test]
    fn test_prom_metrics_encode() {
        let mut registry = Registry::default();
        let metrics = PromMetrics::new(&mut registry);

        metrics.record_score("combined", 76);
        metrics.record_latency(0.002);
        metrics.record_overlay_connection("authenticated");

        let mut out = String::new();
        encode(&mut out, &registry).unwrap();
        assert!(out.contains("zt_decision_latency_seconds"));
        assert!(out.contains("zt_trust_score_bucket"));
        assert!(out.contains("layer=\"combined\""));
        assert!(out.contains("zt_overlay_connections_total{status=\"authenticated\"} 1"));
    }
}
