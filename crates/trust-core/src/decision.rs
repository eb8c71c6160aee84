//! Access decision records

use crate::policy::{Action, MonitoringLevel, Policy, Reason, Restriction};
use crate::score::{LayeredScore, Score};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of one evaluation, as returned to the transport and appended to
/// the audit ring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub timestamp: DateTime<Utc>,
    pub identity: String,
    /// Combined score the action was derived from
    pub trust_score: Score,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_score: Option<Score>,
    pub app_score: Score,
    pub resource: String,
    pub action: Action,
    pub restrictions: Vec<Restriction>,
    pub monitoring_level: MonitoringLevel,
    pub reason: Reason,
    /// Whether the deployment scores the secondary (overlay) channel
    pub secondary_channel: bool,
}

impl Decision {
    pub fn new(
        timestamp: DateTime<Utc>,
        identity: impl Into<String>,
        score: &LayeredScore,
        resource: impl Into<String>,
        policy: Policy,
        secondary_channel: bool,
    ) -> Self {
        Self {
            timestamp,
            identity: identity.into(),
            trust_score: score.combined,
            network_score: score.network,
            app_score: score.app,
            resource: resource.into(),
            action: policy.action,
            restrictions: policy.restrictions,
            monitoring_level: policy.monitoring,
            reason: policy.reason,
            secondary_channel,
        }
    }

    /// Check if the decision lets the request through (possibly restricted)
    pub fn is_allowed(&self) -> bool {
        self.action.is_allowed()
    }

    pub fn http_status(&self) -> u16 {
        self.action.http_status()
    }
}
