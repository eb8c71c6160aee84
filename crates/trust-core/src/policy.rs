//! Policy decision table
//!
//! Maps a scored request to an action, restrictions, a monitoring tier and an
//! explainable reason code. Tiers have inclusive lower bounds:
//!
//! | combined | action | restrictions | monitoring |
//! |---|---|---|---|
//! | >= 80 | allow | none | normal |
//! | 60..=79 | allow_restricted | read_only | enhanced |
//! | 40..=59 | require_mfa | minimal_access | strict |
//! | < 40 | deny | blocked | alert |
//!
//! With a network layer present the reason is derived from both component
//! scores; the tier never changes.

use crate::score::{LayeredScore, Score};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const ALLOW_MIN: u8 = 80;
pub const RESTRICTED_MIN: u8 = 60;
pub const STEP_UP_MIN: u8 = 40;

/// Network score above which both layers count as trusted at the allow tier
const BOTH_LAYERS_NETWORK_MIN: u8 = 71;
/// Network score from which a suspicious app layer is called out
const SUSPICIOUS_NETWORK_MIN: u8 = 80;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Allow,
    AllowRestricted,
    RequireMfa,
    Deny,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Allow => "allow",
            Action::AllowRestricted => "allow_restricted",
            Action::RequireMfa => "require_mfa",
            Action::Deny => "deny",
        }
    }

    /// Whether the request proceeds (possibly restricted)
    pub fn is_allowed(self) -> bool {
        matches!(self, Action::Allow | Action::AllowRestricted)
    }

    /// HTTP status code the transport should answer with
    pub fn http_status(self) -> u16 {
        match self {
            Action::Allow | Action::AllowRestricted => 200,
            Action::RequireMfa => 428,
            Action::Deny => 403,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Restriction {
    ReadOnly,
    MinimalAccess,
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitoringLevel {
    Normal,
    Enhanced,
    Strict,
    Alert,
}

impl MonitoringLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            MonitoringLevel::Normal => "normal",
            MonitoringLevel::Enhanced => "enhanced",
            MonitoringLevel::Strict => "strict",
            MonitoringLevel::Alert => "alert",
        }
    }
}

/// Stable reason code explaining a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
    LowRisk,
    MidRiskReadonly,
    HighRiskStepup,
    VeryHighRisk,
    HighTrustBothLayers,
    HighTrustAppLayer,
    NetworkTrustedAppSuspicious,
    LowTrustStepupRequired,
    VeryLowTrustBlocked,
    StoreUnavailable,
}

impl Reason {
    pub fn as_str(self) -> &'static str {
        match self {
            Reason::LowRisk => "low_risk",
            Reason::MidRiskReadonly => "mid_risk_readonly",
            Reason::HighRiskStepup => "high_risk_stepup",
            Reason::VeryHighRisk => "very_high_risk",
            Reason::HighTrustBothLayers => "high_trust_both_layers",
            Reason::HighTrustAppLayer => "high_trust_app_layer",
            Reason::NetworkTrustedAppSuspicious => "network_trusted_app_suspicious",
            Reason::LowTrustStepupRequired => "low_trust_stepup_required",
            Reason::VeryLowTrustBlocked => "very_low_trust_blocked",
            Reason::StoreUnavailable => "store_unavailable",
        }
    }
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of the decision table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    pub action: Action,
    pub restrictions: Vec<Restriction>,
    pub monitoring: MonitoringLevel,
    pub reason: Reason,
}

impl Policy {
    fn tier(action: Action, reason: Reason) -> Self {
        let (restrictions, monitoring) = match action {
            Action::Allow => (vec![], MonitoringLevel::Normal),
            Action::AllowRestricted => (vec![Restriction::ReadOnly], MonitoringLevel::Enhanced),
            Action::RequireMfa => (vec![Restriction::MinimalAccess], MonitoringLevel::Strict),
            Action::Deny => (vec![Restriction::Blocked], MonitoringLevel::Alert),
        };
        Self {
            action,
            restrictions,
            monitoring,
            reason,
        }
    }

    /// Fail-closed outcome when state could not be read
    pub fn store_unavailable() -> Self {
        Self::tier(Action::Deny, Reason::StoreUnavailable)
    }
}

/// Action tier for a combined score
pub fn tier(combined: Score) -> Action {
    match combined.value() {
        v if v >= ALLOW_MIN => Action::Allow,
        v if v >= RESTRICTED_MIN => Action::AllowRestricted,
        v if v >= STEP_UP_MIN => Action::RequireMfa,
        _ => Action::Deny,
    }
}

/// Run the decision table
pub fn decide(score: &LayeredScore) -> Policy {
    let action = tier(score.combined);
    let reason = match score.network {
        None => match action {
            Action::Allow => Reason::LowRisk,
            Action::AllowRestricted => Reason::MidRiskReadonly,
            Action::RequireMfa => Reason::HighRiskStepup,
            Action::Deny => Reason::VeryHighRisk,
        },
        Some(network) => match action {
            Action::Allow if network.value() >= BOTH_LAYERS_NETWORK_MIN => {
                Reason::HighTrustBothLayers
            }
            Action::Allow => Reason::HighTrustAppLayer,
            Action::AllowRestricted
                if network.value() >= SUSPICIOUS_NETWORK_MIN
                    && score.app.value() < RESTRICTED_MIN =>
            {
                Reason::NetworkTrustedAppSuspicious
            }
            Action::AllowRestricted => Reason::MidRiskReadonly,
            Action::RequireMfa => Reason::LowTrustStepupRequired,
            Action::Deny => Reason::VeryLowTrustBlocked,
        },
    };
    Policy::tier(action, reason)
}
