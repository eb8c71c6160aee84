//! Read-only view of an identity's behavioral state

use crate::score::Score;
use crate::state::IdentityKeys;
use identity_store::{IdentityStore, StoreError};
use serde::{Deserialize, Serialize};

const UNKNOWN_ORIGIN: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_score(score: Score) -> Self {
        match score.value() {
            v if v < 60 => RiskLevel::High,
            v if v < 80 => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

/// Snapshot of an identity's stored state
///
/// A never-seen identity reads as fully trusted until its first evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorSnapshot {
    pub identity: String,
    pub current_score: Score,
    pub last_origin: String,
    /// Requests in the current rate window
    pub recent_access_count: u64,
    pub known_device_count: usize,
    pub risk_level: RiskLevel,
    pub secondary_channel: bool,
}

/// Project the stored state for `identity`
pub async fn lookup(
    store: &dyn IdentityStore,
    identity: &str,
    secondary_channel: bool,
) -> Result<BehaviorSnapshot, StoreError> {
    let keys = IdentityKeys::new(identity);

    let current_score = match store.get(&keys.trust_score).await? {
        None => Score::MAX,
        Some(raw) => raw
            .trim()
            .parse::<i64>()
            .map(Score::clamped)
            .map_err(|_| StoreError::Corrupt {
                key: keys.trust_score.clone(),
                detail: format!("not a score: {:?}", raw),
            })?,
    };
    let last_origin = store
        .get(&keys.last_origin)
        .await?
        .filter(|origin| !origin.is_empty())
        .unwrap_or_else(|| UNKNOWN_ORIGIN.to_string());
    let recent_access_count = store.counter(&keys.access_count).await?;
    let known_device_count = store.set_len(&keys.devices).await?;

    Ok(BehaviorSnapshot {
        identity: identity.to_string(),
        current_score,
        last_origin,
        recent_access_count,
        known_device_count,
        risk_level: RiskLevel::from_score(current_score),
        secondary_channel,
    })
}
