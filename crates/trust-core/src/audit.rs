//! Decision audit ring
//!
//! Decisions are serialized as JSON and pushed to the front of a capped list
//! in the identity state store. Recording is best-effort: the engine logs and
//! counts failures but never fails a decision because of them.

use crate::decision::Decision;
use crate::error::TrustError;
use identity_store::SharedStore;
use tracing::{debug, warn};

/// Maximum number of decisions retained
pub const AUDIT_LOG_CAPACITY: usize = 1000;

/// Appends decisions to the shared audit ring
#[derive(Clone)]
pub struct AuditRecorder {
    store: SharedStore,
    key: String,
}

impl AuditRecorder {
    pub fn new(store: SharedStore, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Append a decision, trimming the ring to its most recent entries
    pub async fn record(&self, decision: &Decision) -> Result<(), TrustError> {
        let entry = serde_json::to_string(decision)
            .map_err(|e| TrustError::AuditWriteFailure(e.to_string()))?;
        self.store
            .list_push_capped(&self.key, &entry, AUDIT_LOG_CAPACITY)
            .await
            .map_err(|e| TrustError::AuditWriteFailure(e.to_string()))?;
        debug!(identity = %decision.identity, reason = %decision.reason, "Recorded decision");
        Ok(())
    }

    /// Up to `limit` most recent decisions, newest first
    ///
    /// Entries that no longer decode are skipped.
    pub async fn recent(&self, limit: usize) -> Result<Vec<Decision>, TrustError> {
        let raw = self
            .store
            .list_range(&self.key, limit.min(AUDIT_LOG_CAPACITY))
            .await?;
        Ok(raw
            .iter()
            .filter_map(|entry| match serde_json::from_str::<Decision>(entry) {
                Ok(decision) => Some(decision),
                Err(e) => {
                    warn!(error = %e, "Skipping undecodable audit entry");
                    None
                }
            })
            .collect())
    }
}
