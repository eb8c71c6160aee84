//! Error types for trust evaluation and identity verification

use identity_store::StoreError;
use thiserror::Error;

/// Errors surfaced by the trust engine
///
/// An `Err` means "could not decide", which transports must report
/// differently from a `deny` decision.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrustError {
    #[error("evaluation requested without an identity")]
    MissingIdentity,

    #[error("identity state store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),

    #[error("audit write failed: {0}")]
    AuditWriteFailure(String),
}

impl TrustError {
    /// Whether this error aborts the evaluation ("evaluation failed") as
    /// opposed to being absorbed locally
    pub fn is_evaluation_failure(&self) -> bool {
        matches!(
            self,
            TrustError::MissingIdentity | TrustError::StoreUnavailable(_)
        )
    }
}

/// Errors from turning a bearer credential into an [`Identity`](crate::identity::Identity)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationError {
    #[error("no credential presented")]
    MissingCredential,

    #[error("invalid token: {0}")]
    InvalidToken(String),

    #[error("token carries no subject")]
    MissingSubject,
}
