//! trust-core: continuous authorization for identities behind the gateway
//!
//! Every request from an authenticated identity is scored from its recent
//! behavior and mapped to an access decision. Nothing is trusted because of
//! where it comes from or because it was trusted a moment ago.
//!
//! # Features
//!
//! - **Behavior scoring**: origin changes, off-hours access, request bursts,
//!   sensitive resources and unseen devices each deduct from a base of 100
//! - **Overlay layer**: optionally blends a transport-channel score into the
//!   behavioral one and explains cross-layer disagreements in the reason code
//! - **Decision table**: allow / allow_restricted / require_mfa / deny with
//!   restrictions and a monitoring level
//! - **Audit ring**: the most recent 1000 decisions, newest first
//! - **Fail modes**: open, closed or error when the state store is unreachable
//!
//! # Example
//!
//! ```rust,ignore
//! use trust_core::{Identity, RequestContext, TrustConfig, TrustEngine};
//!
//! let config = TrustConfig::from_yaml("secondaryChannel: true")?.with_env_overrides()?;
//! let store = TrustEngine::open_store(&config).await?;
//! let engine = TrustEngine::new(config, store);
//!
//! let ctx = RequestContext::new("203.0.113.7")
//!     .with_user_agent("Mozilla/5.0")
//!     .with_accept_language("en-US")
//!     .with_sensitive(engine.config().is_sensitive("/admin/users"));
//!
//! let decision = engine.evaluate(&Identity::new("alice"), &ctx, "/admin/users").await?;
//! if !decision.is_allowed() {
//!     println!("{} (HTTP {})", decision.reason, decision.http_status());
//! }
//! ```

pub mod audit;
pub mod behavior;
pub mod clock;
pub mod combiner;
pub mod config;
pub mod context;
pub mod decision;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod metrics;
pub mod policy;
pub mod score;
pub mod scorer;
pub mod state;

// Re-export public types
pub use audit::{AuditRecorder, AUDIT_LOG_CAPACITY};
pub use behavior::{BehaviorSnapshot, RiskLevel};
pub use clock::{Clock, FixedClock, SystemClock};
pub use combiner::{combine, network_score, LayeredScorer, Weighting};
pub use config::{BusinessHours, FailMode, TrustConfig};
pub use context::{is_sensitive_resource, resolve_origin, RequestContext, OVERLAY_ORIGIN};
pub use decision::Decision;
pub use engine::{Health, TrustEngine, TrustEngineBuilder};
pub use error::{TrustError, VerificationError};
pub use fingerprint::{device_fingerprint, sha256_hex};
pub use identity::{bearer_token, Identity, IdentityVerifier, JwtVerifier};
pub use metrics::{NoopMetrics, PromMetrics, TrustMetrics};
pub use policy::{Action, MonitoringLevel, Policy, Reason, Restriction};
pub use score::{Layer, LayeredScore, Score};
pub use scorer::{BehaviorScorer, Signals, TrustScorer};

pub use identity_store::{IdentityStore, MemoryStore, RedisStore, SharedStore, StoreError};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{FailMode, TrustConfig};
    pub use crate::context::RequestContext;
    pub use crate::decision::Decision;
    pub use crate::engine::TrustEngine;
    pub use crate::error::TrustError;
    pub use crate::identity::Identity;
    pub use crate::policy::{Action, Reason};
    pub use crate::score::{Layer, Score};
}
