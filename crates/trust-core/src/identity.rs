//! Identity acquisition
//!
//! The engine consumes an already-verified [`Identity`]. Verification sits
//! behind [`IdentityVerifier`] so deployments can plug in strict checking
//! without touching the scoring path.

use crate::error::VerificationError;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::warn;

/// Authenticated subject and its roles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub roles: Vec<String>,
}

impl Identity {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            roles: Vec::new(),
        }
    }

    pub fn with_roles(mut self, roles: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }
}

/// Turns a presented credential into an [`Identity`]
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> Result<Identity, VerificationError>;
}

/// Bearer credential from an `Authorization` header, falling back to a token
/// carried in the request body
pub fn bearer_token(authorization: Option<&str>, body_token: Option<&str>) -> Option<String> {
    authorization
        .and_then(|h| h.strip_prefix("Bearer "))
        .or(body_token)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Option<String>,
    preferred_username: Option<String>,
    #[serde(default)]
    realm_access: Option<RealmAccess>,
}

#[derive(Debug, Default, Deserialize)]
struct RealmAccess {
    #[serde(default)]
    roles: Vec<String>,
}

/// JWT verifier for OIDC-style access tokens
///
/// The subject is `preferred_username`, falling back to `sub`; roles come from
/// `realm_access.roles`.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Verify signatures with `key` under `algorithm`; `exp` is required.
    /// The audience is only checked once [`with_audience`](Self::with_audience) sets one.
    pub fn new(key: DecodingKey, algorithm: Algorithm) -> Self {
        let mut validation = Validation::new(algorithm);
        validation.validate_aud = false;
        Self { key, validation }
    }

    pub fn with_issuer(mut self, issuer: &str) -> Self {
        self.validation.set_issuer(&[issuer]);
        self
    }

    pub fn with_audience(mut self, audience: &str) -> Self {
        self.validation.set_audience(&[audience]);
        self.validation.validate_aud = true;
        self
    }

    /// Accept any well-formed token without checking its signature or expiry.
    ///
    /// Development only.
    pub fn insecure_unverified() -> Self {
        warn!("JWT signature verification disabled; do not use in production");
        let mut validation = Validation::default();
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        Self {
            key: DecodingKey::from_secret(&[]),
            validation,
        }
    }
}

impl IdentityVerifier for JwtVerifier {
    fn verify(&self, credential: &str) -> Result<Identity, VerificationError> {
        let credential = credential.trim();
        if credential.is_empty() {
            return Err(VerificationError::MissingCredential);
        }

        let data = decode::<Claims>(credential, &self.key, &self.validation)
            .map_err(|e| VerificationError::InvalidToken(e.to_string()))?;
        let claims = data.claims;

        let subject = claims
            .preferred_username
            .or(claims.sub)
            .filter(|s| !s.trim().is_empty())
            .ok_or(VerificationError::MissingSubject)?;
        let roles = claims.realm_access.unwrap_or_default().roles;

        Ok(Identity { subject, roles })
    }
}
