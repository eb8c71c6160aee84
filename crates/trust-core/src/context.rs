//! Per-request context consumed by the scorers
//!
//! The transport layer builds a [`RequestContext`] from headers and body
//! hints; nothing here touches a socket.

use crate::fingerprint::device_fingerprint;
use serde::{Deserialize, Serialize};

/// Origin recorded for requests that arrive through the secure overlay
/// without a forwarded client address.
pub const OVERLAY_ORIGIN: &str = "overlay-network";

const UNSPECIFIED_ORIGIN: &str = "0.0.0.0";

/// Attributes of one inbound request
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Client network origin (IP or [`OVERLAY_ORIGIN`])
    pub origin: String,
    pub user_agent: String,
    pub accept_language: String,
    pub platform: Option<String>,
    pub timezone: Option<String>,
    /// The operation targets a sensitive resource
    pub sensitive: bool,
    /// The request arrived via the secure overlay
    pub via_overlay: bool,
    /// Identity attested by the overlay, if any
    pub overlay_identity: Option<String>,
}

impl RequestContext {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            ..Default::default()
        }
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_accept_language(mut self, accept_language: impl Into<String>) -> Self {
        self.accept_language = accept_language.into();
        self
    }

    pub fn with_platform(mut self, platform: impl Into<String>) -> Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn with_sensitive(mut self, sensitive: bool) -> Self {
        self.sensitive = sensitive;
        self
    }

    /// Mark the request as overlay-delivered, optionally with an attested identity
    pub fn with_overlay(mut self, overlay_identity: Option<String>) -> Self {
        self.via_overlay = true;
        self.overlay_identity = overlay_identity.filter(|id| !id.trim().is_empty());
        self
    }

    /// Device fingerprint of the presenting client
    pub fn fingerprint(&self) -> String {
        device_fingerprint(
            &self.user_agent,
            &self.accept_language,
            self.platform.as_deref(),
            self.timezone.as_deref(),
        )
    }
}

/// Pick the client origin for a request
///
/// Order: first `X-Forwarded-For` entry, then the overlay marker when the
/// overlay is active and attested an identity, then the socket address.
pub fn resolve_origin(
    forwarded_for: Option<&str>,
    remote_addr: Option<&str>,
    overlay_identity: Option<&str>,
    overlay_mode: bool,
) -> String {
    if let Some(first) = forwarded_for.and_then(|xff| xff.split(',').next()) {
        let first = first.trim();
        if !first.is_empty() && first != "unknown" {
            return first.to_string();
        }
    }

    if overlay_mode && overlay_identity.is_some_and(|id| !id.trim().is_empty()) {
        return OVERLAY_ORIGIN.to_string();
    }

    remote_addr
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .unwrap_or(UNSPECIFIED_ORIGIN)
        .to_string()
}

/// Whether `resource` falls under one of the sensitive path prefixes
pub fn is_sensitive_resource(resource: &str, prefixes: &[String]) -> bool {
    let resource = if resource.is_empty() { "/" } else { resource };
    prefixes
        .iter()
        .any(|prefix| !prefix.is_empty() && resource.starts_with(prefix.as_str()))
}
