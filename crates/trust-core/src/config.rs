//! Trust engine configuration
//!
//! Parsed from camelCase YAML into [`RawTrustConfig`], then resolved (with
//! defaults, environment overrides and validation) into [`TrustConfig`].

use crate::combiner::Weighting;
use crate::context::is_sensitive_resource;
use crate::score::Layer;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// What to do when the identity state store cannot be reached while scoring
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailMode {
    /// Score with default (empty) state; stateful signals read as neutral
    #[default]
    Open,
    /// Deny with reason `store_unavailable`
    Closed,
    /// Abort the evaluation with an error
    Error,
}

impl FromStr for FailMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(FailMode::Open),
            "closed" => Ok(FailMode::Closed),
            "error" => Ok(FailMode::Error),
            other => anyhow::bail!("unknown store failure mode {:?}", other),
        }
    }
}

/// Raw configuration (parsed from YAML)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawTrustConfig {
    /// Enable the secure-overlay trust channel
    pub secondary_channel: bool,
    /// Share of the combined score taken from the network layer, in percent
    pub network_weight_percent: Option<u8>,
    /// Request-rate window in seconds
    pub rate_window_seconds: Option<u64>,
    /// Requests per window above which the burst penalty applies
    pub burst_threshold: Option<u64>,
    pub business_hours: Option<RawBusinessHours>,
    /// Resource path prefixes treated as sensitive operations
    pub sensitive_prefixes: Option<Vec<String>>,
    /// Per store operation timeout in milliseconds
    pub store_timeout_ms: Option<u64>,
    pub store_failure: FailMode,
    /// Store key of the decision audit ring
    pub audit_log_key: Option<String>,
    /// Redis URL; in-memory state when absent
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawBusinessHours {
    pub start: u32,
    pub end: u32,
}

/// Inclusive range of hours considered normal working time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusinessHours {
    pub start: u32,
    pub end: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self { start: 6, end: 23 }
    }
}

impl BusinessHours {
    pub fn is_off_hours(&self, hour: u32) -> bool {
        hour < self.start || hour > self.end
    }
}

/// Resolved trust engine configuration
#[derive(Debug, Clone)]
pub struct TrustConfig {
    pub secondary_channel: bool,
    pub weighting: Weighting,
    pub rate_window: Duration,
    pub burst_threshold: u64,
    pub business_hours: BusinessHours,
    pub sensitive_prefixes: Vec<String>,
    pub store_timeout: Duration,
    pub store_failure: FailMode,
    pub audit_log_key: String,
    pub redis_url: Option<String>,
}

mod defaults {
    pub const RATE_WINDOW_SECONDS: u64 = 60;
    pub const BURST_THRESHOLD: u64 = 30;
    pub const STORE_TIMEOUT_MS: u64 = 250;
    pub const AUDIT_LOG_KEY: &str = "access_logs";

    pub fn sensitive_prefixes() -> Vec<String> {
        vec!["/admin".to_string()]
    }
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            secondary_channel: false,
            weighting: Weighting::default(),
            rate_window: Duration::from_secs(defaults::RATE_WINDOW_SECONDS),
            burst_threshold: defaults::BURST_THRESHOLD,
            business_hours: BusinessHours::default(),
            sensitive_prefixes: defaults::sensitive_prefixes(),
            store_timeout: Duration::from_millis(defaults::STORE_TIMEOUT_MS),
            store_failure: FailMode::Open,
            audit_log_key: defaults::AUDIT_LOG_KEY.to_string(),
            redis_url: None,
        }
    }
}

impl TryFrom<RawTrustConfig> for TrustConfig {
    type Error = anyhow::Error;

    fn try_from(raw: RawTrustConfig) -> Result<Self> {
        let weighting = match raw.network_weight_percent {
            Some(percent) => Weighting::new(percent)
                .with_context(|| format!("networkWeightPercent {} exceeds 100", percent))?,
            None => Weighting::default(),
        };
        let business_hours = raw
            .business_hours
            .map(|h| BusinessHours {
                start: h.start,
                end: h.end,
            })
            .unwrap_or_default();

        let config = Self {
            secondary_channel: raw.secondary_channel,
            weighting,
            rate_window: Duration::from_secs(
                raw.rate_window_seconds
                    .unwrap_or(defaults::RATE_WINDOW_SECONDS),
            ),
            burst_threshold: raw.burst_threshold.unwrap_or(defaults::BURST_THRESHOLD),
            business_hours,
            sensitive_prefixes: raw
                .sensitive_prefixes
                .unwrap_or_else(defaults::sensitive_prefixes),
            store_timeout: Duration::from_millis(
                raw.store_timeout_ms.unwrap_or(defaults::STORE_TIMEOUT_MS),
            ),
            store_failure: raw.store_failure,
            audit_log_key: raw
                .audit_log_key
                .filter(|k| !k.trim().is_empty())
                .unwrap_or_else(|| defaults::AUDIT_LOG_KEY.to_string()),
            redis_url: raw.redis_url.filter(|u| !u.trim().is_empty()),
        };
        config.validate()?;
        Ok(config)
    }
}

impl TrustConfig {
    /// Load configuration from a YAML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        Self::from_yaml(&contents)
    }

    /// Parse configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let raw: RawTrustConfig =
            serde_yaml::from_str(yaml).with_context(|| "Failed to parse trust config YAML")?;
        Self::try_from(raw)
    }

    /// Apply `TRUST_*` environment overrides
    pub fn with_env_overrides(self) -> Result<Self> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from an arbitrary variable lookup
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(v) = parse::<bool>(&lookup, "TRUST_SECONDARY_CHANNEL")? {
            self.secondary_channel = v;
        }
        if let Some(v) = lookup("TRUST_REDIS_URL").filter(|v| !v.trim().is_empty()) {
            self.redis_url = Some(v);
        }
        if let Some(v) = parse::<FailMode>(&lookup, "TRUST_STORE_FAILURE")? {
            self.store_failure = v;
        }
        if let Some(v) = parse::<u64>(&lookup, "TRUST_STORE_TIMEOUT_MS")? {
            self.store_timeout = Duration::from_millis(v);
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.business_hours.start > self.business_hours.end || self.business_hours.end > 23 {
            anyhow::bail!(
                "businessHours must satisfy start <= end <= 23 (got {}..{})",
                self.business_hours.start,
                self.business_hours.end
            );
        }
        if self.rate_window.is_zero() {
            anyhow::bail!("rateWindowSeconds must be positive");
        }
        if self.store_timeout.is_zero() {
            anyhow::bail!("storeTimeoutMs must be positive");
        }
        Ok(())
    }

    /// Whether `resource` is a sensitive operation under this config
    pub fn is_sensitive(&self, resource: &str) -> bool {
        is_sensitive_resource(resource, &self.sensitive_prefixes)
    }

    pub fn layer(&self) -> Layer {
        if self.secondary_channel {
            Layer::Overlay
        } else {
            Layer::Standard
        }
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("invalid {}={:?}: {}", name, raw, e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = TrustConfig::from_yaml("{}").unwrap();

        assert!(!config.secondary_channel);
        assert_eq!(config.weighting.network_percent(), 30);
        assert_eq!(config.rate_window, Duration::from_secs(60));
        assert_eq!(config.burst_threshold, 30);
        assert_eq!(config.business_hours, BusinessHours { start: 6, end: 23 });
        assert_eq!(config.store_failure, FailMode::Open);
        assert_eq!(config.audit_log_key, "access_logs");
        assert_eq!(config.layer(), Layer::Standard);
        assert!(config.is_sensitive("/admin/panel"));
    }

    #[test]
    fn test_from_yaml() {
        let yaml = r#"
secondaryChannel: true
networkWeightPercent: 40
rateWindowSeconds: 30
burstThreshold: 10
businessHours:
  start: 8
  end: 20
sensitivePrefixes: ["/admin", "/billing"]
storeTimeoutMs: 100
storeFailure: closed
redisUrl: "redis://127.0.0.1:6379"
"#;

        let config = TrustConfig::from_yaml(yaml).unwrap();

        assert!(config.secondary_channel);
        assert_eq!(config.weighting.network_percent(), 40);
        assert_eq!(config.rate_window, Duration::from_secs(30));
        assert_eq!(config.burst_threshold, 10);
        assert!(config.business_hours.is_off_hours(7));
        assert!(config.business_hours.is_off_hours(21));
        assert!(config.is_sensitive("/billing/invoices"));
        assert_eq!(config.store_timeout, Duration::from_millis(100));
        assert_eq!(config.store_failure, FailMode::Closed);
        assert_eq!(config.layer(), Layer::Overlay);
        assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1:6379"));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(TrustConfig::from_yaml("networkWeightPercent: 120").is_err());
        assert!(TrustConfig::from_yaml("businessHours: {start: 22, end: 6}").is_err());
        assert!(TrustConfig::from_yaml("businessHours: {start: 6, end: 24}").is_err());
        assert!(TrustConfig::from_yaml("rateWindowSeconds: 0").is_err());
        assert!(TrustConfig::from_yaml("storeFailure: maybe").is_err());
    }

    #[test]
    fn test_off_hours_boundaries() {
        let hours = BusinessHours::default();
        assert!(hours.is_off_hours(0));
        assert!(hours.is_off_hours(5));
        assert!(!hours.is_off_hours(6));
        assert!(!hours.is_off_hours(14));
        assert!(!hours.is_off_hours(23));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TRUST_SECONDARY_CHANNEL", "true"),
            ("TRUST_STORE_FAILURE", "error"),
            ("TRUST_STORE_TIMEOUT_MS", "75"),
            ("TRUST_REDIS_URL", "redis://cache:6379"),
        ]
        .into_iter()
        .collect();

        let config = TrustConfig::default()
            .apply_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();

        assert!(config.secondary_channel);
        assert_eq!(config.store_failure, FailMode::Error);
        assert_eq!(config.store_timeout, Duration::from_millis(75));
        assert_eq!(config.redis_url.as_deref(), Some("redis://cache:6379"));
    }

    #[test]
    fn test_env_override_rejects_garbage() {
        let err = TrustConfig::default()
            .apply_overrides(|name| (name == "TRUST_STORE_TIMEOUT_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("TRUST_STORE_TIMEOUT_MS"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = TrustConfig::load(Path::new("/nonexistent/trust.yaml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
