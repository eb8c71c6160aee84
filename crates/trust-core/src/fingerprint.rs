//! Device fingerprinting
//!
//! A fingerprint is the SHA-256 of stable client-presented attributes joined
//! in a fixed order: `user_agent | accept_language | platform | timezone`.
//! Absent attributes contribute an empty string.

use sha2::{Digest, Sha256};

const SEPARATOR: &str = "|";

/// Fingerprint for a device, returned as 64 lowercase hex characters
pub fn device_fingerprint(
    user_agent: &str,
    accept_language: &str,
    platform: Option<&str>,
    timezone: Option<&str>,
) -> String {
    let raw = [
        user_agent,
        accept_language,
        platform.unwrap_or(""),
        timezone.unwrap_or(""),
    ]
    .join(SEPARATOR);
    sha256_hex(&raw)
}

/// Compute SHA-256 hash of input string, returned as lowercase hex
pub fn sha256_hex(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let out = hasher.finalize();
    base16ct::lower::encode_string(&out)
}
