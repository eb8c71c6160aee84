//! Per-identity key layout in the identity state store

/// Store keys holding one identity's behavioral state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityKeys {
    /// Last observed network origin
    pub last_origin: String,
    /// Windowed request counter
    pub access_count: String,
    /// Set of recognised device fingerprints
    pub devices: String,
    /// Most recent combined score (inspection only)
    pub trust_score: String,
}

impl IdentityKeys {
    pub fn new(identity: &str) -> Self {
        Self {
            last_origin: format!("user:{}:last_origin", identity),
            access_count: format!("user:{}:access_count", identity),
            devices: format!("user:{}:devices", identity),
            trust_score: format!("user:{}:trust_score", identity),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_scoped_per_identity() {
        let alice = IdentityKeys::new("alice");
        let bob = IdentityKeys::new("bob");

        assert_eq!(alice.devices, "user:alice:devices");
        assert_ne!(alice.access_count, bob.access_count);
    }
}
