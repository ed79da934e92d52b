//! Backend configuration: realm, KDCs, SPN, keytab, and normalization policy.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::secret::SecretBytes;

static REALM_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9.-]+$").expect("static realm pattern is valid"));

const MAX_KDCS: usize = 10;
const MAX_CLOCK_SKEW_SEC: u32 = 600;
const DEFAULT_CLOCK_SKEW_SEC: u32 = 300;

/// Per-mount backend configuration.
///
/// A `Config` is the unit of atomic replacement: any mutation that changes
/// `realm`, `spn`, or `keytab` produces a brand-new `Config` rather than
/// mutating fields in place, so callers never observe a torn state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Kerberos realm, conventionally uppercase (e.g. `EXAMPLE.COM`).
    pub realm: String,
    /// Ordered list of KDC `host[:port]` strings, at most 10.
    pub kdcs: Vec<String>,
    /// Service principal name, `SERVICE/host[:port]`.
    pub spn: String,
    /// The current service keytab, base64 on the wire.
    pub keytab: SecretBytes,
    /// Acceptable clock skew for authenticator timestamps, in seconds.
    pub clock_skew_sec: u32,
    /// Whether to enforce TLS channel binding when supplied.
    pub allow_channel_binding: bool,
    /// Uppercase-normalize the realm.
    pub realm_case_sensitive: bool,
    /// Uppercase-normalize the SPN's service component.
    pub spn_case_sensitive: bool,
    /// Realm suffixes to strip during normalization.
    pub realm_suffixes: Vec<String>,
    /// SPN suffixes to strip during normalization.
    pub spn_suffixes: Vec<String>,
}

impl Config {
    /// Construct a `Config` with the documented defaults for optional fields.
    #[must_use]
    pub fn new(realm: impl Into<String>, spn: impl Into<String>, keytab: Vec<u8>) -> Self {
        Self {
            realm: realm.into(),
            kdcs: Vec::new(),
            spn: spn.into(),
            keytab: SecretBytes::new(keytab),
            clock_skew_sec: DEFAULT_CLOCK_SKEW_SEC,
            allow_channel_binding: false,
            realm_case_sensitive: true,
            spn_case_sensitive: true,
            realm_suffixes: Vec::new(),
            spn_suffixes: Vec::new(),
        }
    }

    /// Set the KDC list.
    #[must_use]
    pub fn with_kdcs(mut self, kdcs: Vec<String>) -> Self {
        self.kdcs = kdcs;
        self
    }

    /// Set the allowed clock skew in seconds.
    #[must_use]
    pub fn with_clock_skew_sec(mut self, secs: u32) -> Self {
        self.clock_skew_sec = secs;
        self
    }

    /// Enable or disable channel-binding enforcement.
    #[must_use]
    pub fn with_channel_binding(mut self, allow: bool) -> Self {
        self.allow_channel_binding = allow;
        self
    }

    /// Normalize realm/SPN casing and suffixes in place per the configured
    /// flags. Idempotent: calling this twice produces the same result as
    /// calling it once.
    pub fn normalize(&mut self) {
        for suffix in &self.realm_suffixes {
            if let Some(stripped) = self.realm.strip_suffix(suffix.as_str()) {
                self.realm = stripped.to_string();
            }
        }
        if !self.realm_case_sensitive {
            self.realm = self.realm.to_uppercase();
        }

        for suffix in &self.spn_suffixes {
            if let Some(stripped) = self.spn.strip_suffix(suffix.as_str()) {
                self.spn = stripped.to_string();
            }
        }
        if !self.spn_case_sensitive {
            if let Some((service, rest)) = self.spn.split_once('/') {
                self.spn = format!("{}/{}", service.to_uppercase(), rest);
            }
        }
    }

    /// Validate the shape of this config, independent of keytab parseability
    /// (which requires the `gmsa-keytab` crate and is checked by
    /// `ConfigStore::put`).
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigInvalid`] describing the first violated
    /// constraint.
    pub fn validate_shape(&self) -> Result<(), AuthError> {
        if self.realm.is_empty() || !REALM_PATTERN.is_match(&self.realm) {
            return Err(AuthError::ConfigInvalid(format!(
                "realm must match [A-Z0-9.-]+ (uppercase; set realm_case_sensitive=false to normalize automatically), got {:?}",
                self.realm
            )));
        }
        if self.kdcs.len() > MAX_KDCS {
            return Err(AuthError::ConfigInvalid(format!(
                "kdcs must contain at most {MAX_KDCS} entries, got {}",
                self.kdcs.len()
            )));
        }
        if self.spn.is_empty() || !self.spn.contains('/') {
            return Err(AuthError::ConfigInvalid(format!(
                "spn must be of the form SERVICE/host[:port], got {:?}",
                self.spn
            )));
        }
        if self.keytab.is_empty() {
            return Err(AuthError::ConfigInvalid("keytab must not be empty".into()));
        }
        if self.clock_skew_sec > MAX_CLOCK_SKEW_SEC {
            return Err(AuthError::ConfigInvalid(format!(
                "clock_skew_sec must be 0..={MAX_CLOCK_SKEW_SEC}, got {}",
                self.clock_skew_sec
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config::new("EXAMPLE.COM", "HTTP/vault.example.com", vec![1, 2, 3])
    }

    #[test]
    fn defaults_validate() {
        assert!(base().validate_shape().is_ok());
    }

    #[test]
    fn rejects_too_many_kdcs() {
        let cfg = base().with_kdcs((0..11).map(|i| format!("kdc{i}")).collect());
        assert!(cfg.validate_shape().is_err());
    }

    #[test]
    fn accepts_exactly_ten_kdcs() {
        let cfg = base().with_kdcs((0..10).map(|i| format!("kdc{i}")).collect());
        assert!(cfg.validate_shape().is_ok());
    }

    #[test]
    fn rejects_clock_skew_over_max() {
        let cfg = base().with_clock_skew_sec(601);
        assert!(cfg.validate_shape().is_err());
    }

    #[test]
    fn accepts_clock_skew_at_max() {
        let cfg = base().with_clock_skew_sec(600);
        assert!(cfg.validate_shape().is_ok());
    }

    #[test]
    fn rejects_lowercase_realm_when_case_sensitive_and_not_normalized() {
        let mut cfg = base();
        cfg.realm = "example.com".into();
        // realm_case_sensitive defaults to true, so normalize() would not
        // uppercase this realm; validate_shape must catch it on its own.
        assert!(cfg.validate_shape().is_err());
    }

    #[test]
    fn accepts_lowercase_realm_after_normalizing_with_case_insensitive_flag() {
        let mut cfg = base();
        cfg.realm = "example.com".into();
        cfg.realm_case_sensitive = false;
        cfg.normalize();
        assert!(cfg.validate_shape().is_ok());
    }

    #[test]
    fn normalize_is_idempotent() {
        let mut cfg = base();
        cfg.realm_case_sensitive = false;
        cfg.realm = "example.com".into();
        cfg.normalize();
        let once = cfg.realm.clone();
        cfg.normalize();
        assert_eq!(cfg.realm, once);
        assert_eq!(cfg.realm, "EXAMPLE.COM");
    }

    #[test]
    fn normalize_strips_suffixes() {
        let mut cfg = base();
        cfg.realm = "host.example.com".into();
        cfg.realm_suffixes = vec![".example.com".into()];
        cfg.normalize();
        assert_eq!(cfg.realm, "host");
    }

    #[test]
    fn normalize_uppercases_spn_service_only() {
        let mut cfg = base();
        cfg.spn = "http/vault.example.com".into();
        cfg.spn_case_sensitive = false;
        cfg.normalize();
        assert_eq!(cfg.spn, "HTTP/vault.example.com");
    }

    proptest::proptest! {
        /// For all configs, normalization is idempotent: `normalize(normalize(c)) == normalize(c)`.
        #[test]
        fn normalize_is_idempotent_for_arbitrary_realm_and_spn(
            realm in "[A-Za-z0-9.-]{1,30}",
            spn_service in "[A-Za-z0-9]{1,10}",
            spn_host in "[A-Za-z0-9.-]{1,20}",
            realm_case_sensitive in proptest::bool::ANY,
            spn_case_sensitive in proptest::bool::ANY,
        ) {
            let mut cfg = base();
            cfg.realm = realm;
            cfg.spn = format!("{spn_service}/{spn_host}");
            cfg.realm_case_sensitive = realm_case_sensitive;
            cfg.spn_case_sensitive = spn_case_sensitive;

            cfg.normalize();
            let once = (cfg.realm.clone(), cfg.spn.clone());
            cfg.normalize();
            let twice = (cfg.realm.clone(), cfg.spn.clone());
            proptest::prop_assert_eq!(once, twice);
        }
    }
}
