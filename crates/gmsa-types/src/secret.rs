//! Wrappers that keep sensitive bytes out of `Debug`/log output.
//!
//! Neither wrapper zeroizes on drop: doing that without `unsafe` requires
//! the `zeroize` crate, which this workspace does not yet depend on.
//!
//! TODO: wire `zeroize::Zeroizing` behind a feature flag once a crate-wide
//! decision is made on the dependency (tracked alongside the keytab-key
//! hygiene work in `gmsa-spnego`).

use std::fmt;

use serde::{Deserialize, Serialize};

/// A string that must never appear in logs, `Debug` output, or error text:
/// admin passwords, bearer material in transit, and similar.
#[derive(Clone, Serialize, Deserialize)]
pub struct SecretString(String);

impl SecretString {
    /// Wrap a string as a secret.
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Borrow the underlying string. Callers must not log or echo this.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// True if the wrapped string is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(\"[REDACTED]\")")
    }
}

impl From<String> for SecretString {
    fn from(value: String) -> Self {
        SecretString(value)
    }
}

/// Opaque binary secret material: keytab blobs, encryption keys.
#[derive(Clone, Serialize, Deserialize)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    /// Wrap bytes as a secret.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    /// Borrow the underlying bytes. Callers must not log or echo these.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        &self.0
    }

    /// Length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes({} bytes, [REDACTED])", self.0.len())
    }
}

impl From<Vec<u8>> for SecretBytes {
    fn from(value: Vec<u8>) -> Self {
        SecretBytes(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_string_debug_is_redacted() {
        let s = SecretString::new("hunter2");
        assert_eq!(format!("{s:?}"), "SecretString(\"[REDACTED]\")");
    }

    #[test]
    fn secret_bytes_debug_is_redacted() {
        let s = SecretBytes::new(vec![1, 2, 3, 4]);
        let debug = format!("{s:?}");
        assert!(debug.contains("4 bytes"));
        assert!(!debug.contains('\u{1}'));
    }
}
