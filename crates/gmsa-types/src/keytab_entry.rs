//! A single (principal, kvno, enctype, key) record within a keytab.

use serde::{Deserialize, Serialize};

use crate::secret::SecretBytes;

/// Kerberos encryption types relevant to gMSA-issued service tickets.
///
/// Numeric values match the IANA Kerberos Encryption Type Numbers registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EncType {
    /// `aes128-cts-hmac-sha1-96` (RFC 3962).
    Aes128CtsHmacSha196,
    /// `aes256-cts-hmac-sha1-96` (RFC 3962).
    Aes256CtsHmacSha196,
    /// `aes128-cts-hmac-sha256-128` (RFC 8009). RFC 8009 uses its own
    /// KDF-HMAC-SHA2 key derivation and truncated HMAC-SHA256/384
    /// checksums, distinct from RFC 3961/3962's n-fold-based derivation;
    /// this core does not implement that derivation (see `is_supported`).
    Aes128CtsHmacSha256128,
    /// `aes256-cts-hmac-sha384-192` (RFC 8009). See
    /// [`EncType::Aes128CtsHmacSha256128`].
    Aes256CtsHmacSha384192,
    /// `rc4-hmac`, the legacy MS-Kerberos enctype. Accepted for mechType
    /// negotiation only; this core does not implement RC4 decryption (see
    /// `SPEC_FULL.md` open-question decisions in `DESIGN.md`).
    Rc4Hmac,
    /// Any enctype this core does not recognize, keyed by its IANA number.
    Unknown(i32),
}

impl EncType {
    /// Decode an IANA enctype number.
    #[must_use]
    pub fn from_iana(value: i32) -> Self {
        match value {
            17 => EncType::Aes128CtsHmacSha196,
            18 => EncType::Aes256CtsHmacSha196,
            19 => EncType::Aes128CtsHmacSha256128,
            20 => EncType::Aes256CtsHmacSha384192,
            23 => EncType::Rc4Hmac,
            other => EncType::Unknown(other),
        }
    }

    /// Re-encode to the IANA enctype number.
    #[must_use]
    pub fn to_iana(self) -> i32 {
        match self {
            EncType::Aes128CtsHmacSha196 => 17,
            EncType::Aes256CtsHmacSha196 => 18,
            EncType::Aes128CtsHmacSha256128 => 19,
            EncType::Aes256CtsHmacSha384192 => 20,
            EncType::Rc4Hmac => 23,
            EncType::Unknown(value) => value,
        }
    }

    /// Whether this core's crypto module can decrypt this enctype.
    ///
    /// Only the RFC 3961/3962 `-hmac-sha1-96` pair is implemented. The
    /// RFC 8009 SHA-2 enctypes use a different (KDF-HMAC-SHA2) key
    /// derivation and are not yet implemented; a keytab entry carrying one
    /// of them is treated the same as `Rc4Hmac` — accepted for mechType
    /// negotiation but rejected before any decryption is attempted.
    #[must_use]
    pub fn is_supported(self) -> bool {
        matches!(self, EncType::Aes128CtsHmacSha196 | EncType::Aes256CtsHmacSha196)
    }
}

/// One entry within a keytab: a key bound to a principal, realm, and kvno.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeytabEntry {
    /// Principal name components, e.g. `["HTTP", "vault.example.com"]`.
    pub principal: Vec<String>,
    /// Realm.
    pub realm: String,
    /// Key version number.
    pub kvno: u32,
    /// Encryption type of `key`.
    pub enctype: EncType,
    /// The key material itself. Never logged.
    pub key: SecretBytes,
}

impl KeytabEntry {
    /// The principal formatted as `name/instance`.
    #[must_use]
    pub fn principal_name(&self) -> String {
        self.principal.join("/")
    }

    /// The principal formatted as `name/instance@REALM`.
    #[must_use]
    pub fn principal_with_realm(&self) -> String {
        format!("{}@{}", self.principal_name(), self.realm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enctype_round_trips_known_values() {
        for iana in [17, 18, 19, 20, 23] {
            assert_eq!(EncType::from_iana(iana).to_iana(), iana);
        }
    }

    #[test]
    fn unknown_enctype_is_not_supported() {
        assert!(!EncType::from_iana(1).is_supported());
        assert!(EncType::Aes256CtsHmacSha196.is_supported());
    }

    #[test]
    fn rfc8009_sha2_enctypes_are_not_yet_supported() {
        assert!(!EncType::Aes128CtsHmacSha256128.is_supported());
        assert!(!EncType::Aes256CtsHmacSha384192.is_supported());
    }

    #[test]
    fn principal_with_realm_formats_correctly() {
        let entry = KeytabEntry {
            principal: vec!["HTTP".into(), "vault.example.com".into()],
            realm: "EXAMPLE.COM".into(),
            kvno: 3,
            enctype: EncType::Aes256CtsHmacSha196,
            key: SecretBytes::new(vec![0u8; 32]),
        };
        assert_eq!(
            entry.principal_with_realm(),
            "HTTP/vault.example.com@EXAMPLE.COM"
        );
    }
}
