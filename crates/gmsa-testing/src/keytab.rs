//! Synthetic MIT keytab fixtures.

use gmsa_types::{EncType, KeytabEntry, SecretBytes};
use rand::RngCore;

fn key_len_for(enctype: EncType) -> usize {
    match enctype {
        EncType::Aes128CtsHmacSha196 | EncType::Aes128CtsHmacSha256128 => 16,
        EncType::Aes256CtsHmacSha196 | EncType::Aes256CtsHmacSha384192 => 32,
        EncType::Rc4Hmac | EncType::Unknown(_) => 16,
    }
}

/// Build one keytab entry for `principal@realm` at `kvno`, with randomized
/// key material of the length `enctype` calls for.
#[must_use]
pub fn entry(principal: &[&str], realm: &str, kvno: u32, enctype: EncType) -> KeytabEntry {
    let mut key = vec![0u8; key_len_for(enctype)];
    rand::thread_rng().fill_bytes(&mut key);
    KeytabEntry {
        principal: principal.iter().map(|s| (*s).to_string()).collect(),
        realm: realm.to_string(),
        kvno,
        enctype,
        key: SecretBytes::new(key),
    }
}

/// Encode entries into a ready-to-store keytab blob.
#[must_use]
pub fn blob(entries: &[KeytabEntry]) -> Vec<u8> {
    gmsa_keytab::format::encode(entries)
}

/// A single `HTTP/<host>@<realm>` entry plus its encoded blob, the shape
/// most login-path tests need.
#[must_use]
pub fn single_http_keytab(host: &str, realm: &str, kvno: u32) -> (Vec<u8>, KeytabEntry) {
    let e = entry(&["HTTP", host], realm, kvno, EncType::Aes256CtsHmacSha196);
    (blob(std::slice::from_ref(&e)), e)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_http_keytab_round_trips_through_parse() {
        let (blob, entry) = single_http_keytab("vault.example.com", "EXAMPLE.COM", 3);
        let parsed = gmsa_keytab::format::parse(&blob).expect("parses");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].principal_with_realm(), entry.principal_with_realm());
        assert_eq!(parsed[0].kvno, 3);
    }

    #[test]
    fn distinct_entries_get_distinct_key_material() {
        let a = entry(&["HTTP", "a"], "EXAMPLE.COM", 1, EncType::Aes256CtsHmacSha196);
        let b = entry(&["HTTP", "b"], "EXAMPLE.COM", 1, EncType::Aes256CtsHmacSha196);
        assert_ne!(a.key.expose(), b.key.expose());
    }
}
