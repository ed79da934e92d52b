//! `EncTicketPart` decoding (RFC 4120 §5.3), the plaintext recovered by
//! decrypting a `Ticket`'s `enc_part`.
//!
//! `kerberos-parser` documents the outer `Ticket`/`EncryptedData` shapes
//! but not this nested, decrypted structure, so it is parsed directly here
//! with the same `der-parser` BER primitives the rest of this crate uses.
//! Only the fields the validator needs are extracted: the session key, the
//! client's realm and principal, the validity window, and (if present) the
//! PAC bytes buried in `authorization-data`.

use chrono::{DateTime, Utc};
use der_parser::ber::{parse_ber, BerObject};
use gmsa_types::{AuthError, EncType};

/// AD-IF-RELEVANT, RFC 4120 §5.2.6.1 — wraps authorization data that only
/// matters to applications that understand its inner type.
const AD_IF_RELEVANT: i64 = 1;
/// The Windows PAC element type within an `AD-IF-RELEVANT` wrapper,
/// [MS-PAC] §2.2.
const AD_WIN2K_PAC: i64 = 128;

/// The session key negotiated for this ticket, still tagged with its
/// enctype so the authenticator can be decrypted with the right algorithm.
pub struct SessionKey {
    /// Enctype of `key`.
    pub enctype: EncType,
    /// Raw key bytes.
    pub key: Vec<u8>,
}

/// The fields of `EncTicketPart` this backend consults.
pub struct EncTicketPart {
    /// The negotiated session key.
    pub session_key: SessionKey,
    /// Client realm, `crealm`.
    pub crealm: String,
    /// Client principal name components, `cname`.
    pub cname: Vec<String>,
    /// Ticket validity start.
    pub authtime: DateTime<Utc>,
    /// Ticket validity end.
    pub endtime: DateTime<Utc>,
    /// The raw PAC buffer, if `authorization-data` carried one.
    pub pac: Option<Vec<u8>>,
}

/// Parse a decrypted `EncTicketPart`.
///
/// # Errors
///
/// Returns [`AuthError::KerberosFailed`] if the structure does not parse;
/// callers collapse this to the same error the decryption step itself
/// would have produced, since a ticket that decrypts to garbage is
/// indistinguishable from one decrypted with the wrong key.
pub fn parse(plaintext: &[u8]) -> Result<EncTicketPart, AuthError> {
    let (_, outer) = parse_ber(plaintext).map_err(|_| AuthError::KerberosFailed)?;
    let fields = outer.as_sequence().map_err(|_| AuthError::KerberosFailed)?;

    let mut session_key = None;
    let mut crealm = None;
    let mut cname = None;
    let mut authtime = None;
    let mut endtime = None;
    let mut pac = None;

    for field in fields {
        let tag = field.header.tag().0;
        let inner = field.as_sequence().ok().and_then(|s| s.first());
        match tag {
            // [3] key (EncryptionKey: keytype, keyvalue)
            3 => {
                if let Some(key_seq) = inner.and_then(|o| o.as_sequence().ok()) {
                    let keytype = key_seq.first().and_then(tagged_int).unwrap_or(0);
                    let keyvalue = key_seq.get(1).and_then(tagged_octets).unwrap_or_default();
                    session_key = Some(SessionKey { enctype: EncType::from_iana(keytype as i32), key: keyvalue });
                }
            }
            // [4] crealm
            4 => crealm = inner.and_then(|o| o.as_str().ok()).map(str::to_string),
            // [5] cname (PrincipalName: name-type, name-string)
            5 => {
                if let Some(pn_seq) = inner.and_then(|o| o.as_sequence().ok()) {
                    if let Some(names) = pn_seq.get(1).and_then(|o| o.as_sequence().ok()) {
                        cname = Some(names.iter().filter_map(|n| n.as_str().ok().map(str::to_string)).collect());
                    }
                }
            }
            // [6] transited — unused.
            // [7] authtime
            7 => authtime = inner.and_then(tagged_generalized_time),
            // [10] endtime
            10 => endtime = inner.and_then(tagged_generalized_time),
            // [9] authorization-data: SEQUENCE OF { ad-type, ad-data }
            9 => {
                if let Some(seq) = inner.and_then(|o| o.as_sequence().ok()) {
                    pac = find_pac_in_authorization_data(seq);
                }
            }
            _ => {}
        }
    }

    Ok(EncTicketPart {
        session_key: session_key.ok_or(AuthError::KerberosFailed)?,
        crealm: crealm.ok_or(AuthError::KerberosFailed)?,
        cname: cname.ok_or(AuthError::KerberosFailed)?,
        authtime: authtime.ok_or(AuthError::KerberosFailed)?,
        endtime: endtime.ok_or(AuthError::KerberosFailed)?,
        pac,
    })
}

fn find_pac_in_authorization_data(entries: &[BerObject<'_>]) -> Option<Vec<u8>> {
    for entry in entries {
        let fields = entry.as_sequence().ok()?;
        let ad_type = fields.first().and_then(tagged_int)?;
        let ad_data = fields.get(1).and_then(tagged_octets)?;

        if ad_type == AD_IF_RELEVANT {
            let (_, nested) = parse_ber(&ad_data).ok()?;
            let nested_entries = nested.as_sequence().ok()?;
            for nested_entry in nested_entries {
                let nested_fields = nested_entry.as_sequence().ok()?;
                let nested_type = nested_fields.first().and_then(tagged_int)?;
                if nested_type == AD_WIN2K_PAC {
                    return nested_fields.get(1).and_then(tagged_octets);
                }
            }
        }
    }
    None
}

fn tagged_int(obj: &BerObject<'_>) -> Option<i64> {
    obj.as_sequence().ok().and_then(|s| s.first()).and_then(|o| o.as_i64().ok()).or_else(|| obj.as_i64().ok())
}

fn tagged_octets(obj: &BerObject<'_>) -> Option<Vec<u8>> {
    obj.as_sequence()
        .ok()
        .and_then(|s| s.first())
        .and_then(|o| o.as_slice().ok().map(<[u8]>::to_vec))
        .or_else(|| obj.as_slice().ok().map(<[u8]>::to_vec))
}

fn tagged_generalized_time(obj: &BerObject<'_>) -> Option<DateTime<Utc>> {
    let inner = obj.as_sequence().ok().and_then(|s| s.first()).unwrap_or(obj);
    let text = inner.as_str().ok()?;
    crate::parse_kerberos_time(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_der_plaintext() {
        assert!(parse(&[0xFF, 0xFF, 0xFF]).is_err());
    }

    #[test]
    fn generalized_time_parses_expected_format() {
        let (_, obj) = parse_ber(&{
            // A bare GeneralizedTime value, DER tag 0x18.
            let mut buf = vec![0x18, 15];
            buf.extend_from_slice(b"20260726120000Z");
            buf
        })
        .expect("parses");
        let parsed = tagged_generalized_time(&obj).expect("time parses");
        assert_eq!(parsed.to_string(), "2026-07-26 12:00:00 UTC");
    }
}
