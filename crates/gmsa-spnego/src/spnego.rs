//! SPNEGO (`NegTokenInit`/`NegTokenResp`) wrapper parsing.
//!
//! A client's first leg is always a `NegTokenInit` carrying the list of
//! supported mechanisms and (in the common, optimistic case) the mechToken
//! for the first one. This module checks that SPNEGO and Kerberos V5 are
//! both present and hands back the raw mechToken bytes; it does not
//! attempt full negotiation (there is exactly one mechanism this backend
//! ever accepts, so there is nothing to negotiate).

use der_parser::ber::{BerObject, BerObjectContent};
use der_parser::oid::Oid;
use gmsa_types::AuthError;

/// The SPNEGO mechanism OID, RFC 4178.
const SPNEGO_OID: &str = "1.3.6.1.5.5.2";
/// Kerberos V5, RFC 4121.
const KRB5_OID: &str = "1.2.840.113554.1.2.2";
/// The legacy "MS Kerberos" OID some older Windows clients still offer
/// alongside the standard one.
const MS_KRB5_OID: &str = "1.2.840.48018.1.2.2";

const MAX_SPNEGO_BASE64_LEN: usize = 64 * 1024;

/// Decode and validate a base64 SPNEGO token, returning the inner Kerberos
/// AP-REQ mechToken bytes.
///
/// # Errors
///
/// Returns [`AuthError::InvalidSpnego`] if the input is oversize, not valid
/// base64, not a well-formed SPNEGO `NegTokenInit`, or does not offer
/// Kerberos V5 as a mechanism.
pub fn decode_mech_token(spnego_base64: &str) -> Result<Vec<u8>, AuthError> {
    if spnego_base64.len() > MAX_SPNEGO_BASE64_LEN {
        return Err(AuthError::InvalidSpnego);
    }
    let raw = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, spnego_base64)
        .map_err(|_| AuthError::InvalidSpnego)?;

    // The wire form is a GSS-API "initial context token": an
    // application-tag-0 wrapper (0x60) containing the mechanism OID for
    // SPNEGO followed by the NegTokenInit SEQUENCE, or (for a bare
    // NegTokenResp on a later leg) a context-tag-1 SEQUENCE directly. We
    // accept either by scanning for the first BER SEQUENCE/constructed
    // object and walking its children looking for the mechTypes list and
    // mechToken, rather than insisting on one exact top-level shape.
    let (_, top) = der_parser::ber::parse_ber(&raw).map_err(|_| AuthError::InvalidSpnego)?;

    let neg_token = find_neg_token_init(&top).ok_or(AuthError::InvalidSpnego)?;
    let (mech_types, mech_token) = extract_fields(neg_token)?;

    if !mech_types.iter().any(is_acceptable_krb5_oid) {
        return Err(AuthError::InvalidSpnego);
    }

    mech_token.ok_or(AuthError::InvalidSpnego)
}

fn is_acceptable_krb5_oid(oid: &Oid<'_>) -> bool {
    let s = oid.to_string();
    s == KRB5_OID || s == MS_KRB5_OID
}

/// Walk down through the GSS wrapper/context tags to the NegTokenInit (or
/// NegTokenResp) SEQUENCE, whichever is present.
fn find_neg_token_init<'a>(obj: &'a BerObject<'a>) -> Option<&'a BerObject<'a>> {
    match &obj.content {
        BerObjectContent::Unknown(_) | BerObjectContent::Sequence(_) if obj.header.tag().0 == 16 => Some(obj),
        _ => {
            // Application/context-constructed wrappers: descend into the
            // first child that itself contains a sequence, skipping a
            // leading SPNEGO OID child if present at this level.
            let children = obj.as_sequence().ok()?;
            for child in children {
                if child.header.tag().0 == 6 {
                    // an OID, e.g. the SPNEGO mechanism OID in the GSS
                    // wrapper; not itself the NegTokenInit.
                    continue;
                }
                if child.header.tag().0 == 16 {
                    return Some(child);
                }
                if let Some(found) = find_neg_token_init(child) {
                    return Some(found);
                }
            }
            None
        }
    }
}

/// Extract the `mechTypes` OID list and the `mechToken` octet string from a
/// NegTokenInit/NegTokenResp SEQUENCE. Fields are optional and
/// context-tagged; we match by BER context tag number rather than position
/// to tolerate either token shape.
fn extract_fields<'a>(neg_token: &'a BerObject<'a>) -> Result<(Vec<Oid<'a>>, Option<Vec<u8>>), AuthError> {
    let mut mech_types = Vec::new();
    let mut mech_token = None;

    let fields = neg_token.as_sequence().map_err(|_| AuthError::InvalidSpnego)?;
    for field in fields {
        let tag = field.header.tag().0;
        let inner = field.as_sequence().ok().and_then(|s| s.first());
        match tag {
            // [0] mechTypes (NegTokenInit) — SEQUENCE OF OID.
            0 => {
                if let Some(seq_obj) = inner {
                    if let Ok(items) = seq_obj.as_sequence() {
                        for item in items {
                            if let Ok(oid) = item.as_oid() {
                                mech_types.push(oid.clone());
                            }
                        }
                    }
                }
            }
            // [2] mechToken (NegTokenInit).
            2 => {
                if let Some(token_obj) = inner {
                    if let Ok(bytes) = token_obj.as_slice() {
                        mech_token = Some(bytes.to_vec());
                    }
                }
            }
            // [3] responseToken (NegTokenResp) — same shape as mechToken.
            3 => {
                if let Some(token_obj) = inner {
                    if let Ok(bytes) = token_obj.as_slice() {
                        mech_token = Some(bytes.to_vec());
                    }
                }
            }
            _ => {}
        }
    }

    Ok((mech_types, mech_token))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversize_token_rejected_before_decoding() {
        let huge = "A".repeat(MAX_SPNEGO_BASE64_LEN + 1);
        assert!(matches!(decode_mech_token(&huge), Err(AuthError::InvalidSpnego)));
    }

    #[test]
    fn invalid_base64_rejected() {
        assert!(matches!(decode_mech_token("not valid base64!!"), Err(AuthError::InvalidSpnego)));
    }

    #[test]
    fn empty_string_rejected() {
        assert!(matches!(decode_mech_token(""), Err(AuthError::InvalidSpnego)));
    }

    #[test]
    fn garbage_der_rejected() {
        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, [0xDE, 0xAD, 0xBE, 0xEF]);
        assert!(matches!(decode_mech_token(&encoded), Err(AuthError::InvalidSpnego)));
    }
}
