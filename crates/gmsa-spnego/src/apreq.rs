//! Kerberos AP-REQ decoding.
//!
//! The inner mechToken SPNEGO hands us is a GSS-API Kerberos token: a
//! 2-byte `TOK_ID` (`0x01 0x00` for an AP-REQ) followed by the DER-encoded
//! `AP-REQ` application tag 14. Ticket and encrypted-data substructures
//! follow the shapes `kerberos-parser` already documents; the AP-REQ
//! envelope itself (application tag 14, `pvno`/`msg-type`/`ap-options`/
//! `ticket`/`authenticator` fields) is parsed here directly since it sits
//! one level up from what that crate exposes.

use der_parser::ber::parse_ber;
use gmsa_types::AuthError;
use kerberos_parser::krb5::{EncryptedData, Ticket};
use kerberos_parser::krb5_parser::{parse_encrypted, parse_krb5_ticket};

const AP_REQ_TOK_ID: [u8; 2] = [0x01, 0x00];

/// A decoded AP-REQ: the service ticket plus the authenticator, still
/// encrypted under keys this module does not have.
pub struct ApReq<'a> {
    /// The ticket, encrypted under the service's long-term key.
    pub ticket: Ticket<'a>,
    /// The authenticator, encrypted under the ticket's session key.
    pub authenticator: EncryptedData<'a>,
}

/// Parse a raw Kerberos mechToken (GSS wrapper + AP-REQ) as extracted from
/// the SPNEGO NegTokenInit.
///
/// # Errors
///
/// Returns [`AuthError::KerberosFailed`] if the token is not a
/// recognizable AP-REQ. Per the collapsing policy, callers never see more
/// detail than that; this function logs the specific parse failure via
/// `tracing::debug!`.
pub fn parse(mech_token: &[u8]) -> Result<ApReq<'_>, AuthError> {
    if mech_token.len() < 2 || mech_token[..2] != AP_REQ_TOK_ID {
        tracing::debug!("mechToken is not an AP-REQ (unexpected TOK_ID)");
        return Err(AuthError::KerberosFailed);
    }
    let der = &mech_token[2..];

    let (_, outer) = parse_ber(der).map_err(|e| {
        tracing::debug!(error = %e, "AP-REQ outer DER parse failed");
        AuthError::KerberosFailed
    })?;

    let fields = outer.as_sequence().map_err(|_| AuthError::KerberosFailed)?;

    let mut ticket_bytes: Option<&[u8]> = None;
    let mut authenticator_bytes: Option<&[u8]> = None;

    for field in fields {
        match field.header.tag().0 {
            // [3] ticket
            3 => {
                if let Ok(inner) = field.as_sequence() {
                    if let Some(obj) = inner.first() {
                        ticket_bytes = obj.as_slice().ok();
                    }
                }
            }
            // [4] authenticator (EncryptedData)
            4 => {
                if let Ok(inner) = field.as_sequence() {
                    if let Some(obj) = inner.first() {
                        authenticator_bytes = obj.as_slice().ok();
                    }
                }
            }
            _ => {}
        }
    }

    let ticket_bytes = ticket_bytes.ok_or(AuthError::KerberosFailed)?;
    let authenticator_bytes = authenticator_bytes.ok_or(AuthError::KerberosFailed)?;

    let (_, ticket) = parse_krb5_ticket(ticket_bytes).map_err(|e| {
        tracing::debug!(error = %e, "AP-REQ ticket parse failed");
        AuthError::KerberosFailed
    })?;
    let (_, authenticator) = parse_encrypted(authenticator_bytes).map_err(|e| {
        tracing::debug!(error = %e, "AP-REQ authenticator parse failed");
        AuthError::KerberosFailed
    })?;

    Ok(ApReq { ticket, authenticator })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_wrong_tok_id() {
        let bad = [0x02, 0x00, 0x30, 0x00];
        assert!(matches!(parse(&bad), Err(AuthError::KerberosFailed)));
    }

    #[test]
    fn rejects_too_short_input() {
        assert!(matches!(parse(&[0x01]), Err(AuthError::KerberosFailed)));
    }

    #[test]
    fn rejects_malformed_der_body() {
        let mut token = AP_REQ_TOK_ID.to_vec();
        token.extend_from_slice(&[0xFF, 0xFF, 0xFF]);
        assert!(matches!(parse(&token), Err(AuthError::KerberosFailed)));
    }
}
