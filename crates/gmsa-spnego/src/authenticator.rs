//! `Authenticator` decoding (RFC 4120 §5.3.2) and its embedded GSS
//! checksum, which is where a client-supplied channel-binding value rides.

use chrono::{DateTime, Utc};
use der_parser::ber::parse_ber;
use gmsa_types::AuthError;

/// The `GSS_C_AFFLAGS`-carrying checksum type Microsoft clients use to bind
/// channel-binding data into the authenticator, RFC 4121 §4.1.1.
const GSS_CHECKSUM_TYPE: i64 = 0x8003;

/// Fields of `Authenticator` this backend consults.
pub struct Authenticator {
    /// Time the client generated the authenticator, for clock-skew checks.
    pub ctime: DateTime<Utc>,
    /// Channel-binding bytes extracted from a GSS checksum, if present.
    pub channel_binding: Option<Vec<u8>>,
}

/// Parse a decrypted `Authenticator`.
///
/// # Errors
///
/// Returns [`AuthError::KerberosFailed`] if the structure does not parse.
pub fn parse(plaintext: &[u8]) -> Result<Authenticator, AuthError> {
    let (_, outer) = parse_ber(plaintext).map_err(|_| AuthError::KerberosFailed)?;
    let fields = outer.as_sequence().map_err(|_| AuthError::KerberosFailed)?;

    let mut ctime = None;
    let mut cusec: i64 = 0;
    let mut channel_binding = None;

    for field in fields {
        let tag = field.header.tag().0;
        let inner = field.as_sequence().ok().and_then(|s| s.first());
        match tag {
            // [4] cusec
            4 => cusec = inner.and_then(|o| o.as_i64().ok()).unwrap_or(0),
            // [5] ctime
            5 => {
                if let Some(text) = inner.and_then(|o| o.as_str().ok()) {
                    ctime = crate::parse_kerberos_time(text);
                }
            }
            // [3] cksum (Checksum: cksumtype, checksum)
            3 => {
                if let Some(seq) = inner.and_then(|o| o.as_sequence().ok()) {
                    let cksumtype = seq.first().and_then(|o| o.as_sequence().ok()).and_then(|s| s.first()).and_then(|o| o.as_i64().ok());
                    let checksum_bytes = seq
                        .get(1)
                        .and_then(|o| o.as_sequence().ok())
                        .and_then(|s| s.first())
                        .and_then(|o| o.as_slice().ok());

                    if cksumtype == Some(GSS_CHECKSUM_TYPE) {
                        channel_binding = checksum_bytes.and_then(extract_gss_channel_binding);
                    }
                }
            }
            _ => {}
        }
    }

    let mut ctime = ctime.ok_or(AuthError::KerberosFailed)?;
    ctime += chrono::Duration::microseconds(cusec);

    Ok(Authenticator { ctime, channel_binding })
}

/// GSS checksum layout (RFC 4121 §4.1.1): `u32 Lgth`, `Lgth` bytes `Bnd`
/// (an MD5 hash of the channel-binding structure, 16 bytes when present),
/// `u32 Flags`, then optional delegation/extension fields.
fn extract_gss_channel_binding(checksum: &[u8]) -> Option<Vec<u8>> {
    if checksum.len() < 4 {
        return None;
    }
    let lgth = u32::from_le_bytes([checksum[0], checksum[1], checksum[2], checksum[3]]) as usize;
    if checksum.len() < 4 + lgth {
        return None;
    }
    let bnd = &checksum[4..4 + lgth];
    if bnd.iter().all(|b| *b == 0) {
        // An all-zero Bnd field means the client did not supply channel
        // binding data at all.
        return None;
    }
    Some(bnd.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_der_plaintext() {
        assert!(parse(&[0xFF]).is_err());
    }

    #[test]
    fn all_zero_bnd_field_is_treated_as_absent() {
        let mut checksum = vec![16, 0, 0, 0];
        checksum.extend_from_slice(&[0u8; 16]);
        checksum.extend_from_slice(&[0u8; 4]);
        assert_eq!(extract_gss_channel_binding(&checksum), None);
    }

    #[test]
    fn nonzero_bnd_field_is_extracted() {
        let mut checksum = vec![16, 0, 0, 0];
        checksum.extend_from_slice(&[0xAB; 16]);
        checksum.extend_from_slice(&[0u8; 4]);
        assert_eq!(extract_gss_channel_binding(&checksum), Some(vec![0xAB; 16]));
    }
}
