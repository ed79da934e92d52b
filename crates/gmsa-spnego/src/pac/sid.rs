//! Binary `RPC_SID` parsing, per [MS-DTYP] §2.4.2.2.

use byteorder::{LittleEndian, ReadBytesExt};
use gmsa_types::{AuthError, Sid};

/// Parse a binary `RPC_SID` structure into a [`Sid`].
///
/// Layout: `u8 revision`, `u8 sub_authority_count`, `u8[6] identifier_authority`
/// (big-endian, the top 2 bytes are conventionally zero), then
/// `sub_authority_count` little-endian `u32`s.
///
/// # Errors
///
/// Returns [`AuthError::PacValidationFailed`] if the buffer is truncated.
pub fn parse_rpc_sid(buf: &[u8]) -> Result<Sid, AuthError> {
    if buf.len() < 8 {
        return Err(AuthError::PacValidationFailed);
    }
    let revision = buf[0];
    let sub_count = buf[1] as usize;
    let authority = u64::from(buf[2]) << 40
        | u64::from(buf[3]) << 32
        | u64::from(buf[4]) << 24
        | u64::from(buf[5]) << 16
        | u64::from(buf[6]) << 8
        | u64::from(buf[7]);

    let mut cursor = &buf[8..];
    if cursor.len() < sub_count * 4 {
        return Err(AuthError::PacValidationFailed);
    }

    let mut parts = vec![authority.to_string()];
    for _ in 0..sub_count {
        let value = cursor.read_u32::<LittleEndian>().map_err(|_| AuthError::PacValidationFailed)?;
        parts.push(value.to_string());
    }

    let text = format!("S-{revision}-{}", parts.join("-"));
    Sid::parse(text).map_err(|_| AuthError::PacValidationFailed)
}

/// Number of bytes a `RPC_SID` with `sub_authority_count` sub-authorities
/// occupies, for callers that need to advance past one without re-parsing.
#[must_use]
pub fn rpc_sid_len(sub_authority_count: u8) -> usize {
    8 + usize::from(sub_authority_count) * 4
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_rpc_sid(revision: u8, authority: u64, sub_authorities: &[u32]) -> Vec<u8> {
        let mut buf = vec![revision, sub_authorities.len() as u8];
        buf.extend_from_slice(&authority.to_be_bytes()[2..8]);
        for sa in sub_authorities {
            buf.extend_from_slice(&sa.to_le_bytes());
        }
        buf
    }

    #[test]
    fn parses_a_well_formed_sid() {
        let buf = encode_rpc_sid(1, 5, &[21, 1, 2, 3, 1001]);
        let sid = parse_rpc_sid(&buf).expect("parses");
        assert_eq!(sid.as_str(), "S-1-5-21-1-2-3-1001");
    }

    #[test]
    fn rejects_truncated_buffer() {
        let buf = encode_rpc_sid(1, 5, &[21, 1]);
        assert!(parse_rpc_sid(&buf[..buf.len() - 2]).is_err());
    }

    #[test]
    fn len_helper_matches_encoding() {
        let buf = encode_rpc_sid(1, 5, &[21, 1, 2]);
        assert_eq!(rpc_sid_len(3), buf.len());
    }
}
