//! PAC (Privilege Attribute Certificate) parsing, per [MS-PAC] §2.3–2.8.
//!
//! A PAC is a `PACTYPE` header (buffer count, version, then an array of
//! `PAC_INFO_BUFFER` descriptors) followed by the buffers themselves, each
//! aligned to an 8-byte boundary. This backend only cares about three
//! buffer types: `LOGON_INFO` (group SIDs), `SERVER_CHECKSUM`, and
//! `KDC_CHECKSUM`. Every other buffer type ([MS-PAC] lists a dozen more —
//! `CLIENT_INFO`, `UPN_DNS_INFO`, delegation info, and so on) is skipped
//! without error, per the "unknown buffer types are skipped" policy.

pub mod logon_info;
pub mod signature;
pub mod sid;

use byteorder::{LittleEndian, ReadBytesExt};
use gmsa_types::AuthError;

use logon_info::LogonInfo;
use signature::SignatureBuffer;

const BUFFER_TYPE_LOGON_INFO: u32 = 1;
const BUFFER_TYPE_SERVER_CHECKSUM: u32 = 6;
const BUFFER_TYPE_KDC_CHECKSUM: u32 = 7;

/// A decoded PAC: the group-membership info plus the two signature
/// buffers, still unverified.
pub struct Pac<'a> {
    /// Group SIDs extracted from `LOGON_INFO`, if that buffer was present.
    pub logon_info: Option<LogonInfo>,
    /// The server (service-key-verified) signature buffer.
    pub server_signature: Option<SignatureBuffer<'a>>,
    /// The KDC (TGT-key-verified) signature buffer, if present — optional
    /// tier per the validator's policy.
    pub kdc_signature: Option<SignatureBuffer<'a>>,
    raw: &'a [u8],
}

impl<'a> Pac<'a> {
    /// The full PAC byte buffer this was parsed from, needed by signature
    /// verification to recompute the HMAC over everything except the
    /// signature fields themselves.
    #[must_use]
    pub fn raw(&self) -> &'a [u8] {
        self.raw
    }
}

/// Parse the authorization-data PAC buffer embedded in a ticket's
/// `EncTicketPart`.
///
/// A missing or empty buffer is not an error at this layer — the caller
/// (the validator) decides whether an absent PAC is acceptable based on
/// whether the target role requires group SIDs at all.
///
/// # Errors
///
/// Returns [`AuthError::PacValidationFailed`] if the buffer is present but
/// its header or buffer-descriptor table is malformed or truncated.
pub fn parse(pac_bytes: &[u8]) -> Result<Pac<'_>, AuthError> {
    if pac_bytes.len() < 8 {
        return Err(AuthError::PacValidationFailed);
    }
    let mut header = &pac_bytes[..8];
    let buffer_count = header.read_u32::<LittleEndian>().map_err(|_| AuthError::PacValidationFailed)?;
    let _version = header.read_u32::<LittleEndian>().map_err(|_| AuthError::PacValidationFailed)?;

    let descriptor_table_len = buffer_count as usize * 16;
    if pac_bytes.len() < 8 + descriptor_table_len {
        return Err(AuthError::PacValidationFailed);
    }

    let mut logon_info = None;
    let mut server_signature = None;
    let mut kdc_signature = None;

    for i in 0..buffer_count as usize {
        let entry = &pac_bytes[8 + i * 16..8 + (i + 1) * 16];
        let mut cursor = entry;
        let ul_type = cursor.read_u32::<LittleEndian>().map_err(|_| AuthError::PacValidationFailed)?;
        let cb_buffer_size = cursor.read_u32::<LittleEndian>().map_err(|_| AuthError::PacValidationFailed)? as usize;
        let offset = cursor.read_u64::<LittleEndian>().map_err(|_| AuthError::PacValidationFailed)? as usize;

        if offset.checked_add(cb_buffer_size).is_none_or(|end| end > pac_bytes.len()) {
            return Err(AuthError::PacValidationFailed);
        }
        let buffer = &pac_bytes[offset..offset + cb_buffer_size];

        match ul_type {
            BUFFER_TYPE_LOGON_INFO => {
                logon_info = Some(logon_info::parse(buffer)?);
            }
            BUFFER_TYPE_SERVER_CHECKSUM => {
                server_signature = Some(signature::parse(buffer)?);
            }
            BUFFER_TYPE_KDC_CHECKSUM => {
                kdc_signature = Some(signature::parse(buffer)?);
            }
            _ => {
                // Unknown buffer type: skipped without error, per policy.
            }
        }
    }

    Ok(Pac { logon_info, server_signature, kdc_signature, raw: pac_bytes })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_pac_is_rejected_as_malformed() {
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn zero_buffer_pac_parses_with_nothing_extracted() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&0u32.to_le_bytes()); // cBuffers
        buf.extend_from_slice(&0u32.to_le_bytes()); // Version
        let pac = parse(&buf).expect("parses");
        assert!(pac.logon_info.is_none());
        assert!(pac.server_signature.is_none());
    }

    #[test]
    fn unknown_buffer_type_is_skipped() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u32.to_le_bytes()); // cBuffers
        buf.extend_from_slice(&0u32.to_le_bytes()); // Version
        // One descriptor: an unknown type pointing past the header.
        buf.extend_from_slice(&999u32.to_le_bytes()); // ulType
        buf.extend_from_slice(&4u32.to_le_bytes()); // cbBufferSize
        buf.extend_from_slice(&24u64.to_le_bytes()); // Offset
        buf.extend_from_slice(&[0xAAu8; 4]); // the unknown buffer's bytes
        let pac = parse(&buf).expect("parses despite unknown buffer type");
        assert!(pac.logon_info.is_none());
    }

    #[test]
    fn out_of_range_offset_is_rejected() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&1u32.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&BUFFER_TYPE_LOGON_INFO.to_le_bytes());
        buf.extend_from_slice(&4u32.to_le_bytes());
        buf.extend_from_slice(&9999u64.to_le_bytes());
        assert!(parse(&buf).is_err());
    }
}
