//! PAC server/KDC signature buffer parsing and verification ([MS-PAC] §2.8).

use byteorder::{LittleEndian, ReadBytesExt};
use gmsa_types::AuthError;

/// `SignatureType` values relevant to the signature buffers this backend
/// verifies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureType {
    /// HMAC-MD5, the legacy RC4-era signature type.
    HmacMd5,
    /// HMAC-SHA1, truncated to 96 bits, used with AES enctypes.
    HmacSha1_96Aes,
    /// Any signature type this backend does not recognize.
    Unknown(u32),
}

impl SignatureType {
    fn from_u32(value: u32) -> Self {
        match value {
            0xFFFF_FF76 => SignatureType::HmacMd5, // KERB_CHECKSUM_HMAC_MD5
            0x0000_0010 => SignatureType::HmacSha1_96Aes, // HMAC_SHA1_96_AES128/256 share this tag family
            other => SignatureType::Unknown(other),
        }
    }
}

/// A parsed `PAC_SIGNATURE_DATA` buffer.
pub struct SignatureBuffer<'a> {
    /// The signature algorithm used.
    pub signature_type: SignatureType,
    /// The signature bytes themselves.
    pub signature: &'a [u8],
    /// Byte offset of `signature` within the buffer this was parsed from,
    /// relative to the start of the signature type field — used by the
    /// caller to zero the signature in place before recomputing it.
    pub signature_offset: usize,
}

/// Parse a `PAC_SIGNATURE_DATA` buffer: a 4-byte `SignatureType` followed
/// by the remaining bytes as the signature (the RODCIdentifier trailer, if
/// present for KDC signatures, is treated as part of the signature value
/// for this backend's purposes since it is not re-verified here).
///
/// # Errors
///
/// Returns [`AuthError::PacValidationFailed`] if the buffer is shorter
/// than the 4-byte type field.
pub fn parse(buf: &[u8]) -> Result<SignatureBuffer<'_>, AuthError> {
    if buf.len() < 4 {
        return Err(AuthError::PacValidationFailed);
    }
    let mut header = &buf[..4];
    let raw_type = header.read_u32::<LittleEndian>().map_err(|_| AuthError::PacValidationFailed)?;
    Ok(SignatureBuffer {
        signature_type: SignatureType::from_u32(raw_type),
        signature: &buf[4..],
        signature_offset: 4,
    })
}

/// Verify a parsed server-signature buffer against the full PAC bytes, with
/// the signature buffer's own signature field zeroed out as [MS-PAC] §2.8.2
/// requires before recomputing the HMAC.
///
/// # Errors
///
/// Returns [`AuthError::PacValidationFailed`] on a mismatch or an
/// unsupported signature type.
pub fn verify(buffer: &SignatureBuffer<'_>, key: &[u8], pac_bytes_with_sig_zeroed: &[u8]) -> Result<(), AuthError> {
    let use_md5 = match buffer.signature_type {
        SignatureType::HmacMd5 => true,
        SignatureType::HmacSha1_96Aes => false,
        SignatureType::Unknown(_) => return Err(AuthError::PacValidationFailed),
    };
    crate::crypto::verify_pac_signature(key, pac_bytes_with_sig_zeroed, buffer.signature, use_md5)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_signature_type_and_bytes() {
        let mut buf = vec![0x10, 0x00, 0x00, 0x00];
        buf.extend_from_slice(&[0xAA; 12]);
        let parsed = parse(&buf).expect("parses");
        assert_eq!(parsed.signature_type, SignatureType::HmacSha1_96Aes);
        assert_eq!(parsed.signature.len(), 12);
    }

    #[test]
    fn rejects_short_buffer() {
        assert!(parse(&[0x01, 0x02]).is_err());
    }

    #[test]
    fn unknown_signature_type_fails_verification() {
        let buffer = SignatureBuffer {
            signature_type: SignatureType::Unknown(99),
            signature: &[0u8; 12],
            signature_offset: 4,
        };
        assert!(verify(&buffer, &[0u8; 16], &[0u8; 32]).is_err());
    }
}
