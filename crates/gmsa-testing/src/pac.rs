//! Synthetic PAC ([MS-PAC]) buffer construction.
//!
//! Builds exactly the wire bytes `gmsa_spnego::pac::parse` expects: a
//! `PACTYPE` header, a table of `PAC_INFO_BUFFER` descriptors, and the
//! buffers themselves. The `LOGON_INFO` buffer's NDR encoding is written
//! through [`NdrWriter`], whose `align`/`u32`/`u64` rules mirror
//! `gmsa_spnego::pac::logon_info`'s reader field for field, so the two stay
//! in lockstep without either side hardcoding byte offsets.

use byteorder::{LittleEndian, WriteBytesExt};
use hmac::{Hmac, Mac};
use sha1::Sha1;

/// `PAC_INFO_BUFFER.ulType` for the `LOGON_INFO` buffer.
pub const BUFFER_TYPE_LOGON_INFO: u32 = 1;
/// `PAC_INFO_BUFFER.ulType` for the server (service-key) checksum.
pub const BUFFER_TYPE_SERVER_CHECKSUM: u32 = 6;
/// `PAC_INFO_BUFFER.ulType` for the KDC (TGT-key) checksum.
pub const BUFFER_TYPE_KDC_CHECKSUM: u32 = 7;
/// `PAC_SIGNATURE_DATA.SignatureType` for HMAC-SHA1-96 over AES enctypes.
pub const SIGNATURE_TYPE_HMAC_SHA1_96_AES: u32 = 0x0000_0010;

/// A sequential NDR byte writer whose alignment rules mirror the reader's
/// `NdrCursor`: `u32` aligns to 4, `u64` aligns to 8, `skip` pads with
/// zeroed filler and does not itself align.
struct NdrWriter {
    buf: Vec<u8>,
}

impl NdrWriter {
    fn new() -> Self {
        Self { buf: Vec::new() }
    }

    fn align(&mut self, boundary: usize) {
        while self.buf.len() % boundary != 0 {
            self.buf.push(0);
        }
    }

    fn skip(&mut self, n: usize) {
        self.buf.extend(std::iter::repeat(0u8).take(n));
    }

    fn u32(&mut self, v: u32) {
        self.align(4);
        self.buf.write_u32::<LittleEndian>(v).expect("Vec write is infallible");
    }

    fn u64(&mut self, v: u64) {
        self.align(8);
        self.buf.write_u64::<LittleEndian>(v).expect("Vec write is infallible");
    }

    fn bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Encode a binary `RPC_SID`: revision 1, the given sub-authorities, under
/// the NT Authority (`S-1-5-...`).
fn encode_rpc_sid(sub_authorities: &[u32]) -> Vec<u8> {
    let mut out = vec![1u8, sub_authorities.len() as u8, 0, 0, 0, 0, 0, 5];
    for sa in sub_authorities {
        out.write_u32::<LittleEndian>(*sa).expect("Vec write is infallible");
    }
    out
}

/// Build a `LOGON_INFO` buffer carrying the given domain SID, a primary
/// group's RIDs relative to it, and a set of absolute extra SIDs.
///
/// Mirrors `gmsa_spnego::pac::logon_info::parse`'s field order exactly:
/// the fixed `KERB_VALIDATION_INFO` scalar prefix, then the deferred
/// domain SID, `GroupIds` array, and `ExtraSids` array.
#[must_use]
pub fn build_logon_info_buffer(domain_sid_sub_authorities: &[u32], group_rids: &[u32], extra_sids: &[Vec<u32>]) -> Vec<u8> {
    let group_count = group_rids.len() as u32;
    let sid_count = extra_sids.len() as u32;

    let mut w = NdrWriter::new();
    w.skip(8); // common NDR header (version + endianness + length)
    w.u32(0x0002_0000); // top-level referent id

    for _ in 0..6 {
        w.u64(0); // LogonTime/LogoffTime/KickOffTime/PasswordLastSet/PasswordCanChange/PasswordMustChange
    }
    for _ in 0..4 {
        w.skip(8); // LogonScript/ProfilePath/HomeDirectory/HomeDirectoryDrive UNICODE_STRING headers
    }
    w.skip(4); // LogonCount (u16) + BadPasswordCount (u16)
    w.u32(0); // UserId
    w.u32(0); // PrimaryGroupId
    w.u32(group_count);
    w.u32(if group_count > 0 { 0x0002_0004 } else { 0 }); // GroupIds referent
    w.u32(0); // UserFlags
    w.skip(16); // UserSessionKey
    for _ in 0..4 {
        w.skip(8); // LogonServer/LogonDomainName UNICODE_STRING headers
    }
    w.u32(0x0002_0008); // LogonDomainId referent
    w.skip(8); // Reserved1
    w.u32(0); // UserAccountControl
    for _ in 0..7 {
        w.skip(4); // SubAuthStatus/LastSuccessfulILogon/LastFailedILogon/FailedILogonCount/Reserved3
    }
    w.u32(sid_count);
    w.u32(if sid_count > 0 { 0x0002_000c } else { 0 }); // ExtraSids referent
    w.u32(0); // ResourceGroupDomainSid referent
    w.u32(0); // ResourceGroupCount
    w.u32(0); // ResourceGroupIds referent

    if group_count > 0 || sid_count > 0 {
        let domain_sid = encode_rpc_sid(domain_sid_sub_authorities);
        w.u32(domain_sid_sub_authorities.len() as u32);
        w.bytes(&domain_sid);

        if group_count > 0 {
            w.u32(group_count);
            for &rid in group_rids {
                w.u32(rid); // RelativeId
                w.u32(0); // Attributes
            }
        }
    }

    if sid_count > 0 {
        w.u32(sid_count);
        for _ in 0..extra_sids.len() {
            w.u32(0); // deferred RPC_SID referent
            w.u32(0); // Attributes
        }
        for sub_authorities in extra_sids {
            let sid = encode_rpc_sid(sub_authorities);
            w.u32(sub_authorities.len() as u32);
            w.bytes(&sid);
        }
    }

    w.into_inner()
}

/// Build a `PAC_SIGNATURE_DATA` buffer: a 4-byte signature type followed
/// by the signature bytes.
#[must_use]
pub fn build_signature_buffer(signature_type: u32, signature: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(4 + signature.len());
    buf.write_u32::<LittleEndian>(signature_type).expect("Vec write is infallible");
    buf.extend_from_slice(signature);
    buf
}

/// One `PAC_INFO_BUFFER` to include in [`build_pac`].
pub struct PacBuffer {
    /// `ulType`.
    pub ul_type: u32,
    /// The buffer's raw bytes.
    pub bytes: Vec<u8>,
}

/// Assemble a full PAC: an 8-byte header, a descriptor table (one entry
/// per `buffers`), and the buffer bodies themselves, each 8-byte aligned.
#[must_use]
pub fn build_pac(buffers: &[PacBuffer]) -> Vec<u8> {
    let header_len = 8 + buffers.len() * 16;

    let mut bodies = Vec::new();
    let mut descriptors = Vec::new();
    for buffer in buffers {
        while (header_len + bodies.len()) % 8 != 0 {
            bodies.push(0);
        }
        let offset = header_len + bodies.len();
        descriptors.write_u32::<LittleEndian>(buffer.ul_type).expect("Vec write is infallible");
        descriptors.write_u32::<LittleEndian>(buffer.bytes.len() as u32).expect("Vec write is infallible");
        descriptors.write_u64::<LittleEndian>(offset as u64).expect("Vec write is infallible");
        bodies.extend_from_slice(&buffer.bytes);
    }

    let mut out = Vec::with_capacity(header_len + bodies.len());
    out.write_u32::<LittleEndian>(buffers.len() as u32).expect("Vec write is infallible");
    out.write_u32::<LittleEndian>(0).expect("Vec write is infallible"); // Version
    out.extend_from_slice(&descriptors);
    out.extend_from_slice(&bodies);
    out
}

fn hmac_sha1_96(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = <Hmac<Sha1> as Mac>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes()[..12].to_vec()
}

/// Build a PAC carrying one `LOGON_INFO` buffer and a server checksum that
/// actually verifies against `server_key` via HMAC-SHA1-96, the same
/// algorithm `gmsa_spnego::pac::signature::verify` uses for AES enctypes.
///
/// Useful for exercising the full decode-then-verify path without a real
/// KDC-issued ticket.
#[must_use]
pub fn build_signed_logon_info_pac(domain_sid_sub_authorities: &[u32], group_rids: &[u32], extra_sids: &[Vec<u32>], server_key: &[u8]) -> Vec<u8> {
    let logon_info = build_logon_info_buffer(domain_sid_sub_authorities, group_rids, extra_sids);
    let placeholder_sig = build_signature_buffer(SIGNATURE_TYPE_HMAC_SHA1_96_AES, &[0u8; 12]);
    let mut pac = build_pac(&[
        PacBuffer { ul_type: BUFFER_TYPE_LOGON_INFO, bytes: logon_info },
        PacBuffer { ul_type: BUFFER_TYPE_SERVER_CHECKSUM, bytes: placeholder_sig },
    ]);

    // The second descriptor's Offset field locates the checksum buffer;
    // its signature bytes start 4 bytes in, past SignatureType.
    let second_descriptor = 8 + 16;
    let offset = u64::from_le_bytes(pac[second_descriptor + 8..second_descriptor + 16].try_into().expect("8 bytes")) as usize;
    let sig_offset = offset + 4;

    let mac = hmac_sha1_96(server_key, &pac);
    pac[sig_offset..sig_offset + 12].copy_from_slice(&mac);
    pac
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logon_info_buffer_parses_back_with_expected_group_sids() {
        let buf = build_logon_info_buffer(&[21, 1, 2, 3], &[1001, 1002], &[vec![21, 9, 9, 9, 5000]]);
        let info = gmsa_spnego::pac::logon_info::parse(&buf).expect("parses");
        assert_eq!(info.group_sids.len(), 3);
        assert!(info.group_sids.iter().any(|s| s.as_str() == "S-1-5-21-1-2-3-1001"));
        assert!(info.group_sids.iter().any(|s| s.as_str() == "S-1-5-21-1-2-3-1002"));
        assert!(info.group_sids.iter().any(|s| s.as_str() == "S-1-5-21-9-9-9-5000"));
    }

    #[test]
    fn build_pac_round_trips_through_parse() {
        let logon_info = build_logon_info_buffer(&[21, 1, 2, 3], &[1001], &[]);
        let pac = build_pac(&[PacBuffer { ul_type: BUFFER_TYPE_LOGON_INFO, bytes: logon_info }]);
        let decoded = gmsa_spnego::pac::parse(&pac).expect("parses");
        assert!(decoded.logon_info.is_some());
        assert_eq!(decoded.logon_info.unwrap().group_sids.len(), 1);
    }

    #[test]
    fn signed_pac_verifies_against_the_signing_key() {
        let key = [0x42u8; 32];
        let pac = build_signed_logon_info_pac(&[21, 1, 2, 3], &[1001], &[], &key);
        let decoded = gmsa_spnego::pac::parse(&pac).expect("parses");
        let server_sig = decoded.server_signature.expect("present");

        let mut zeroed = pac.clone();
        let base = pac.as_ptr() as usize;
        let sig_ptr = server_sig.signature.as_ptr() as usize;
        let offset = sig_ptr - base;
        for b in &mut zeroed[offset..offset + server_sig.signature.len()] {
            *b = 0;
        }

        gmsa_spnego::pac::signature::verify(&server_sig, &key, &zeroed).expect("verifies");
    }

    #[test]
    fn signed_pac_fails_against_the_wrong_key() {
        let pac = build_signed_logon_info_pac(&[21, 1, 2, 3], &[1001], &[], &[0x42u8; 32]);
        let decoded = gmsa_spnego::pac::parse(&pac).expect("parses");
        let server_sig = decoded.server_signature.expect("present");
        assert!(gmsa_spnego::pac::signature::verify(&server_sig, &[0xAAu8; 32], &pac).is_err());
    }
}
