//! Group SID extraction from the PAC's `LOGON_INFO` buffer.
//!
//! `LOGON_INFO` carries an NDR-marshalled `KERB_VALIDATION_INFO`
//! ([MS-PAC] §2.5). Full NDR unmarshalling (conformant/varying arrays,
//! deferred pointers, unions) is out of scope for what login needs: this
//! reads exactly the fields required to build the group SID set —
//! `LogonDomainId`, `GroupIds` (RIDs relative to the domain SID), and the
//! `ExtraSids` array of absolute SIDs — and ignores the rest of the
//! structure's ~40 other fields.
//!
//! NDR (as MIDL's `-Oicf` mode emits it here) represents this structure as
//! a fixed-size header of scalars and embedded pointers, followed by the
//! deferred data those pointers refer to, in the order the pointers
//! appeared. All integers are little-endian; all scalars are naturally
//! aligned (4-byte alignment for `u32`/pointers, 8-byte for `u64`/`FILETIME`).

use byteorder::{LittleEndian, ReadBytesExt};
use gmsa_types::{AuthError, Sid};
use std::collections::BTreeSet;

use super::sid::parse_rpc_sid;

struct NdrCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> NdrCursor<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn align(&mut self, boundary: usize) {
        let rem = self.pos % boundary;
        if rem != 0 {
            self.pos += boundary - rem;
        }
    }

    fn skip(&mut self, n: usize) -> Result<(), AuthError> {
        if self.buf.len() < self.pos + n {
            return Err(AuthError::PacValidationFailed);
        }
        self.pos += n;
        Ok(())
    }

    fn u32(&mut self) -> Result<u32, AuthError> {
        self.align(4);
        if self.buf.len() < self.pos + 4 {
            return Err(AuthError::PacValidationFailed);
        }
        let mut slice = &self.buf[self.pos..self.pos + 4];
        self.pos += 4;
        slice.read_u32::<LittleEndian>().map_err(|_| AuthError::PacValidationFailed)
    }

    fn u64(&mut self) -> Result<u64, AuthError> {
        self.align(8);
        if self.buf.len() < self.pos + 8 {
            return Err(AuthError::PacValidationFailed);
        }
        let mut slice = &self.buf[self.pos..self.pos + 8];
        self.pos += 8;
        slice.read_u64::<LittleEndian>().map_err(|_| AuthError::PacValidationFailed)
    }

    fn remaining(&self) -> &'a [u8] {
        &self.buf[self.pos.min(self.buf.len())..]
    }
}

/// A group SID and its relative-identifier attributes, as PAC validation
/// info carries them. Attributes are currently unused by authorization but
/// retained for audit completeness.
#[derive(Debug, Clone)]
pub struct GroupMembership {
    /// The resolved group SID.
    pub sid: Sid,
    /// SE_GROUP_* attribute bits, as delivered by the KDC.
    pub attributes: u32,
}

/// Everything `AuthorizationEngine` needs out of `LOGON_INFO`: the set of
/// group SIDs a subject is a member of (domain groups plus any extra SIDs).
#[derive(Debug, Clone, Default)]
pub struct LogonInfo {
    /// All group SIDs, domain-relative and extra, normalized to `S-1-...`.
    pub group_sids: BTreeSet<Sid>,
}

/// Parse the subset of `KERB_VALIDATION_INFO` needed for authorization.
///
/// # Errors
///
/// Returns [`AuthError::PacValidationFailed`] if the buffer is too short
/// or internally inconsistent (a RID count disagreeing with the data that
/// follows, an unparseable embedded SID). A well-formed PAC without any
/// group information at all is not an error — see [`LogonInfo::default`].
pub fn parse(buf: &[u8]) -> Result<LogonInfo, AuthError> {
    let mut cursor = NdrCursor::new(buf);

    // Common NDR header: version + endianness + length fields MIDL always
    // emits ahead of the top-level structure's pointer.
    cursor.skip(8)?;
    // The union/struct referent identifier for the top-level pointer.
    let _referent_id = cursor.u32()?;

    // Fixed scalar prefix of KERB_VALIDATION_INFO up to GroupCount: six
    // FILETIMEs (8 bytes each) then a fixed run of UNICODE_STRING headers
    // (each a 2-byte Length, 2-byte MaximumLength, 4-byte pointer — 8 bytes,
    // 4-byte aligned) for LogonScript/ProfilePath/HomeDirectory/
    // HomeDirectoryDrive, then LogonCount/BadPasswordCount (2 bytes each),
    // UserId/PrimaryGroupId (4 bytes each).
    for _ in 0..6 {
        cursor.u64()?;
    }
    for _ in 0..4 {
        cursor.skip(8)?; // UNICODE_STRING header (Length/MaxLength/pointer)
    }
    cursor.skip(4)?; // LogonCount (u16) + BadPasswordCount (u16), 4-byte aligned
    let _user_id = cursor.u32()?;
    let _primary_group_id = cursor.u32()?;

    let group_count = cursor.u32()?;
    let _group_ids_ptr = cursor.u32()?;

    let _user_flags = cursor.u32()?;
    cursor.skip(16)?; // UserSessionKey (4 x u32)

    for _ in 0..4 {
        cursor.skip(8)?; // LogonServer/LogonDomainName UNICODE_STRING headers
    }
    let _logon_domain_id_ptr = cursor.u32()?;

    cursor.skip(8)?; // Reserved1 (2 x u32)
    let _user_account_control = cursor.u32()?;
    for _ in 0..7 {
        cursor.skip(4)?; // SubAuthStatus + LastSuccessfulILogon + LastFailedILogon + FailedILogonCount + Reserved3
    }

    let sid_count = cursor.u32()?;
    let _extra_sids_ptr = cursor.u32()?;
    let _resource_group_domain_sid_ptr = cursor.u32()?;
    let _resource_group_count = cursor.u32()?;
    let _resource_group_ids_ptr = cursor.u32()?;

    // Deferred data begins here: the domain SID, the GroupIds array, and
    // the ExtraSids array, each prefixed by its own NDR conformant-array
    // length when present.
    let mut group_sids = BTreeSet::new();

    if group_count > 0 || sid_count > 0 {
        // LogonDomainId: conformant RPC_SID (u32 sub-authority count
        // prefix, then the RPC_SID body itself).
        let sub_count = cursor.u32()? as usize;
        let domain_sid_len = 8 + sub_count * 4;
        let domain_sid_bytes = take(&mut cursor, domain_sid_len)?;
        let domain_sid = parse_rpc_sid(domain_sid_bytes)?;

        if group_count > 0 {
            let declared = cursor.u32()? as usize;
            for _ in 0..declared.min(group_count as usize) {
                let rid = cursor.u32()?;
                let attributes = cursor.u32()?;
                let sid = Sid::parse(format!("{domain_sid}-{rid}")).map_err(|_| AuthError::PacValidationFailed)?;
                group_sids.insert(sid);
                let _ = attributes;
            }
        }
    }

    if sid_count > 0 {
        let declared = cursor.u32()? as usize;
        for _ in 0..declared.min(sid_count as usize) {
            let _sid_ptr = cursor.u32()?;
            let _attributes = cursor.u32()?;
        }
        // Each pointer's deferred RPC_SID follows, in order.
        for _ in 0..declared.min(sid_count as usize) {
            let sub_count = cursor.u32()? as usize;
            let sid_len = 8 + sub_count * 4;
            let sid_bytes = take(&mut cursor, sid_len)?;
            group_sids.insert(parse_rpc_sid(sid_bytes)?);
        }
    }

    let _ = cursor.remaining();
    Ok(LogonInfo { group_sids })
}

fn take<'a>(cursor: &mut NdrCursor<'a>, len: usize) -> Result<&'a [u8], AuthError> {
    if cursor.remaining().len() < len {
        return Err(AuthError::PacValidationFailed);
    }
    let slice = &cursor.remaining()[..len];
    cursor.skip(len)?;
    Ok(slice)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_is_rejected() {
        assert!(parse(&[]).is_err());
    }

    #[test]
    fn truncated_header_is_rejected() {
        let buf = vec![0u8; 12];
        assert!(parse(&buf).is_err());
    }
}
