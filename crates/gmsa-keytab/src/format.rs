//! Binary parsing and encoding of the MIT keytab file format.
//!
//! Structural parsing only: this module understands the envelope (file
//! version, entry framing, principal component encoding) but delegates all
//! cryptographic use of the extracted key material to `gmsa-spnego`.
//!
//! Layout (all integers big-endian), per entry:
//!
//! ```text
//! i32    entry_length        (negative => a deleted "hole", skip |length| bytes)
//! u16    num_components      (v2: does not include the realm)
//! u16    realm_length + realm bytes
//! { u16 component_length + component bytes } * num_components
//! i32    name_type
//! u32    timestamp
//! u8     kvno8
//! u16    enctype
//! u16    key_length + key bytes
//! u32    kvno32              (optional, present if entry_length has room)
//! ```

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use gmsa_types::{AuthError, EncType, KeytabEntry, SecretBytes};

const KEYTAB_MAGIC: u8 = 0x05;
const KEYTAB_VERSION: u8 = 0x02;

/// Parse a full keytab blob into its entries.
///
/// # Errors
///
/// Returns [`AuthError::InvalidKeytab`] if the blob is too short, carries
/// the wrong magic/version, or any entry is truncated or malformed.
pub fn parse(blob: &[u8]) -> Result<Vec<KeytabEntry>, AuthError> {
    if blob.len() < 2 {
        return Err(AuthError::InvalidKeytab);
    }
    let mut cursor = blob;
    let magic = cursor.read_u8().map_err(|_| AuthError::InvalidKeytab)?;
    let version = cursor.read_u8().map_err(|_| AuthError::InvalidKeytab)?;
    if magic != KEYTAB_MAGIC || version != KEYTAB_VERSION {
        return Err(AuthError::InvalidKeytab);
    }

    let mut entries = Vec::new();
    while !cursor.is_empty() {
        if cursor.len() < 4 {
            return Err(AuthError::InvalidKeytab);
        }
        let entry_length = cursor.read_i32::<BigEndian>().map_err(|_| AuthError::InvalidKeytab)?;
        if entry_length == 0 {
            continue;
        }
        let abs_len = entry_length.unsigned_abs() as usize;
        if cursor.len() < abs_len {
            return Err(AuthError::InvalidKeytab);
        }
        let (entry_bytes, rest) = cursor.split_at(abs_len);
        cursor = rest;

        if entry_length < 0 {
            // A "hole" left by a deleted entry; skip it.
            continue;
        }

        entries.push(parse_entry(entry_bytes)?);
    }
    Ok(entries)
}

fn read_lv(cursor: &mut &[u8]) -> Result<String, AuthError> {
    let len = cursor
        .read_u16::<BigEndian>()
        .map_err(|_| AuthError::InvalidKeytab)? as usize;
    if cursor.len() < len {
        return Err(AuthError::InvalidKeytab);
    }
    let (data, rest) = cursor.split_at(len);
    *cursor = rest;
    String::from_utf8(data.to_vec()).map_err(|_| AuthError::InvalidKeytab)
}

fn parse_entry(mut cursor: &[u8]) -> Result<KeytabEntry, AuthError> {
    let num_components = cursor
        .read_u16::<BigEndian>()
        .map_err(|_| AuthError::InvalidKeytab)?;
    let realm = read_lv(&mut cursor)?;

    let mut principal = Vec::with_capacity(num_components as usize);
    for _ in 0..num_components {
        principal.push(read_lv(&mut cursor)?);
    }

    let _name_type = cursor.read_i32::<BigEndian>().map_err(|_| AuthError::InvalidKeytab)?;
    let _timestamp = cursor.read_u32::<BigEndian>().map_err(|_| AuthError::InvalidKeytab)?;
    let kvno8 = cursor.read_u8().map_err(|_| AuthError::InvalidKeytab)?;
    let enctype = cursor.read_u16::<BigEndian>().map_err(|_| AuthError::InvalidKeytab)?;
    let key_length = cursor
        .read_u16::<BigEndian>()
        .map_err(|_| AuthError::InvalidKeytab)? as usize;
    if cursor.len() < key_length {
        return Err(AuthError::InvalidKeytab);
    }
    let (key_bytes, rest) = cursor.split_at(key_length);
    cursor = rest;

    // The 32-bit kvno extension is present only when the entry has trailing
    // room for it; a conformant v2 writer always pads it in when kvno8 would
    // overflow, but readers must tolerate its absence.
    let kvno = if cursor.len() >= 4 {
        cursor.read_u32::<BigEndian>().map_err(|_| AuthError::InvalidKeytab)?
    } else {
        u32::from(kvno8)
    };

    Ok(KeytabEntry {
        principal,
        realm,
        kvno,
        enctype: EncType::from_iana(i32::from(enctype)),
        key: SecretBytes::new(key_bytes.to_vec()),
    })
}

/// Encode entries back into a keytab blob.
///
/// Used by the rotation manager's self-test path and by test fixtures; the
/// directory-supplied keytab in production is typically already encoded.
#[must_use]
pub fn encode(entries: &[KeytabEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    out.push(KEYTAB_MAGIC);
    out.push(KEYTAB_VERSION);

    for entry in entries {
        let mut body = Vec::new();
        body.write_u16::<BigEndian>(entry.principal.len() as u16).expect("Vec write is infallible");
        write_lv(&mut body, &entry.realm);
        for component in &entry.principal {
            write_lv(&mut body, component);
        }
        body.write_i32::<BigEndian>(1).expect("Vec write is infallible"); // name_type: KRB5_NT_PRINCIPAL
        body.write_u32::<BigEndian>(0).expect("Vec write is infallible"); // timestamp
        body.write_u8((entry.kvno % 256) as u8).expect("Vec write is infallible");
        body.write_u16::<BigEndian>(entry.enctype.to_iana() as u16).expect("Vec write is infallible");
        let key = entry.key.expose();
        body.write_u16::<BigEndian>(key.len() as u16).expect("Vec write is infallible");
        body.extend_from_slice(key);
        body.write_u32::<BigEndian>(entry.kvno).expect("Vec write is infallible");

        out.write_i32::<BigEndian>(body.len() as i32).expect("Vec write is infallible");
        out.extend_from_slice(&body);
    }
    out
}

fn write_lv(out: &mut Vec<u8>, s: &str) {
    out.write_u16::<BigEndian>(s.len() as u16).expect("Vec write is infallible");
    out.extend_from_slice(s.as_bytes());
}
