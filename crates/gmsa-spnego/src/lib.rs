//! # gmsa-spnego
//!
//! SPNEGO/Kerberos AP-REQ validation and PAC decoding: the crate backing
//! `SPNEGOValidator` and `PACDecoder`. Everything here is pure and
//! stateless aside from the `Keytab`/`Config` it is handed — a single
//! `validate()` call may run concurrently from any number of callers.
//!
//! Cryptography (AES-CTS decryption, HMAC checksums) is built on the
//! low-level `aes`/`cbc`/`hmac`/`sha1`/`sha2` block-cipher primitives from
//! RustCrypto, but the RFC 3961/3962 key-derivation and ciphertext-stealing
//! logic in `crypto` is this crate's own from-scratch implementation — no
//! Kerberos-aware crypto crate covering that layer was available in this
//! crate's dependency set. See `DESIGN.md` for that tradeoff.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod apreq;
pub mod authenticator;
pub mod channel_binding;
pub mod crypto;
pub mod enc_ticket_part;
pub mod pac;
pub mod spnego;
pub mod validator;

pub use validator::validate;

use chrono::{DateTime, TimeZone, Utc};

/// Parse a `KerberosTime` (a `GeneralizedTime` with no fractional seconds
/// and a trailing `Z`, e.g. `20260726120000Z`), shared by the
/// `EncTicketPart` and `Authenticator` decoders.
pub(crate) fn parse_kerberos_time(text: &str) -> Option<DateTime<Utc>> {
    let digits = text.trim_end_matches('Z');
    if digits.len() != 14 {
        return None;
    }
    let year: i32 = digits[0..4].parse().ok()?;
    let month: u32 = digits[4..6].parse().ok()?;
    let day: u32 = digits[6..8].parse().ok()?;
    let hour: u32 = digits[8..10].parse().ok()?;
    let minute: u32 = digits[10..12].parse().ok()?;
    let second: u32 = digits[12..14].parse().ok()?;
    Utc.with_ymd_and_hms(year, month, day, hour, minute, second).single()
}
