//! `SPNEGOValidator::validate`: the full nine-step algorithm from token
//! bytes to a [`ValidationResult`].

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, Utc};
use gmsa_keytab::Keytab;
use gmsa_types::{AuthError, Config, ValidationResult};

use crate::{apreq, authenticator, channel_binding, crypto, enc_ticket_part, pac, spnego};
use crate::crypto::key_usage;

/// Validate a base64 SPNEGO token against the current keytab and config,
/// returning the caller's identity and group memberships on success.
///
/// `now` is threaded through explicitly (rather than read from the system
/// clock internally) so tests can exercise clock-skew boundaries
/// deterministically.
///
/// # Errors
///
/// See the module-level documentation for the specific `AuthError` variant
/// each validation step can produce; failures never include the reason in
/// their `Display` text, only in a `tracing::debug!` event at the call
/// site that detected them.
pub fn validate(
    keytab: &Keytab,
    config: &Config,
    spnego_base64: &str,
    channel_binding_base64: Option<&str>,
    now: DateTime<Utc>,
) -> Result<ValidationResult, AuthError> {
    // Steps 1-3: base64/length validation, SPNEGO wrapper, mechType check,
    // mechToken extraction.
    let mech_token = spnego::decode_mech_token(spnego_base64)?;
    let ap_req = apreq::parse(&mech_token)?;

    // Step 4: locate the keytab entry for this ticket's server principal
    // and key version.
    let kvno = ap_req.ticket.enc_part.kvno.unwrap_or(0);
    let entry = keytab
        .entries
        .iter()
        .filter(|e| e.principal == ap_req.ticket.sname.name_string && e.realm == ap_req.ticket.realm.0)
        .filter(|e| kvno == 0 || e.kvno == kvno)
        .max_by_key(|e| e.kvno)
        .ok_or_else(|| {
            tracing::debug!("no keytab entry for ticket sname/realm/kvno");
            AuthError::KerberosFailed
        })?;

    if !entry.enctype.is_supported() {
        tracing::debug!(?entry.enctype, "ticket enctype not supported for decryption");
        return Err(AuthError::KerberosFailed);
    }

    // Step 5: decrypt ticket + authenticator, verify checksums and clock
    // skew.
    let ticket_plain = crypto::decrypt(entry.enctype, entry.key.expose(), key_usage::TICKET, &ap_req.ticket.enc_part.cipher)?;
    let ticket_part = enc_ticket_part::parse(&ticket_plain)?;

    let auth_plain = crypto::decrypt(
        ticket_part.session_key.enctype,
        &ticket_part.session_key.key,
        key_usage::AP_REQ_AUTHENTICATOR,
        &ap_req.authenticator.cipher,
    )?;
    let authenticator = authenticator::parse(&auth_plain)?;

    if !within_clock_skew(authenticator.ctime, now, config.clock_skew_sec) {
        tracing::debug!(ctime = %authenticator.ctime, %now, "authenticator outside clock skew window");
        return Err(AuthError::KerberosFailed);
    }
    if !within_validity_window(now, ticket_part.authtime, ticket_part.endtime) {
        tracing::debug!(authtime = %ticket_part.authtime, endtime = %ticket_part.endtime, %now, "ticket outside validity window");
        return Err(AuthError::KerberosFailed);
    }

    // Step 6: extract and normalize principal/realm.
    let mut normalized_config = config.clone();
    normalized_config.normalize();
    let realm = normalize_realm(&ticket_part.crealm, &normalized_config);
    let principal = format!("{}@{}", ticket_part.cname.join("/"), realm);
    let spn = entry.principal_name();

    // Step 7: PAC group SIDs, if present.
    let mut group_sids = BTreeSet::new();
    if let Some(pac_bytes) = &ticket_part.pac {
        let decoded = pac::parse(pac_bytes)?;
        if let Some(server_sig) = &decoded.server_signature {
            let pac_with_sig_zeroed = zero_signature(decoded.raw(), server_sig);
            pac::signature::verify(server_sig, entry.key.expose(), &pac_with_sig_zeroed)?;
        }
        if let Some(info) = decoded.logon_info {
            group_sids = info.group_sids;
        }
    }

    // Step 8: channel binding.
    let channel_binding_ok = channel_binding::check(
        config.allow_channel_binding,
        channel_binding_base64,
        authenticator.channel_binding.as_deref(),
    )?;

    // Step 9: assemble the result.
    Ok(ValidationResult {
        principal,
        realm,
        spn,
        group_sids,
        authtime: ticket_part.authtime,
        endtime: ticket_part.endtime,
        channel_binding_ok,
        kvno: entry.kvno,
    })
}

/// Whether `ctime` falls within `clock_skew_sec` of `now`, inclusive.
#[must_use]
fn within_clock_skew(ctime: DateTime<Utc>, now: DateTime<Utc>, clock_skew_sec: u32) -> bool {
    let skew = Duration::seconds(i64::from(clock_skew_sec));
    ctime >= now - skew && ctime <= now + skew
}

/// Whether `now` falls within a ticket's `[authtime, endtime]` window,
/// inclusive.
#[must_use]
fn within_validity_window(now: DateTime<Utc>, authtime: DateTime<Utc>, endtime: DateTime<Utc>) -> bool {
    now >= authtime && now <= endtime
}

fn normalize_realm(realm: &str, config: &Config) -> String {
    if config.realm_case_sensitive {
        realm.to_string()
    } else {
        realm.to_uppercase()
    }
}

/// Zero out a signature buffer's bytes within a copy of the full PAC, as
/// [MS-PAC] §2.8.2 requires before recomputing the HMAC over it.
fn zero_signature(pac_bytes: &[u8], buffer: &pac::signature::SignatureBuffer<'_>) -> Vec<u8> {
    let mut copy = pac_bytes.to_vec();
    // `buffer.signature` borrows directly from `pac_bytes`; recover its
    // offset by pointer arithmetic rather than re-deriving buffer layout.
    let base = pac_bytes.as_ptr() as usize;
    let sig_ptr = buffer.signature.as_ptr() as usize;
    let offset = sig_ptr.saturating_sub(base);
    if offset + buffer.signature.len() <= copy.len() {
        for b in &mut copy[offset..offset + buffer.signature.len()] {
            *b = 0;
        }
    }
    copy
}
