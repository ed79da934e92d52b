//! The transient result of a successful SPNEGO validation.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::sid::Sid;

/// Everything the authorization engine needs about a validated login.
///
/// Never persisted: every login is validated from scratch, so this type
/// only ever lives for the duration of one `LoginHandler` call.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Normalized principal, `name@REALM`.
    pub principal: String,
    /// Normalized realm extracted from the ticket.
    pub realm: String,
    /// The SPN the ticket's `sname` targeted.
    pub spn: String,
    /// Group SIDs extracted from the PAC, if any.
    pub group_sids: BTreeSet<Sid>,
    /// Authenticator timestamp.
    pub authtime: DateTime<Utc>,
    /// Ticket expiry.
    pub endtime: DateTime<Utc>,
    /// Channel-binding comparison outcome: `None` if no binding was
    /// supplied or `allow_channel_binding` is false; `Some(true)` if it
    /// matched, `Some(false)` if it did not (which would already have
    /// failed validation, but the field is retained for audit metadata).
    pub channel_binding_ok: Option<bool>,
    /// Key version number of the keytab entry used to accept the ticket.
    pub kvno: u32,
}
