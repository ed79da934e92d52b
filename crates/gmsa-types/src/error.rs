//! Stable error taxonomy surfaced to operators and audit logs.
//!
//! Every variant here corresponds to exactly one of the stable error codes
//! documented for operators. Display text is intentionally coarse: detailed
//! diagnostics (decryption failure reasons, ASN.1 offsets, clock-skew
//! deltas) belong in `tracing::debug!` events at the call site, never in
//! the externally visible error.

use std::fmt;

use thiserror::Error;

/// Why an authorization request was denied, in the fixed evaluation order
/// realm -> spn -> groups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The validated realm is not in the role's `allowed_realms`.
    Realm,
    /// The target SPN is not in the role's `allowed_spns`.
    Spn,
    /// None of the validated group SIDs intersect the role's `bound_group_sids`.
    Groups,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DenyReason::Realm => "realm",
            DenyReason::Spn => "spn",
            DenyReason::Groups => "groups",
        };
        f.write_str(s)
    }
}

/// Errors surfaced by the authentication core.
///
/// Construction helpers exist on purpose: callers should never build a
/// variant carrying raw SPNEGO bytes, keytab key material, or PAC buffers.
#[derive(Debug, Error)]
pub enum AuthError {
    /// SPNEGO wire encoding is malformed, oversize, or missing the required OID.
    #[error("invalid SPNEGO token")]
    InvalidSpnego,

    /// The stored keytab is missing, unparseable, or has no entry for the
    /// configured SPN@realm.
    #[error("invalid or unparseable keytab")]
    InvalidKeytab,

    /// The AP-REQ could not be validated (bad key, clock skew, expired
    /// ticket, unsupported enctype, replay). The precise cause is
    /// intentionally not part of this error's `Display`.
    #[error("Kerberos authentication failed")]
    KerberosFailed,

    /// The PAC's server signature did not verify.
    #[error("PAC validation failed")]
    PacValidationFailed,

    /// A supplied channel-binding value disagreed with the authenticator's.
    #[error("channel binding mismatch")]
    ChannelBindingMismatch,

    /// The named role does not exist.
    #[error("unknown role")]
    AuthzUnknownRole,

    /// The role's constraints rejected this login.
    #[error("authorization denied: {0}")]
    AuthzDenied(DenyReason),

    /// Operator-supplied `Config` or `Role` failed validation.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The host storage layer returned an error.
    #[error("storage error: {0}")]
    StorageError(String),

    /// A keytab rotation attempt failed. Never propagated to login callers;
    /// only observable through rotation status and metrics.
    #[error("rotation error: {0}")]
    RotationError(String),
}

impl AuthError {
    /// The stable, operator-facing code for this error, as documented.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::InvalidSpnego => "INVALID_SPNEGO",
            AuthError::InvalidKeytab => "INVALID_KEYTAB",
            AuthError::KerberosFailed => "KERBEROS_FAILED",
            AuthError::PacValidationFailed => "PAC_VALIDATION_FAILED",
            AuthError::ChannelBindingMismatch => "CHANNEL_BINDING_MISMATCH",
            AuthError::AuthzUnknownRole => "AUTHZ_UNKNOWN_ROLE",
            AuthError::AuthzDenied(_) => "AUTHZ_DENIED",
            AuthError::ConfigInvalid(_) => "CONFIG_INVALID",
            AuthError::StorageError(_) => "STORAGE_ERROR",
            AuthError::RotationError(_) => "ROTATION_ERROR",
        }
    }

    /// The fixed slot this error occupies in a `logins_failed by reason`
    /// counter array. See [`AuthErrorCode`].
    #[must_use]
    pub fn metric_slot(&self) -> AuthErrorCode {
        AuthErrorCode::from(self)
    }
}

/// Fixed-cardinality discriminant for `AuthError`, used to index
/// `logins_failed` counters without an unbounded label set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum AuthErrorCode {
    /// See [`AuthError::InvalidSpnego`].
    InvalidSpnego = 0,
    /// See [`AuthError::InvalidKeytab`].
    InvalidKeytab = 1,
    /// See [`AuthError::KerberosFailed`].
    KerberosFailed = 2,
    /// See [`AuthError::PacValidationFailed`].
    PacValidationFailed = 3,
    /// See [`AuthError::ChannelBindingMismatch`].
    ChannelBindingMismatch = 4,
    /// See [`AuthError::AuthzUnknownRole`].
    AuthzUnknownRole = 5,
    /// See [`AuthError::AuthzDenied`].
    AuthzDenied = 6,
    /// See [`AuthError::ConfigInvalid`].
    ConfigInvalid = 7,
    /// See [`AuthError::StorageError`].
    StorageError = 8,
    /// See [`AuthError::RotationError`].
    RotationError = 9,
}

impl AuthErrorCode {
    /// Total number of distinct error codes, for fixed-size counter arrays.
    pub const COUNT: usize = 10;

    /// Every variant, in discriminant order. Used to iterate a
    /// fixed-size counter array without constructing dummy `AuthError`s.
    pub const ALL: [AuthErrorCode; Self::COUNT] = [
        AuthErrorCode::InvalidSpnego,
        AuthErrorCode::InvalidKeytab,
        AuthErrorCode::KerberosFailed,
        AuthErrorCode::PacValidationFailed,
        AuthErrorCode::ChannelBindingMismatch,
        AuthErrorCode::AuthzUnknownRole,
        AuthErrorCode::AuthzDenied,
        AuthErrorCode::ConfigInvalid,
        AuthErrorCode::StorageError,
        AuthErrorCode::RotationError,
    ];

    /// The stable operator-facing string for this code, matching
    /// [`AuthError::code`] for the corresponding variant.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AuthErrorCode::InvalidSpnego => "INVALID_SPNEGO",
            AuthErrorCode::InvalidKeytab => "INVALID_KEYTAB",
            AuthErrorCode::KerberosFailed => "KERBEROS_FAILED",
            AuthErrorCode::PacValidationFailed => "PAC_VALIDATION_FAILED",
            AuthErrorCode::ChannelBindingMismatch => "CHANNEL_BINDING_MISMATCH",
            AuthErrorCode::AuthzUnknownRole => "AUTHZ_UNKNOWN_ROLE",
            AuthErrorCode::AuthzDenied => "AUTHZ_DENIED",
            AuthErrorCode::ConfigInvalid => "CONFIG_INVALID",
            AuthErrorCode::StorageError => "STORAGE_ERROR",
            AuthErrorCode::RotationError => "ROTATION_ERROR",
        }
    }
}

impl From<&AuthError> for AuthErrorCode {
    fn from(e: &AuthError) -> Self {
        match e {
            AuthError::InvalidSpnego => AuthErrorCode::InvalidSpnego,
            AuthError::InvalidKeytab => AuthErrorCode::InvalidKeytab,
            AuthError::KerberosFailed => AuthErrorCode::KerberosFailed,
            AuthError::PacValidationFailed => AuthErrorCode::PacValidationFailed,
            AuthError::ChannelBindingMismatch => AuthErrorCode::ChannelBindingMismatch,
            AuthError::AuthzUnknownRole => AuthErrorCode::AuthzUnknownRole,
            AuthError::AuthzDenied(_) => AuthErrorCode::AuthzDenied,
            AuthError::ConfigInvalid(_) => AuthErrorCode::ConfigInvalid,
            AuthError::StorageError(_) => AuthErrorCode::StorageError,
            AuthError::RotationError(_) => AuthErrorCode::RotationError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_documented_strings() {
        assert_eq!(AuthError::InvalidSpnego.code(), "INVALID_SPNEGO");
        assert_eq!(
            AuthError::AuthzDenied(DenyReason::Groups).code(),
            "AUTHZ_DENIED"
        );
        assert_eq!(AuthError::RotationError("x".into()).code(), "ROTATION_ERROR");
    }

    #[test]
    fn error_code_as_str_matches_display_code() {
        for code in AuthErrorCode::ALL {
            let rebuilt = match code {
                AuthErrorCode::InvalidSpnego => AuthError::InvalidSpnego,
                AuthErrorCode::InvalidKeytab => AuthError::InvalidKeytab,
                AuthErrorCode::KerberosFailed => AuthError::KerberosFailed,
                AuthErrorCode::PacValidationFailed => AuthError::PacValidationFailed,
                AuthErrorCode::ChannelBindingMismatch => AuthError::ChannelBindingMismatch,
                AuthErrorCode::AuthzUnknownRole => AuthError::AuthzUnknownRole,
                AuthErrorCode::AuthzDenied => AuthError::AuthzDenied(DenyReason::Realm),
                AuthErrorCode::ConfigInvalid => AuthError::ConfigInvalid(String::new()),
                AuthErrorCode::StorageError => AuthError::StorageError(String::new()),
                AuthErrorCode::RotationError => AuthError::RotationError(String::new()),
            };
            assert_eq!(code.as_str(), rebuilt.code());
        }
    }

    #[test]
    fn deny_reason_display() {
        assert_eq!(DenyReason::Realm.to_string(), "realm");
        assert_eq!(DenyReason::Spn.to_string(), "spn");
        assert_eq!(DenyReason::Groups.to_string(), "groups");
    }

    #[test]
    fn kerberos_failed_display_has_no_detail() {
        // The whole point of collapsing to this variant is that no cause
        // text leaks through Display.
        assert_eq!(AuthError::KerberosFailed.to_string(), "Kerberos authentication failed");
    }
}
