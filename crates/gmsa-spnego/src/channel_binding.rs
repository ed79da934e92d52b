//! Channel-binding comparison (step 8 of `SPNEGOValidator::validate`).

use gmsa_types::AuthError;

const MAX_CHANNEL_BINDING_BASE64_LEN: usize = 4 * 1024;

/// Compare a caller-supplied channel-binding value against the one carried
/// in the authenticator, honoring `allow_channel_binding`.
///
/// - If `allow_channel_binding` is `false`, the caller-supplied value (if
///   any) is ignored entirely and this always succeeds with `None`.
/// - If `allow_channel_binding` is `true` and both values are present,
///   they must byte-equal after base64 decoding.
/// - If only one side is present, that is not itself a mismatch: callers
///   and authenticators are not required to carry channel binding, and a
///   missing value on either side simply means there is nothing to check.
///
/// # Errors
///
/// Returns [`AuthError::InvalidSpnego`] if the supplied value is oversize
/// or not valid base64, and [`AuthError::ChannelBindingMismatch`] if both
/// values are present, binding is enforced, and they disagree.
pub fn check(
    allow_channel_binding: bool,
    supplied_base64: Option<&str>,
    authenticator_binding: Option<&[u8]>,
) -> Result<Option<bool>, AuthError> {
    if !allow_channel_binding {
        return Ok(None);
    }

    let Some(supplied_base64) = supplied_base64 else {
        return Ok(None);
    };
    if supplied_base64.len() > MAX_CHANNEL_BINDING_BASE64_LEN {
        return Err(AuthError::InvalidSpnego);
    }
    let supplied = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, supplied_base64)
        .map_err(|_| AuthError::InvalidSpnego)?;

    let Some(authenticator_binding) = authenticator_binding else {
        return Ok(None);
    };

    if constant_time_eq(&supplied, authenticator_binding) {
        Ok(Some(true))
    } else {
        Err(AuthError::ChannelBindingMismatch)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b64(bytes: &[u8]) -> String {
        base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes)
    }

    #[test]
    fn disabled_binding_always_passes() {
        let result = check(false, Some(&b64(b"client-says-x")), Some(b"server-says-y"));
        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn matching_values_pass_when_enabled() {
        let result = check(true, Some(&b64(b"endpoint")), Some(b"endpoint"));
        assert_eq!(result.unwrap(), Some(true));
    }

    #[test]
    fn mismatched_values_fail_when_enabled() {
        let result = check(true, Some(&b64(b"endpoint-a")), Some(b"endpoint-b"));
        assert!(matches!(result, Err(AuthError::ChannelBindingMismatch)));
    }

    #[test]
    fn missing_authenticator_side_is_not_a_mismatch() {
        let result = check(true, Some(&b64(b"endpoint")), None);
        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn missing_supplied_side_is_not_a_mismatch() {
        let result = check(true, None, Some(b"endpoint"));
        assert_eq!(result.unwrap(), None);
    }

    #[test]
    fn oversize_supplied_value_rejected() {
        let huge = "A".repeat(MAX_CHANNEL_BINDING_BASE64_LEN + 1);
        assert!(matches!(check(true, Some(&huge), Some(b"x")), Err(AuthError::InvalidSpnego)));
    }
}
