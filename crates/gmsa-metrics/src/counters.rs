//! Monotonic, per-process, lock-free counters.

use std::sync::atomic::{AtomicU64, Ordering};

use gmsa_types::AuthErrorCode;

const ORDER: Ordering = Ordering::Relaxed;

/// Login and rotation counters for one mount.
///
/// All fields are `AtomicU64` so increments never contend with a lock;
/// readers take a point-in-time snapshot via [`Counters::snapshot`].
#[derive(Debug, Default)]
pub struct Counters {
    logins_total: AtomicU64,
    logins_failed: [AtomicU64; AuthErrorCode::COUNT],
    rotations_total: AtomicU64,
    rotation_failures: AtomicU64,
}

impl Counters {
    /// A fresh, zeroed counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful login.
    pub fn record_login_success(&self) {
        self.logins_total.fetch_add(1, ORDER);
    }

    /// Record one failed login, keyed by its stable error code.
    pub fn record_login_failure(&self, code: AuthErrorCode) {
        self.logins_failed[code as usize].fetch_add(1, ORDER);
    }

    /// Record one successful rotation.
    pub fn record_rotation_success(&self) {
        self.rotations_total.fetch_add(1, ORDER);
    }

    /// Record one failed rotation attempt.
    pub fn record_rotation_failure(&self) {
        self.rotation_failures.fetch_add(1, ORDER);
    }

    /// Total successful logins.
    #[must_use]
    pub fn logins_total(&self) -> u64 {
        self.logins_total.load(ORDER)
    }

    /// Total failed logins, summed across all reasons.
    #[must_use]
    pub fn logins_failed_total(&self) -> u64 {
        self.logins_failed.iter().map(|c| c.load(ORDER)).sum()
    }

    /// Total successful rotations.
    #[must_use]
    pub fn rotations_total(&self) -> u64 {
        self.rotations_total.load(ORDER)
    }

    /// Total failed rotation attempts.
    #[must_use]
    pub fn rotation_failures(&self) -> u64 {
        self.rotation_failures.load(ORDER)
    }

    /// Per-reason failure breakdown, keyed by the stable error code string.
    #[must_use]
    pub fn logins_failed_by_reason(&self) -> std::collections::BTreeMap<&'static str, u64> {
        AuthErrorCode::ALL
            .iter()
            .map(|code| (code.as_str(), self.logins_failed[*code as usize].load(ORDER)))
            .filter(|(_, count)| *count > 0)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_counters_are_zero() {
        let c = Counters::new();
        assert_eq!(c.logins_total(), 0);
        assert_eq!(c.logins_failed_total(), 0);
        assert_eq!(c.rotations_total(), 0);
        assert_eq!(c.rotation_failures(), 0);
    }

    #[test]
    fn login_failures_are_keyed_by_reason() {
        let c = Counters::new();
        c.record_login_failure(AuthErrorCode::InvalidSpnego);
        c.record_login_failure(AuthErrorCode::InvalidSpnego);
        c.record_login_failure(AuthErrorCode::AuthzDenied);

        let by_reason = c.logins_failed_by_reason();
        assert_eq!(by_reason.get("INVALID_SPNEGO"), Some(&2));
        assert_eq!(by_reason.get("AUTHZ_DENIED"), Some(&1));
        assert_eq!(c.logins_failed_total(), 3);
    }

    #[test]
    fn successes_and_failures_count_independently() {
        let c = Counters::new();
        c.record_login_success();
        c.record_login_success();
        c.record_rotation_success();
        c.record_rotation_failure();

        assert_eq!(c.logins_total(), 2);
        assert_eq!(c.rotations_total(), 1);
        assert_eq!(c.rotation_failures(), 1);
    }
}
