//! Serializable point-in-time view for `health` and `metrics` endpoints.

use std::collections::BTreeMap;

use gmsa_types::RotationStatus;
use serde::Serialize;

use crate::counters::Counters;

/// Backend identity, reported once per snapshot so operators can confirm
/// which build and feature set they're talking to.
#[derive(Debug, Clone, Serialize)]
pub struct BackendInfo {
    /// Crate version, from `CARGO_PKG_VERSION` at build time.
    pub version: &'static str,
    /// Compile-time enabled optional features (currently always empty;
    /// reserved for a future cargo-feature-gated enctype or transport).
    pub features: Vec<&'static str>,
}

impl Default for BackendInfo {
    fn default() -> Self {
        Self { version: env!("CARGO_PKG_VERSION"), features: Vec::new() }
    }
}

/// Liveness and counter snapshot for one mount, as returned by `health`
/// and `metrics`.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Always `true` if this value could be produced at all.
    pub alive: bool,
    /// Backend version/feature info.
    pub backend: BackendInfo,
    /// Total successful logins.
    pub logins_total: u64,
    /// Total failed logins, summed across all reasons.
    pub logins_failed_total: u64,
    /// Failed logins broken down by stable error code.
    pub logins_failed_by_reason: BTreeMap<&'static str, u64>,
    /// Total successful rotations.
    pub rotations_total: u64,
    /// Total failed rotation attempts.
    pub rotation_failures: u64,
    /// Current rotation state machine view.
    pub rotation_status: RotationStatus,
}

impl Snapshot {
    /// Build a snapshot from the live counters and current rotation status.
    #[must_use]
    pub fn capture(counters: &Counters, rotation_status: RotationStatus) -> Self {
        Self {
            alive: true,
            backend: BackendInfo::default(),
            logins_total: counters.logins_total(),
            logins_failed_total: counters.logins_failed_total(),
            logins_failed_by_reason: counters.logins_failed_by_reason(),
            rotations_total: counters.rotations_total(),
            rotation_failures: counters.rotation_failures(),
            rotation_status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmsa_types::AuthErrorCode;

    #[test]
    fn capture_reflects_counter_state() {
        let counters = Counters::new();
        counters.record_login_success();
        counters.record_login_failure(AuthErrorCode::KerberosFailed);

        let snapshot = Snapshot::capture(&counters, RotationStatus::default());
        assert!(snapshot.alive);
        assert_eq!(snapshot.logins_total, 1);
        assert_eq!(snapshot.logins_failed_total, 1);
        assert_eq!(snapshot.logins_failed_by_reason.get("KERBEROS_FAILED"), Some(&1));
    }

    #[test]
    fn serializes_to_json() {
        let counters = Counters::new();
        let snapshot = Snapshot::capture(&counters, RotationStatus::default());
        let json = serde_json::to_string(&snapshot).expect("serializes");
        assert!(json.contains("\"alive\":true"));
    }
}
