//! Keytab rotation configuration and observable status.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::secret::SecretString;

const MIN_CHECK_INTERVAL_SEC: u64 = 60;
const MIN_ROTATION_THRESHOLD_SEC: u64 = 300;
const MAX_RETRIES: u32 = 10;
const MIN_RETRY_DELAY_SEC: u64 = 60;

/// Operator-configured rotation policy for one mount.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationConfig {
    /// Whether the background rotation worker should run at all.
    pub enabled: bool,
    /// How often the worker checks password age, in seconds (>= 60).
    pub check_interval_sec: u64,
    /// Age or time-to-expiry threshold that triggers rotation, in seconds (>= 300).
    pub rotation_threshold_sec: u64,
    /// Maximum retry attempts per rotation cycle (<= 10).
    pub max_retries: u32,
    /// Delay between retries, in seconds (>= 60).
    pub retry_delay_sec: u64,
    /// Directory controller address used to query password metadata and
    /// request a new keytab.
    pub directory_address: String,
    /// Administrative account used against the directory controller.
    pub admin_username: String,
    /// Administrative password. Never retained past a rotation attempt.
    pub admin_password: SecretString,
    /// Whether to retain prior keytabs in a bounded ring.
    pub backup_keytabs: bool,
    /// Optional webhook URL notified after each rotation attempt.
    pub notification_endpoint: Option<String>,
}

impl RotationConfig {
    /// Validate this config's shape.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigInvalid`] describing the first violated
    /// constraint.
    pub fn validate_shape(&self) -> Result<(), AuthError> {
        if self.check_interval_sec < MIN_CHECK_INTERVAL_SEC {
            return Err(AuthError::ConfigInvalid(format!(
                "check_interval_sec must be >= {MIN_CHECK_INTERVAL_SEC}, got {}",
                self.check_interval_sec
            )));
        }
        if self.rotation_threshold_sec < MIN_ROTATION_THRESHOLD_SEC {
            return Err(AuthError::ConfigInvalid(format!(
                "rotation_threshold_sec must be >= {MIN_ROTATION_THRESHOLD_SEC}, got {}",
                self.rotation_threshold_sec
            )));
        }
        if self.max_retries > MAX_RETRIES {
            return Err(AuthError::ConfigInvalid(format!(
                "max_retries must be <= {MAX_RETRIES}, got {}",
                self.max_retries
            )));
        }
        if self.retry_delay_sec < MIN_RETRY_DELAY_SEC {
            return Err(AuthError::ConfigInvalid(format!(
                "retry_delay_sec must be >= {MIN_RETRY_DELAY_SEC}, got {}",
                self.retry_delay_sec
            )));
        }
        if let Some(endpoint) = &self.notification_endpoint {
            if !endpoint.is_empty() && !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(AuthError::ConfigInvalid(
                    "notification_endpoint must be a URL or empty".into(),
                ));
            }
        }
        Ok(())
    }
}

/// The rotation worker's state machine position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RotationState {
    /// Waiting for the next scheduled check.
    Idle,
    /// Querying the directory for password age/expiry.
    Checking,
    /// Generating, validating, and swapping in a new keytab.
    Rotating,
    /// The last attempt failed; retry backoff is in effect.
    Error,
}

impl fmt::Display for RotationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RotationState::Idle => "idle",
            RotationState::Checking => "checking",
            RotationState::Rotating => "rotating",
            RotationState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Observable rotation status, returned by `rotation/status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RotationStatus {
    /// Current state.
    pub state: RotationState,
    /// Timestamp of the last check, if any.
    pub last_check: Option<DateTime<Utc>>,
    /// Timestamp of the last successful rotation, if any.
    pub last_rotation: Option<DateTime<Utc>>,
    /// Timestamp of the next scheduled check.
    pub next_rotation: Option<DateTime<Utc>>,
    /// Total number of successful rotations.
    pub rotation_count: u64,
    /// Safe (non-sensitive) description of the last error, if any.
    pub last_error: Option<String>,
    /// Age of the current service password in days, if known.
    pub password_age_days: Option<u32>,
    /// Expiry timestamp of the current service password, if known.
    pub password_expiry: Option<DateTime<Utc>>,
    /// Whether the background worker is currently running.
    pub is_running: bool,
}

impl Default for RotationStatus {
    fn default() -> Self {
        Self {
            state: RotationState::Idle,
            last_check: None,
            last_rotation: None,
            next_rotation: None,
            rotation_count: 0,
            last_error: None,
            password_age_days: None,
            password_expiry: None,
            is_running: false,
        }
    }
}
