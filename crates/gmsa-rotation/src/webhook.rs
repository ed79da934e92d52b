//! Optional post-rotation webhook notification.

use chrono::{DateTime, Utc};
use gmsa_types::RotationState;
use serde::Serialize;
use std::time::Duration;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON body posted to `notification_endpoint` after every rotation attempt.
#[derive(Debug, Serialize)]
pub struct RotationWebhookPayload {
    /// When this attempt concluded.
    pub timestamp: DateTime<Utc>,
    /// Human-readable summary, safe for logs.
    pub message: String,
    /// Resulting state.
    pub status: RotationState,
    /// Cumulative successful rotation count.
    pub rotation_count: u64,
    /// Password age in days at the time of this attempt, if known.
    pub password_age: Option<u32>,
    /// Password expiry at the time of this attempt, if known.
    pub password_expiry: Option<DateTime<Utc>>,
}

/// Posts [`RotationWebhookPayload`] to `endpoint`.
///
/// Never retried and never allowed to fail the rotation attempt itself: a
/// webhook delivery failure is logged and otherwise swallowed, since the
/// resulting status is independently observable through health/metrics.
pub async fn notify(client: &reqwest::Client, endpoint: &str, payload: &RotationWebhookPayload) {
    let result = client
        .post(endpoint)
        .timeout(WEBHOOK_TIMEOUT)
        .json(payload)
        .header("user-agent", concat!("gmsa-auth-backend/", env!("CARGO_PKG_VERSION")))
        .send()
        .await;

    match result {
        Ok(resp) if resp.status().is_success() => {
            tracing::debug!(status = %payload.status, "rotation webhook delivered");
        }
        Ok(resp) => {
            tracing::warn!(http_status = resp.status().as_u16(), "rotation webhook rejected");
        }
        Err(e) => {
            tracing::warn!(error = %e, "rotation webhook delivery failed");
        }
    }
}
