//! Deterministic clock instants for validator boundary tests.
//!
//! `gmsa_spnego::validate` takes `now` as an explicit argument rather than
//! reading the system clock, precisely so tests can exercise clock-skew
//! edges without racing real time. These helpers give every test suite the
//! same reference instant to build tickets and authenticators around.

use chrono::{DateTime, Duration, Utc};

/// A fixed reference instant: `2026-01-01T00:00:00Z`. Entirely arbitrary —
/// only its stability across test runs matters.
#[must_use]
pub fn reference_instant() -> DateTime<Utc> {
    "2026-01-01T00:00:00Z".parse().expect("static timestamp is well-formed")
}

/// `reference_instant()` shifted by `secs` seconds (negative moves it
/// earlier). Used to place an authenticator's `ctime` or a ticket's
/// validity window just inside or just outside a configured skew/window.
#[must_use]
pub fn shifted(secs: i64) -> DateTime<Utc> {
    reference_instant() + Duration::seconds(secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shifted_moves_relative_to_reference() {
        let base = reference_instant();
        assert_eq!(shifted(60), base + Duration::seconds(60));
        assert_eq!(shifted(-60), base - Duration::seconds(60));
    }
}
