//! Windows Security Identifiers.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static SID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^S-1-[0-9]+(-[0-9]+){1,}$").expect("static SID pattern is valid"));

/// A validated Windows SID string, e.g. `S-1-5-21-1-2-3-1001`.
///
/// Construction always validates against the canonical SID grammar so that
/// a malformed SID can never silently compare unequal to everything (or
/// worse, equal by accident) deeper in the authorization pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sid(String);

impl Sid {
    /// Parse and validate a SID string.
    ///
    /// # Errors
    ///
    /// Returns [`SidParseError`] if `s` does not match the `S-1-...` grammar.
    pub fn parse(s: impl Into<String>) -> Result<Self, SidParseError> {
        let s = s.into();
        if SID_PATTERN.is_match(&s) {
            Ok(Sid(s))
        } else {
            Err(SidParseError(s))
        }
    }

    /// The SID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Sid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Sid {
    type Error = SidParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Sid::parse(value)
    }
}

impl From<Sid> for String {
    fn from(value: Sid) -> Self {
        value.0
    }
}

/// A string failed to parse as a well-formed SID.
#[derive(Debug, Clone, thiserror::Error)]
#[error("malformed SID: {0:?}")]
pub struct SidParseError(String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_sids() {
        assert!(Sid::parse("S-1-5-21-1-2-3-1001").is_ok());
        assert!(Sid::parse("S-1-5-32-544").is_ok());
    }

    #[test]
    fn rejects_malformed_sids() {
        assert!(Sid::parse("not-a-sid").is_err());
        assert!(Sid::parse("S-1").is_err());
        assert!(Sid::parse("").is_err());
    }

    #[test]
    fn display_round_trips() {
        let sid = Sid::parse("S-1-5-21-1-2-3-1001").expect("valid");
        assert_eq!(sid.to_string(), "S-1-5-21-1-2-3-1001");
    }
}
