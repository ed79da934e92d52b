//! Named roles: realm/SPN/group constraints and policy bindings.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::AuthError;
use crate::sid::Sid;

static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9_-]{1,128}$").expect("static role name pattern is valid"));

const MAX_PERIOD_SEC: u32 = 86_400;

/// How group-mapped policies combine with `token_policies`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Append group-mapped policies, deduplicated.
    Union,
    /// Retain only policies present in both sets.
    Intersection,
}

/// The kind of token issued on a successful login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Standard token.
    Default,
    /// Non-expiring-by-default service token.
    Service,
    /// Batch token, not bound to the issuing request's lease hierarchy.
    Batch,
}

/// A named role: the unit of authorization policy binding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    /// Unique role name, `[a-zA-Z0-9_-]{1,128}`.
    pub name: String,
    /// Realms accepted for this role. Empty means any.
    pub allowed_realms: BTreeSet<String>,
    /// SPNs accepted for this role. Empty means any.
    pub allowed_spns: BTreeSet<String>,
    /// Group SIDs of which the login must present at least one, if non-empty.
    pub bound_group_sids: BTreeSet<Sid>,
    /// Policies granted on success, before group-merge and deny subtraction.
    pub token_policies: Vec<String>,
    /// Policies subtracted after merge.
    pub deny_policies: Vec<String>,
    /// How group-mapped policies combine with `token_policies`.
    pub merge_strategy: MergeStrategy,
    /// Kind of token to issue.
    pub token_type: TokenType,
    /// Periodic renewal window in seconds, 0 means none.
    pub period: u32,
    /// Upper TTL bound in seconds, 0 means none.
    pub max_ttl: u32,
}

impl Role {
    /// Construct a role with the documented defaults.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            allowed_realms: BTreeSet::new(),
            allowed_spns: BTreeSet::new(),
            bound_group_sids: BTreeSet::new(),
            token_policies: Vec::new(),
            deny_policies: Vec::new(),
            merge_strategy: MergeStrategy::Union,
            token_type: TokenType::Default,
            period: 0,
            max_ttl: 0,
        }
    }

    /// Validate this role's shape.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigInvalid`] describing the first violated
    /// constraint: empty name, malformed name, `period > max_ttl` when both
    /// are non-zero, ranges outside `0..=86400`, or a malformed bound SID.
    pub fn validate_shape(&self) -> Result<(), AuthError> {
        if self.name.is_empty() || !NAME_PATTERN.is_match(&self.name) {
            return Err(AuthError::ConfigInvalid(format!(
                "role name must match [a-zA-Z0-9_-]{{1,128}}, got {:?}",
                self.name
            )));
        }
        if self.period > MAX_PERIOD_SEC {
            return Err(AuthError::ConfigInvalid(format!(
                "period must be 0..={MAX_PERIOD_SEC}, got {}",
                self.period
            )));
        }
        if self.max_ttl > MAX_PERIOD_SEC {
            return Err(AuthError::ConfigInvalid(format!(
                "max_ttl must be 0..={MAX_PERIOD_SEC}, got {}",
                self.max_ttl
            )));
        }
        if self.period != 0 && self.max_ttl != 0 && self.period > self.max_ttl {
            return Err(AuthError::ConfigInvalid(format!(
                "period ({}) must not exceed max_ttl ({})",
                self.period, self.max_ttl
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_role_validates() {
        assert!(Role::new("r1").validate_shape().is_ok());
    }

    #[test]
    fn rejects_empty_name() {
        assert!(Role::new("").validate_shape().is_err());
    }

    #[test]
    fn rejects_period_over_max_ttl() {
        let mut r = Role::new("r1");
        r.period = 100;
        r.max_ttl = 50;
        assert!(r.validate_shape().is_err());
    }

    #[test]
    fn accepts_period_equal_to_max_ttl() {
        let mut r = Role::new("r1");
        r.period = 50;
        r.max_ttl = 50;
        assert!(r.validate_shape().is_ok());
    }

    #[test]
    fn zero_period_or_max_ttl_is_unconstrained() {
        let mut r = Role::new("r1");
        r.period = 100;
        r.max_ttl = 0;
        assert!(r.validate_shape().is_ok());
    }

    #[test]
    fn put_is_idempotent_in_shape() {
        let r = Role::new("r1");
        let body = serde_json::to_string(&r).expect("serialize");
        let round_tripped: Role = serde_json::from_str(&body).expect("deserialize");
        assert_eq!(round_tripped.name, r.name);
        assert_eq!(round_tripped.merge_strategy, r.merge_strategy);
    }
}
