//! The output of a successful authorization: policies and token parameters.

use serde::{Deserialize, Serialize};

use crate::role::TokenType;

/// Safe, audit-friendly metadata attached to an `AuthIssue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthIssueMetadata {
    /// Normalized principal.
    pub principal: String,
    /// Normalized realm.
    pub realm: String,
    /// Target SPN.
    pub spn: String,
    /// Number of group SIDs the PAC carried (never the SIDs themselves, to
    /// keep this metadata small and stable across directory reorganizations).
    pub group_sid_count: usize,
    /// Channel-binding comparison outcome, if applicable.
    pub channel_binding_ok: Option<bool>,
}

/// What the `AuthorizationEngine` hands to the host's token subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthIssue {
    /// Final policy set: role policies merged with any group mapping, minus
    /// `deny_policies`.
    pub policies: Vec<String>,
    /// Kind of token to issue.
    pub token_type: TokenType,
    /// Periodic renewal window in seconds.
    pub period: u32,
    /// Upper TTL bound in seconds.
    pub max_ttl: u32,
    /// Audit metadata.
    pub metadata: AuthIssueMetadata,
}
