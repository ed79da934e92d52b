//! Wire-level request/response shapes for every path under a mount.
//!
//! These are plain `serde`-serializable structs; this crate deliberately
//! does not depend on any RPC/HTTP framework, so the host's plugin
//! transport maps its own request format onto these types.

use std::collections::BTreeSet;

use gmsa_types::{MergeStrategy, RotationStatus, Sid, TokenType};
use serde::{Deserialize, Serialize};

/// `config` Create/Update request body.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigWriteRequest {
    /// Kerberos realm.
    pub realm: String,
    /// KDC `host[:port]` list, at most 10.
    #[serde(default)]
    pub kdcs: Vec<String>,
    /// Service principal name.
    pub spn: String,
    /// Base64-encoded MIT keytab.
    pub keytab: String,
    /// Acceptable clock skew in seconds.
    #[serde(default = "default_clock_skew_sec")]
    pub clock_skew_sec: u32,
    /// Whether to enforce TLS channel binding when supplied.
    #[serde(default)]
    pub allow_channel_binding: bool,
    /// Uppercase-normalize the realm.
    #[serde(default = "default_true")]
    pub realm_case_sensitive: bool,
    /// Uppercase-normalize the SPN's service component.
    #[serde(default = "default_true")]
    pub spn_case_sensitive: bool,
    /// Realm suffixes stripped during normalization.
    #[serde(default)]
    pub realm_suffixes: Vec<String>,
    /// SPN suffixes stripped during normalization.
    #[serde(default)]
    pub spn_suffixes: Vec<String>,
}

fn default_clock_skew_sec() -> u32 {
    300
}

fn default_true() -> bool {
    true
}

/// `config` Read response: every field except `keytab`, which is redacted.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigReadResponse {
    /// Kerberos realm.
    pub realm: String,
    /// KDC `host[:port]` list.
    pub kdcs: Vec<String>,
    /// Service principal name.
    pub spn: String,
    /// Acceptable clock skew in seconds.
    pub clock_skew_sec: u32,
    /// Whether TLS channel binding is enforced when supplied.
    pub allow_channel_binding: bool,
    /// Whether realm comparison is case-sensitive.
    pub realm_case_sensitive: bool,
    /// Whether SPN service comparison is case-sensitive.
    pub spn_case_sensitive: bool,
    /// Realm suffixes stripped during normalization.
    pub realm_suffixes: Vec<String>,
    /// SPN suffixes stripped during normalization.
    pub spn_suffixes: Vec<String>,
}

/// `role/<name>` Create/Update request body. `name` mirrors the path and is
/// supplied by the caller, not this struct.
#[derive(Debug, Clone, Deserialize)]
pub struct RoleWriteRequest {
    /// Realms accepted for this role. Empty means any.
    #[serde(default)]
    pub allowed_realms: BTreeSet<String>,
    /// SPNs accepted for this role. Empty means any.
    #[serde(default)]
    pub allowed_spns: BTreeSet<String>,
    /// Group SIDs of which the login must present at least one.
    #[serde(default)]
    pub bound_group_sids: BTreeSet<Sid>,
    /// Policies granted on success, before group-merge and deny subtraction.
    #[serde(default)]
    pub token_policies: Vec<String>,
    /// Policies subtracted after merge.
    #[serde(default)]
    pub deny_policies: Vec<String>,
    /// How group-mapped policies combine with `token_policies`.
    #[serde(default = "default_merge_strategy")]
    pub merge_strategy: MergeStrategy,
    /// Kind of token to issue.
    #[serde(default = "default_token_type")]
    pub token_type: TokenType,
    /// Periodic renewal window in seconds, 0 means none.
    #[serde(default)]
    pub period: u32,
    /// Upper TTL bound in seconds, 0 means none.
    #[serde(default)]
    pub max_ttl: u32,
}

fn default_merge_strategy() -> MergeStrategy {
    MergeStrategy::Union
}

fn default_token_type() -> TokenType {
    TokenType::Default
}

/// `roles` List response.
#[derive(Debug, Clone, Serialize)]
pub struct RoleListResponse {
    /// Names of every stored role.
    pub keys: Vec<String>,
}

/// `login` request body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginWriteRequest {
    /// Name of the role to authorize against.
    pub role: String,
    /// Base64 SPNEGO token (NegTokenInit/NegTokenResp carrying an AP-REQ).
    pub spnego: String,
    /// Optional base64 TLS channel-binding value.
    #[serde(default)]
    pub cb_tlse: Option<String>,
}

/// `health` Read request: the only input field is whether to include the
/// extra system-info block in the response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HealthRequest {
    /// When set, the response includes [`HealthResponse::system`].
    #[serde(default)]
    pub detailed: bool,
}

/// `health` Read response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `"ok"` if the mount is live.
    pub status: &'static str,
    /// Backend crate version.
    pub version: &'static str,
    /// Compile-time enabled optional features.
    pub features: Vec<&'static str>,
    /// Seconds since this mount was constructed.
    pub uptime_s: u64,
    /// Present only when the request set `detailed = true`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemInfo>,
}

/// Extra system info returned only by a `detailed` health read.
#[derive(Debug, Clone, Serialize)]
pub struct SystemInfo {
    /// `std::thread::available_parallelism`, if the host OS reports one.
    pub available_parallelism: Option<usize>,
    /// Host OS this plugin binary was compiled for (e.g. `"linux"`).
    pub target: &'static str,
}

/// `rotation/status` Read response.
#[derive(Debug, Clone, Serialize)]
pub struct RotationStatusResponse {
    /// Flattened rotation status.
    #[serde(flatten)]
    pub status: RotationStatus,
}
