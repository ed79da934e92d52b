//! `LoginHandler`: orchestrates one login end to end.

use chrono::Utc;
use gmsa_keytab::Keytab;
use gmsa_store::RoleBackend;
use gmsa_store::RoleStore;
use gmsa_types::{AuthError, AuthIssue, Config};

use crate::engine::{self, GroupPolicyMap};

const MAX_SPNEGO_BASE64_LEN: usize = 64 * 1024;
const MAX_CHANNEL_BINDING_BASE64_LEN: usize = 4 * 1024;

/// A single login request, as parsed from the host's plugin boundary.
pub struct LoginRequest {
    /// Name of the role to authorize against.
    pub role: String,
    /// Base64 SPNEGO token.
    pub spnego: String,
    /// Optional base64 TLS channel-binding value.
    pub cb_tlse: Option<String>,
}

/// Run one login: validate the SPNEGO token against `keytab`/`config`,
/// then authorize the result against `role_store`.
///
/// Size caps are enforced before any cryptographic work: an oversize
/// `spnego` or `cb_tlse` fails fast with `INVALID_SPNEGO` without ever
/// touching the keytab. Every attempt — success or failure — is logged at
/// `tracing::info!`/`warn!` with safe fields only (principal, realm, role,
/// error code; never the raw token or key material).
///
/// # Errors
///
/// See `SPNEGOValidator::validate` and `AuthorizationEngine::authorize`
/// for the specific failure modes; this function does not add any of its
/// own beyond the size caps.
pub async fn handle_login<B: RoleBackend>(
    request: &LoginRequest,
    keytab: &Keytab,
    config: &Config,
    role_store: &RoleStore<B>,
    group_policies: &GroupPolicyMap,
) -> Result<AuthIssue, AuthError> {
    if request.spnego.len() > MAX_SPNEGO_BASE64_LEN {
        tracing::warn!(role = %request.role, error_code = "INVALID_SPNEGO", "login rejected: oversize spnego token");
        return Err(AuthError::InvalidSpnego);
    }
    if let Some(cb) = &request.cb_tlse {
        if cb.len() > MAX_CHANNEL_BINDING_BASE64_LEN {
            tracing::warn!(role = %request.role, error_code = "INVALID_SPNEGO", "login rejected: oversize channel binding");
            return Err(AuthError::InvalidSpnego);
        }
    }

    let validation = gmsa_spnego::validate(keytab, config, &request.spnego, request.cb_tlse.as_deref(), Utc::now());
    let validation = match validation {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(role = %request.role, error_code = e.code(), "login rejected: validation failed");
            return Err(e);
        }
    };

    match engine::authorize(role_store, &request.role, &validation, group_policies).await {
        Ok(issue) => {
            tracing::info!(
                role = %request.role,
                principal = %validation.principal,
                realm = %validation.realm,
                "login accepted"
            );
            Ok(issue)
        }
        Err(e) => {
            tracing::warn!(
                role = %request.role,
                principal = %validation.principal,
                realm = %validation.realm,
                error_code = e.code(),
                "login rejected: authorization failed"
            );
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gmsa_store::InMemoryRoleBackend;

    #[tokio::test]
    async fn oversize_spnego_is_rejected_before_validation() {
        let store = RoleStore::new(InMemoryRoleBackend::default());
        let keytab = Keytab::parse(vec![0x05, 0x02]).expect("trivial empty keytab parses");
        let config = Config::new("EXAMPLE.COM", "HTTP/vault.example.com", vec![0x05, 0x02]);
        let request = LoginRequest { role: "reader".into(), spnego: "A".repeat(MAX_SPNEGO_BASE64_LEN + 1), cb_tlse: None };

        let result = handle_login(&request, &keytab, &config, &store, &GroupPolicyMap::new()).await;
        assert!(matches!(result, Err(AuthError::InvalidSpnego)));
    }

    #[tokio::test]
    async fn oversize_channel_binding_is_rejected_before_validation() {
        let store = RoleStore::new(InMemoryRoleBackend::default());
        let keytab = Keytab::parse(vec![0x05, 0x02]).expect("trivial empty keytab parses");
        let config = Config::new("EXAMPLE.COM", "HTTP/vault.example.com", vec![0x05, 0x02]);
        let request = LoginRequest {
            role: "reader".into(),
            spnego: "QQ==".into(),
            cb_tlse: Some("A".repeat(MAX_CHANNEL_BINDING_BASE64_LEN + 1)),
        };

        let result = handle_login(&request, &keytab, &config, &store, &GroupPolicyMap::new()).await;
        assert!(matches!(result, Err(AuthError::InvalidSpnego)));
    }
}
