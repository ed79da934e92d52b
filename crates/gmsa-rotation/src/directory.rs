//! Directory query and keytab generation seams.
//!
//! Both are trait objects rather than concrete clients: the actual AD/gMSA
//! plumbing (LDAP password-age queries, `ksetup`/`msDS-ManagedPassword`
//! retrieval) is host- and deployment-specific and out of scope here. What
//! matters to `RotationManager` is the contract, so tests can supply a
//! fake without standing up a domain controller.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gmsa_types::{AuthError, SecretString};

/// Password age/expiry as reported by the directory controller.
#[derive(Debug, Clone)]
pub struct PasswordMetadata {
    /// Age of the current service account password, in days.
    pub age_days: u32,
    /// When the current password expires, if the directory reports one.
    pub expiry: Option<DateTime<Utc>>,
}

/// Queries a directory controller for gMSA password metadata.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    /// Fetch current password age/expiry for the service account.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::RotationError`] if the directory is unreachable
    /// or the query fails.
    async fn password_metadata(
        &self,
        directory_address: &str,
        admin_username: &str,
        admin_password: &SecretString,
    ) -> Result<PasswordMetadata, AuthError>;
}

/// Produces a new keytab blob for the service account's current gMSA
/// password.
#[async_trait]
pub trait KeytabGenerator: Send + Sync {
    /// Generate (or fetch) a fresh keytab blob.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::RotationError`] if generation fails.
    async fn generate(
        &self,
        directory_address: &str,
        admin_username: &str,
        admin_password: &SecretString,
    ) -> Result<Vec<u8>, AuthError>;
}

#[async_trait]
impl DirectoryClient for Box<dyn DirectoryClient> {
    async fn password_metadata(
        &self,
        directory_address: &str,
        admin_username: &str,
        admin_password: &SecretString,
    ) -> Result<PasswordMetadata, AuthError> {
        (**self).password_metadata(directory_address, admin_username, admin_password).await
    }
}

#[async_trait]
impl KeytabGenerator for Box<dyn KeytabGenerator> {
    async fn generate(
        &self,
        directory_address: &str,
        admin_username: &str,
        admin_password: &SecretString,
    ) -> Result<Vec<u8>, AuthError> {
        (**self).generate(directory_address, admin_username, admin_password).await
    }
}
