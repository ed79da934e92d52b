//! `RoleStore`: validation and lock-striped write serialization in front
//! of a pluggable [`RoleBackend`].

use std::collections::HashMap;

use gmsa_types::{AuthError, Role};
use parking_lot::Mutex;

use crate::role_backend::RoleBackend;

/// Validates and serializes writes to a [`RoleBackend`].
///
/// Per-role-name write serialization uses a small striping map rather than
/// a single store-wide lock, so concurrent `Put`s to different roles never
/// block each other; reads (`Get`/`List`) never take any lock here at all
/// (they go straight to the backend, which has its own concurrency model).
pub struct RoleStore<B: RoleBackend> {
    backend: B,
    write_locks: Mutex<HashMap<String, std::sync::Arc<Mutex<()>>>>,
}

impl<B: RoleBackend> RoleStore<B> {
    /// Wrap a backend in the validation/striping pipeline.
    pub fn new(backend: B) -> Self {
        Self { backend, write_locks: Mutex::new(HashMap::new()) }
    }

    fn lock_for(&self, name: &str) -> std::sync::Arc<Mutex<()>> {
        self.write_locks.lock().entry(name.to_string()).or_default().clone()
    }

    /// Validate and store `role`. Idempotent: repeated `Put` with the same
    /// body yields the same stored record.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::ConfigInvalid`] if `role.validate_shape()`
    /// fails, without ever reaching the backend.
    pub async fn put(&self, role: Role) -> Result<(), AuthError> {
        role.validate_shape()?;
        let stripe = self.lock_for(&role.name);
        let _guard = stripe.lock();
        self.backend.put(role).await
    }

    /// Fetch a role by name.
    ///
    /// # Errors
    ///
    /// Propagates any backend error.
    pub async fn get(&self, name: &str) -> Result<Option<Role>, AuthError> {
        self.backend.get(name).await
    }

    /// List all roles.
    ///
    /// # Errors
    ///
    /// Propagates any backend error.
    pub async fn list(&self) -> Result<Vec<Role>, AuthError> {
        self.backend.list().await
    }

    /// Delete a role by name.
    ///
    /// # Errors
    ///
    /// Propagates any backend error. Deletion never cascades into already
    /// validated logins: a live `ValidationResult`/`AuthIssue` in flight at
    /// delete time has already captured the policies it needs.
    pub async fn delete(&self, name: &str) -> Result<(), AuthError> {
        let stripe = self.lock_for(name);
        let _guard = stripe.lock();
        self.backend.delete(name).await
    }
}
