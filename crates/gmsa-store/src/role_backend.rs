//! Pluggable persistence for `Role` records.
//!
//! Two trait shapes are offered, mirroring the native-async/object-safe
//! split used elsewhere in this workspace for lifecycle-style traits:
//! `RoleBackend` for the common case (a concrete backend known at compile
//! time) and `DynRoleBackend` for callers that need `dyn` storage (the
//! host's actual persistence layer, substituted for a test double in
//! integration tests).

use std::collections::BTreeMap;

use gmsa_types::{AuthError, Role};
use parking_lot::RwLock;

/// Native-async storage trait for `Role` records.
#[allow(async_fn_in_trait)]
pub trait RoleBackend: Send + Sync {
    /// Persist `role` under its own name, overwriting any existing record.
    async fn put(&self, role: Role) -> Result<(), AuthError>;
    /// Fetch a role by name.
    async fn get(&self, name: &str) -> Result<Option<Role>, AuthError>;
    /// List all stored roles.
    async fn list(&self) -> Result<Vec<Role>, AuthError>;
    /// Delete a role by name. Deleting a name that does not exist is not
    /// an error.
    async fn delete(&self, name: &str) -> Result<(), AuthError>;
}

/// Object-safe counterpart of [`RoleBackend`], for callers that need
/// `dyn RoleBackend` (the host's real persistence layer behind a trait
/// object boundary).
#[async_trait::async_trait]
pub trait DynRoleBackend: Send + Sync {
    /// See [`RoleBackend::put`].
    async fn put(&self, role: Role) -> Result<(), AuthError>;
    /// See [`RoleBackend::get`].
    async fn get(&self, name: &str) -> Result<Option<Role>, AuthError>;
    /// See [`RoleBackend::list`].
    async fn list(&self) -> Result<Vec<Role>, AuthError>;
    /// See [`RoleBackend::delete`].
    async fn delete(&self, name: &str) -> Result<(), AuthError>;
}

/// A simple in-process `RoleBackend` backed by a `BTreeMap`, used as the
/// reference implementation and in tests. Production deployments supply
/// their own backend over the host's real storage.
#[derive(Default)]
pub struct InMemoryRoleBackend {
    roles: RwLock<BTreeMap<String, Role>>,
}

impl RoleBackend for InMemoryRoleBackend {
    async fn put(&self, role: Role) -> Result<(), AuthError> {
        self.roles.write().insert(role.name.clone(), role);
        Ok(())
    }

    async fn get(&self, name: &str) -> Result<Option<Role>, AuthError> {
        Ok(self.roles.read().get(name).cloned())
    }

    async fn list(&self) -> Result<Vec<Role>, AuthError> {
        Ok(self.roles.read().values().cloned().collect())
    }

    async fn delete(&self, name: &str) -> Result<(), AuthError> {
        self.roles.write().remove(name);
        Ok(())
    }
}
