//! # gmsa-store
//!
//! Validation and concurrency wrappers around role and config persistence:
//! `RoleStore` (pluggable [`RoleBackend`], per-name write striping) and
//! `ConfigStore` (normalize-validate-swap for the single per-mount
//! `Config`). Neither type owns real storage — the host's actual backend
//! is substituted via the `RoleBackend`/`DynRoleBackend` traits; this
//! crate only owns the pipeline in front of it.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config_store;
pub mod role_backend;
pub mod role_store;

pub use config_store::ConfigStore;
pub use role_backend::{DynRoleBackend, InMemoryRoleBackend, RoleBackend};
pub use role_store::RoleStore;
