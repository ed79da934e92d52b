//! # gmsa-types
//!
//! Shared data model and error taxonomy for the gMSA/Kerberos authentication
//! backend core: `Config`, `Role`, `ValidationResult`, rotation
//! config/status, keytab entries, and the stable `AuthError` codes that
//! cross every crate boundary in this workspace.
//!
//! This crate has no knowledge of ASN.1, GSSAPI, or any storage backend —
//! it only defines shapes and pure validation/normalization rules so that
//! `gmsa-keytab`, `gmsa-spnego`, `gmsa-store`, `gmsa-authz`, and
//! `gmsa-rotation` share one vocabulary without a dependency cycle.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod keytab_entry;
pub mod policy;
pub mod role;
pub mod rotation;
pub mod secret;
pub mod sid;
pub mod validation;

pub use config::Config;
pub use error::{AuthError, AuthErrorCode, DenyReason};
pub use keytab_entry::{EncType, KeytabEntry};
pub use policy::{AuthIssue, AuthIssueMetadata};
pub use role::{MergeStrategy, Role, TokenType};
pub use rotation::{RotationConfig, RotationState, RotationStatus};
pub use secret::{SecretBytes, SecretString};
pub use sid::Sid;
pub use validation::ValidationResult;
