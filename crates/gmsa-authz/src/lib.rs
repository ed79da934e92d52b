//! # gmsa-authz
//!
//! `AuthorizationEngine` (role lookup, fixed realm/spn/groups constraint
//! order, policy merge/deny) and `LoginHandler` (size caps, orchestration
//! of validation + authorization, audit logging). Both are stateless and
//! safe under arbitrary concurrent calls.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod engine;
pub mod login;

pub use engine::{authorize, GroupPolicyMap};
pub use login::{handle_login, LoginRequest};
