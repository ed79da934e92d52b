//! # gmsa-keytab
//!
//! Parses the MIT keytab binary format and holds the current service
//! keytab for one mount, supporting atomic, backed-up replacement (the
//! keytab half of the rotation manager's swap-or-rollback contract).

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod format;
pub mod store;

pub use store::{Keytab, KeytabStore};
