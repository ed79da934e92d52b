//! # gmsa-backend
//!
//! The plugin-facing facade: [`GmsaMount`] holds every piece of state for
//! one operator mount (config, keytab, roles, counters, rotation worker)
//! explicitly, so a single process can serve multiple mounts concurrently
//! with no shared global state. [`dto`] holds the wire-level request and
//! response shapes for every path under a mount; this crate intentionally
//! does not depend on any specific RPC/HTTP framework, since the host's
//! plugin transport is out of scope.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod dto;
pub mod mount;

pub use mount::GmsaMount;
