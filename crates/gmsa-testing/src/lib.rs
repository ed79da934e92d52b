//! # gmsa-testing
//!
//! Fixtures shared by this workspace's test suites: synthetic keytabs
//! ([`keytab`]), PAC buffers wire-compatible with `gmsa_spnego::pac::parse`
//! ([`pac`]), and deterministic clock instants ([`clock`]).
//!
//! Dev-only: `publish = false`, never built into a release binary. Kept as
//! its own crate rather than `#[cfg(test)]` modules scattered across
//! `gmsa-spnego`/`gmsa-backend` because PAC and keytab fixtures are useful
//! to more than one crate's test suite and to the fuzz targets.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod clock;
pub mod keytab;
pub mod pac;
