//! # gmsa-metrics
//!
//! Lock-free per-process counters (`logins_total`, `logins_failed` keyed by
//! stable error code, `rotations_total`, `rotation_failures`) plus a
//! serializable [`Snapshot`] combining them with backend identity and the
//! current rotation status, for the `health`/`metrics` surfaces.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod counters;
pub mod snapshot;

pub use counters::Counters;
pub use snapshot::{BackendInfo, Snapshot};
