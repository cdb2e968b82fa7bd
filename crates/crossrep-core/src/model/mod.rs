//! Topology model
//!
//! Desired state for a cross-region replication run, in the shape of the
//! `appsettings.json` document that describes it.

mod account;
mod project;
mod volume;

pub use account::*;
pub use project::*;
pub use volume::*;

/// One tebibyte in bytes
pub const TIB: u64 = 1024 * 1024 * 1024 * 1024;

/// One gibibyte in bytes
pub const GIB: u64 = 1024 * 1024 * 1024;
