//! crossrep core
//!
//! In-memory representation of the desired replication topology:
//! accounts, capacity pools, volumes, export rules and source-volume
//! references. The model is read-only once loaded; the orchestrator only
//! walks it.

pub mod model;

pub use model::*;
