//! crossrep orchestrator
//!
//! Drives a declared topology through its lifecycle against any
//! [`StorageGateway`](crossrep_cloud::StorageGateway):
//!
//! - [`Provisioner`]: create accounts, pools and volumes depth-first, skipping
//!   what already exists
//! - [`ReplicationOrchestrator`]: authorize each destination and wait for it
//!   to report `Mirrored`
//! - [`CleanupOrchestrator`]: break and delete replication, then delete
//!   resources in reverse creation order
//!
//! Every remote mutation is followed by a convergence wait (see [`waiter`]).

pub mod cleanup;
pub mod clock;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod provisioner;
pub mod replication;
pub mod report;
pub mod waiter;

// Re-exports
pub use cleanup::CleanupOrchestrator;
pub use clock::{InstantSleeper, Sleeper, TokioSleeper};
pub use config::{OrchestratorConfig, WaitPolicy};
pub use error::{Operation, OrchestratorError, Result};
pub use lifecycle::Lifecycle;
pub use provisioner::{Provisioner, volume_spec};
pub use replication::ReplicationOrchestrator;
pub use report::{RunReport, RunSummary, Step, StepKind, Warning};
pub use waiter::{Probe, WaitError, WaitOutcome, Waiter, wait_until};
