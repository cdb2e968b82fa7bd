//! Orchestrator error types
//!
//! Every variant is fatal for the top-level operation that raised it and
//! names the resource it concerns.

use crossrep_cloud::{GatewayError, MirrorState, ResourceKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gateway operation, for error context and reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Get,
    Create,
    Delete,
    Authorize,
    BreakReplication,
    DeleteReplication,
    ReplicationStatus,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Get => write!(f, "get"),
            Operation::Create => write!(f, "create"),
            Operation::Delete => write!(f, "delete"),
            Operation::Authorize => write!(f, "authorize replication"),
            Operation::BreakReplication => write!(f, "break replication"),
            Operation::DeleteReplication => write!(f, "delete replication"),
            Operation::ReplicationStatus => write!(f, "get replication status"),
        }
    }
}

#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error("{operation} failed for {resource}: {source}")]
    Gateway {
        operation: Operation,
        resource: ResourceKey,
        #[source]
        source: GatewayError,
    },

    #[error("{operation} for {resource} kept failing transiently ({attempts} attempts)")]
    Unavailable {
        operation: Operation,
        resource: ResourceKey,
        attempts: u32,
    },

    #[error("{resource} did not appear after {attempts} polls")]
    PresenceTimeout { resource: ResourceKey, attempts: u32 },

    #[error("{resource} did not reach provisioning state Succeeded after {attempts} polls")]
    SettleTimeout { resource: ResourceKey, attempts: u32 },

    #[error("replication of {resource} did not reach {expected} after {attempts} polls")]
    ReplicationTimeout {
        resource: ResourceKey,
        expected: MirrorState,
        attempts: u32,
    },

    #[error("{resource} is still being deleted after {attempts} polls; cannot recreate it yet")]
    StillDeleting { resource: ResourceKey, attempts: u32 },

    #[error("{resource} is in a failed provisioning state: {reason}")]
    ProvisioningFailed { resource: ResourceKey, reason: String },

    #[error("source volume {source_volume} of {destination} not found")]
    SourceVolumeNotFound {
        destination: ResourceKey,
        source_volume: ResourceKey,
    },

    #[error("destination {destination} not found; cannot authorize replication")]
    DestinationVolumeNotFound { destination: ResourceKey },
}

impl OrchestratorError {
    /// The resource the failure concerns
    pub fn resource(&self) -> &ResourceKey {
        match self {
            OrchestratorError::Gateway { resource, .. }
            | OrchestratorError::Unavailable { resource, .. }
            | OrchestratorError::PresenceTimeout { resource, .. }
            | OrchestratorError::SettleTimeout { resource, .. }
            | OrchestratorError::ReplicationTimeout { resource, .. }
            | OrchestratorError::StillDeleting { resource, .. }
            | OrchestratorError::ProvisioningFailed { resource, .. } => resource,
            OrchestratorError::SourceVolumeNotFound { destination, .. }
            | OrchestratorError::DestinationVolumeNotFound { destination } => destination,
        }
    }

    /// Configuration inconsistencies cannot be fixed by retrying
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            OrchestratorError::SourceVolumeNotFound { .. }
                | OrchestratorError::DestinationVolumeNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, OrchestratorError>;
