//! crossrep cloud gateway
//!
//! This crate defines the narrow contract the replication orchestrator needs
//! from a storage control plane: create / get / delete per resource kind plus
//! the replication actions, with "not found" as a typed result rather than an
//! error.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                  crossrep CLI                    │
//! │               (crossrep up/down)                 │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │             crossrep-orchestrator                │
//! │   provisioner · replication · cleanup · waiter   │
//! └─────────────────┬───────────────────────────────┘
//!                   │  trait StorageGateway { ... }
//!         ┌─────────┴─────────┐
//! ┌───────▼───────┐ ┌─────────▼─────────┐
//! │   in-memory   │ │ crossrep-cloud-   │
//! │ control plane │ │ azure (ARM REST)  │
//! └───────────────┘ └───────────────────┘
//! ```

pub mod error;
pub mod memory;
pub mod provider;
pub mod resource;

// Re-exports
pub use error::{GatewayError, Result};
pub use memory::{ConvergenceProfile, GatewayCall, InMemoryGateway};
pub use provider::{
    AccountSpec, DataProtection, MirrorState, PoolSpec, ProvisioningState, ReplicationStatus,
    Resource, ResourceSpec, SnapshotSpec, StorageGateway, VolumeSpec,
};
pub use resource::{
    AccountKey, PROVIDER_NAMESPACE, PoolKey, ResourceId, ResourceKey, ResourceKind, SnapshotKey,
    VolumeKey,
};
