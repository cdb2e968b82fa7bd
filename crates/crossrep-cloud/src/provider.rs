//! Storage gateway trait definition

use crate::error::Result;
use crate::resource::{ResourceId, ResourceKey, ResourceKind, VolumeKey};
use async_trait::async_trait;
use crossrep_core::{EndpointRole, ExportPolicyRule, ProtocolType, ReplicationSchedule, ServiceLevel};
use serde::{Deserialize, Serialize};

/// Remote control-plane abstraction
///
/// Creation and deletion are asynchronous on the remote side: a successful
/// `create` or `delete` only means the request was accepted. Callers observe
/// convergence by polling `get` / `replication_status`, which return `None`
/// for a resource the control plane does not (yet, or any longer) know.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    /// Returns the gateway name (e.g. "azure-netapp", "in-memory")
    fn name(&self) -> &str;

    /// Fetch a resource; `None` when the control plane reports it missing
    async fn get(&self, key: &ResourceKey) -> Result<Option<Resource>>;

    /// Request creation of a resource
    async fn create(&self, key: &ResourceKey, spec: &ResourceSpec) -> Result<()>;

    /// Request deletion of a resource
    async fn delete(&self, key: &ResourceKey) -> Result<()>;

    /// Authorize replication from `source` to the destination volume id
    async fn authorize_replication(
        &self,
        source: &VolumeKey,
        destination_id: &ResourceId,
    ) -> Result<()>;

    /// Sever the replication relationship of a destination volume
    async fn break_replication(&self, destination: &VolumeKey) -> Result<()>;

    /// Remove the (broken) replication object of a destination volume
    async fn delete_replication(&self, destination: &VolumeKey) -> Result<()>;

    /// Replication status, `None` when no replication exists for the volume
    async fn replication_status(&self, volume: &VolumeKey) -> Result<Option<ReplicationStatus>>;
}

/// A resource as reported by the control plane
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,

    pub key: ResourceKey,

    pub location: String,

    /// Status of the last mutation
    pub provisioning_state: ProvisioningState,
}

/// Provider-reported status of a resource's last mutation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisioningState {
    Accepted,
    Creating,
    Updating,
    Deleting,
    Moving,
    Succeeded,
    Failed,
    /// A state this client does not know about
    Other(String),
}

impl ProvisioningState {
    pub fn from_api_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "accepted" => Self::Accepted,
            "creating" => Self::Creating,
            "updating" => Self::Updating,
            "deleting" => Self::Deleting,
            "moving" => Self::Moving,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            _ => Self::Other(s.to_string()),
        }
    }

    pub fn is_succeeded(&self) -> bool {
        matches!(self, Self::Succeeded)
    }

    /// Converged to a failure; polling further will not help
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl std::fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accepted => write!(f, "Accepted"),
            Self::Creating => write!(f, "Creating"),
            Self::Updating => write!(f, "Updating"),
            Self::Deleting => write!(f, "Deleting"),
            Self::Moving => write!(f, "Moving"),
            Self::Succeeded => write!(f, "Succeeded"),
            Self::Failed => write!(f, "Failed"),
            Self::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Create request body, one variant per resource kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceSpec {
    Account(AccountSpec),
    Pool(PoolSpec),
    Volume(VolumeSpec),
    Snapshot(SnapshotSpec),
}

impl ResourceSpec {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceSpec::Account(_) => ResourceKind::Account,
            ResourceSpec::Pool(_) => ResourceKind::Pool,
            ResourceSpec::Volume(_) => ResourceKind::Volume,
            ResourceSpec::Snapshot(_) => ResourceKind::Snapshot,
        }
    }

    pub fn location(&self) -> &str {
        match self {
            ResourceSpec::Account(s) => &s.location,
            ResourceSpec::Pool(s) => &s.location,
            ResourceSpec::Volume(s) => &s.location,
            ResourceSpec::Snapshot(s) => &s.location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSpec {
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSpec {
    pub location: String,
    pub service_level: ServiceLevel,
    /// Size in bytes
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSpec {
    pub location: String,
    pub creation_token: String,
    /// Quota in bytes
    pub usage_threshold: u64,
    pub protocol_types: Vec<ProtocolType>,
    pub subnet_id: Option<String>,
    pub export_policy: Vec<ExportPolicyRule>,
    /// Set only on replication destinations
    pub data_protection: Option<DataProtection>,
}

impl VolumeSpec {
    /// Provider volume type; destinations are data-protection volumes
    pub fn volume_type(&self) -> Option<&'static str> {
        self.data_protection.as_ref().map(|_| "DataProtection")
    }
}

/// Replication endpoint settings of a destination volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataProtection {
    pub endpoint: EndpointRole,
    pub remote_volume_resource_id: ResourceId,
    pub schedule: ReplicationSchedule,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotSpec {
    pub location: String,
}

/// Mirror state of a replication relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MirrorState {
    Uninitialized,
    Authorizing,
    Mirrored,
    Broken,
}

impl MirrorState {
    pub fn from_api_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "uninitialized" => Some(Self::Uninitialized),
            "authorizing" => Some(Self::Authorizing),
            "mirrored" => Some(Self::Mirrored),
            "broken" => Some(Self::Broken),
            _ => None,
        }
    }
}

impl std::fmt::Display for MirrorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Uninitialized => write!(f, "Uninitialized"),
            Self::Authorizing => write!(f, "Authorizing"),
            Self::Mirrored => write!(f, "Mirrored"),
            Self::Broken => write!(f, "Broken"),
        }
    }
}

/// Replication status as reported for a destination volume
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicationStatus {
    pub mirror_state: MirrorState,

    pub healthy: Option<bool>,

    /// e.g. "Idle", "Transferring"
    pub relationship_status: Option<String>,

    pub total_progress: Option<String>,

    pub error_message: Option<String>,
}

impl ReplicationStatus {
    pub fn new(mirror_state: MirrorState) -> Self {
        Self {
            mirror_state,
            healthy: None,
            relationship_status: None,
            total_progress: None,
            error_message: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provisioning_state_parse() {
        assert_eq!(ProvisioningState::from_api_str("Succeeded"), ProvisioningState::Succeeded);
        assert!(ProvisioningState::from_api_str("FAILED").is_failed());
        assert_eq!(
            ProvisioningState::from_api_str("Patching"),
            ProvisioningState::Other("Patching".to_string())
        );
        assert!(!ProvisioningState::Creating.is_succeeded());
    }

    #[test]
    fn test_mirror_state_parse() {
        assert_eq!(MirrorState::from_api_str("mirrored"), Some(MirrorState::Mirrored));
        assert_eq!(MirrorState::from_api_str("Broken"), Some(MirrorState::Broken));
        assert_eq!(MirrorState::from_api_str("Exploded"), None);
    }

    #[test]
    fn test_volume_type_follows_data_protection() {
        let mut spec = VolumeSpec {
            location: "westus".into(),
            creation_token: "v2".into(),
            usage_threshold: 1,
            protocol_types: vec![ProtocolType::NfsV3],
            subnet_id: None,
            export_policy: Vec::new(),
            data_protection: None,
        };
        assert_eq!(spec.volume_type(), None);

        spec.data_protection = Some(DataProtection {
            endpoint: EndpointRole::Destination,
            remote_volume_resource_id: ResourceId::new("/x"),
            schedule: ReplicationSchedule::Hourly,
        });
        assert_eq!(spec.volume_type(), Some("DataProtection"));
    }
}
