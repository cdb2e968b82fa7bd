//! ARM request and response bodies

use crossrep_cloud::{
    MirrorState, ProvisioningState, ReplicationStatus, ResourceId, ResourceSpec, VolumeSpec,
};
use crossrep_core::ExportPolicyRule;
use serde::{Deserialize, Serialize};

/// PUT body for any managed resource
#[derive(Debug, Serialize)]
pub struct ResourceBody {
    pub location: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PoolProperties<'a> {
    service_level: &'a str,
    size: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VolumeProperties<'a> {
    creation_token: &'a str,
    usage_threshold: u64,
    protocol_types: Vec<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    subnet_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    export_policy: Option<ExportPolicy>,
    #[serde(skip_serializing_if = "Option::is_none")]
    volume_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_protection: Option<DataProtectionBody<'a>>,
}

#[derive(Debug, Serialize)]
struct ExportPolicy {
    rules: Vec<ExportRuleBody>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportRuleBody {
    rule_index: u32,
    allowed_clients: String,
    unix_read_only: bool,
    unix_read_write: bool,
    cifs: bool,
    nfsv3: bool,
    nfsv41: bool,
}

impl From<&ExportPolicyRule> for ExportRuleBody {
    fn from(rule: &ExportPolicyRule) -> Self {
        Self {
            rule_index: rule.rule_index,
            allowed_clients: rule.allowed_clients.clone(),
            unix_read_only: rule.unix_read_only,
            unix_read_write: rule.unix_read_write,
            cifs: rule.cifs,
            nfsv3: rule.nfsv3,
            nfsv41: rule.nfsv4,
        }
    }
}

#[derive(Debug, Serialize)]
struct DataProtectionBody<'a> {
    replication: ReplicationBody<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReplicationBody<'a> {
    endpoint_type: &'static str,
    remote_volume_resource_id: &'a str,
    replication_schedule: &'static str,
}

impl ResourceBody {
    pub fn from_spec(spec: &ResourceSpec) -> serde_json::Result<Self> {
        let properties = match spec {
            ResourceSpec::Account(_) | ResourceSpec::Snapshot(_) => None,
            ResourceSpec::Pool(pool) => Some(serde_json::to_value(PoolProperties {
                service_level: pool.service_level.as_api_str(),
                size: pool.size,
            })?),
            ResourceSpec::Volume(volume) => Some(serde_json::to_value(volume_properties(volume))?),
        };
        Ok(Self {
            location: spec.location().to_string(),
            properties,
        })
    }
}

fn volume_properties(volume: &VolumeSpec) -> VolumeProperties<'_> {
    let export_policy = (!volume.export_policy.is_empty()).then(|| ExportPolicy {
        rules: volume.export_policy.iter().map(ExportRuleBody::from).collect(),
    });
    VolumeProperties {
        creation_token: &volume.creation_token,
        usage_threshold: volume.usage_threshold,
        protocol_types: volume.protocol_types.iter().map(|p| p.as_api_str()).collect(),
        subnet_id: volume.subnet_id.as_deref(),
        export_policy,
        volume_type: volume.volume_type(),
        data_protection: volume.data_protection.as_ref().map(|dp| DataProtectionBody {
            replication: ReplicationBody {
                endpoint_type: dp.endpoint.as_api_str(),
                remote_volume_resource_id: dp.remote_volume_resource_id.as_str(),
                replication_schedule: dp.schedule.as_api_str(),
            },
        }),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeBody<'a> {
    pub remote_volume_resource_id: &'a str,
}

/// GET response of any managed resource
#[derive(Debug, Deserialize)]
pub struct ResourceResponse {
    pub id: ResourceId,

    #[serde(default)]
    pub location: String,

    #[serde(default)]
    pub properties: ResourceProperties,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProperties {
    pub provisioning_state: Option<String>,
}

impl ResourceResponse {
    pub fn provisioning_state(&self) -> ProvisioningState {
        self.properties
            .provisioning_state
            .as_deref()
            .map(ProvisioningState::from_api_str)
            .unwrap_or(ProvisioningState::Succeeded)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicationStatusResponse {
    pub healthy: Option<bool>,
    pub relationship_status: Option<String>,
    pub mirror_state: Option<String>,
    pub total_progress: Option<String>,
    pub error_message: Option<String>,
}

impl From<ReplicationStatusResponse> for ReplicationStatus {
    fn from(response: ReplicationStatusResponse) -> Self {
        let mirror_state = response
            .mirror_state
            .as_deref()
            .and_then(MirrorState::from_api_str)
            .unwrap_or(MirrorState::Uninitialized);
        ReplicationStatus {
            mirror_state,
            healthy: response.healthy,
            relationship_status: response.relationship_status,
            total_progress: response.total_progress,
            error_message: response.error_message.filter(|m| !m.is_empty()),
        }
    }
}

/// ARM error envelope
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
