//! Volume, export policy and replication source definitions

use serde::{Deserialize, Serialize};

/// Mountable volume inside a capacity pool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub name: String,

    /// Mount handle, unique within the account's namespace
    pub creation_token: String,

    /// Access protocol
    #[serde(rename = "type")]
    pub protocol: ProtocolType,

    /// Capacity quota in bytes
    pub usage_threshold: u64,

    /// Delegated subnet resource id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet_id: Option<String>,

    /// Ordered access rules
    #[serde(default)]
    pub export_policies: Vec<ExportPolicyRule>,

    /// Replication source; present only on destination volumes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_volume: Option<SourceVolumeRef>,

    /// Replication schedule for destination volumes (default: hourly)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replication_schedule: Option<ReplicationSchedule>,
}

impl Volume {
    pub fn new(
        name: impl Into<String>,
        creation_token: impl Into<String>,
        protocol: ProtocolType,
        usage_threshold: u64,
    ) -> Self {
        Self {
            name: name.into(),
            creation_token: creation_token.into(),
            protocol,
            usage_threshold,
            subnet_id: None,
            export_policies: Vec::new(),
            source_volume: None,
            replication_schedule: None,
        }
    }

    pub fn with_export_rule(mut self, rule: ExportPolicyRule) -> Self {
        self.export_policies.push(rule);
        self
    }

    pub fn with_source(mut self, source: SourceVolumeRef) -> Self {
        self.source_volume = Some(source);
        self
    }

    pub fn with_subnet(mut self, subnet_id: impl Into<String>) -> Self {
        self.subnet_id = Some(subnet_id.into());
        self
    }

    /// Whether this volume is a replication destination
    pub fn is_destination(&self) -> bool {
        self.source_volume.is_some()
    }

    /// Effective schedule for a destination volume
    pub fn schedule(&self) -> ReplicationSchedule {
        self.replication_schedule.unwrap_or_default()
    }

    /// Protocol list as sent to the provider
    pub fn protocol_types(&self) -> Vec<ProtocolType> {
        vec![self.protocol]
    }
}

/// Volume access protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ProtocolType {
    NfsV3,
    NfsV41,
    Cifs,
}

impl ProtocolType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "nfsv3" => Some(Self::NfsV3),
            "nfsv4.1" | "nfsv41" | "nfsv4" => Some(Self::NfsV41),
            "cifs" | "smb" => Some(Self::Cifs),
            _ => None,
        }
    }

    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::NfsV3 => "NFSv3",
            Self::NfsV41 => "NFSv4.1",
            Self::Cifs => "CIFS",
        }
    }
}

impl TryFrom<String> for ProtocolType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value).ok_or_else(|| format!("unknown protocol type '{}'", value))
    }
}

impl From<ProtocolType> for String {
    fn from(protocol: ProtocolType) -> Self {
        protocol.as_api_str().to_string()
    }
}

impl std::fmt::Display for ProtocolType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_api_str())
    }
}

/// One export policy rule
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportPolicyRule {
    /// Priority index; lower evaluates first
    pub rule_index: u32,

    /// Allowed clients (CIDR list, comma separated)
    pub allowed_clients: String,

    #[serde(default)]
    pub unix_read_only: bool,

    #[serde(default)]
    pub unix_read_write: bool,

    #[serde(default)]
    pub cifs: bool,

    #[serde(default)]
    pub nfsv3: bool,

    #[serde(default)]
    pub nfsv4: bool,
}

/// Directed reference from a destination volume to its replication source
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceVolumeRef {
    pub resource_group: String,
    pub account_name: String,
    pub pool_name: String,
    pub volume_name: String,
}

impl SourceVolumeRef {
    pub fn new(
        resource_group: impl Into<String>,
        account_name: impl Into<String>,
        pool_name: impl Into<String>,
        volume_name: impl Into<String>,
    ) -> Self {
        Self {
            resource_group: resource_group.into(),
            account_name: account_name.into(),
            pool_name: pool_name.into(),
            volume_name: volume_name.into(),
        }
    }
}

impl std::fmt::Display for SourceVolumeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.resource_group, self.account_name, self.pool_name, self.volume_name
        )
    }
}

/// Replication transfer schedule
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReplicationSchedule {
    #[serde(rename = "_10minutely")]
    TenMinutely,
    #[default]
    #[serde(rename = "hourly")]
    Hourly,
    #[serde(rename = "daily")]
    Daily,
}

impl ReplicationSchedule {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::TenMinutely => "_10minutely",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
        }
    }
}

/// Role of a volume in a replication relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EndpointRole {
    #[serde(rename = "src")]
    Source,
    #[serde(rename = "dst")]
    Destination,
}

impl EndpointRole {
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Source => "src",
            Self::Destination => "dst",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_deserialize_with_source() {
        let json = r#"{
            "name": "V2",
            "creationToken": "v2-token",
            "type": "NFSv4.1",
            "usageThreshold": 107374182400,
            "exportPolicies": [
                { "ruleIndex": 1, "allowedClients": "0.0.0.0/0", "unixReadWrite": true, "nfsv4": true }
            ],
            "sourceVolume": {
                "resourceGroup": "rg-a",
                "accountName": "A",
                "poolName": "P",
                "volumeName": "V1"
            }
        }"#;
        let volume: Volume = serde_json::from_str(json).unwrap();
        assert_eq!(volume.protocol, ProtocolType::NfsV41);
        assert!(volume.is_destination());
        assert_eq!(volume.schedule(), ReplicationSchedule::Hourly);
        assert_eq!(volume.export_policies.len(), 1);
        assert!(volume.export_policies[0].unix_read_write);
        assert!(!volume.export_policies[0].cifs);
        assert_eq!(
            volume.source_volume.unwrap().to_string(),
            "rg-a/A/P/V1".to_string()
        );
    }

    #[test]
    fn test_volume_without_source_is_not_destination() {
        let volume = Volume::new("V1", "v1", ProtocolType::NfsV3, 100 * crate::GIB);
        assert!(!volume.is_destination());
        assert_eq!(volume.protocol_types(), vec![ProtocolType::NfsV3]);
    }

    #[test]
    fn test_schedule_serde_names() {
        let schedule: ReplicationSchedule = serde_json::from_str("\"_10minutely\"").unwrap();
        assert_eq!(schedule, ReplicationSchedule::TenMinutely);
        assert_eq!(
            serde_json::to_string(&ReplicationSchedule::Daily).unwrap(),
            "\"daily\""
        );
    }
}
