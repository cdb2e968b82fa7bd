//! Account and capacity pool definitions

use super::volume::Volume;
use serde::{Deserialize, Serialize};

/// Storage account: the tenant-scoped container for capacity pools
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    /// Account name, unique within the resource group
    pub name: String,

    /// Resource group that owns the account
    pub resource_group: String,

    /// Region (e.g. "eastus")
    pub location: String,

    /// Capacity pools, in creation order
    #[serde(default)]
    pub capacity_pools: Vec<CapacityPool>,
}

impl Account {
    pub fn new(
        resource_group: impl Into<String>,
        name: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            resource_group: resource_group.into(),
            location: location.into(),
            capacity_pools: Vec::new(),
        }
    }

    pub fn with_pool(mut self, pool: CapacityPool) -> Self {
        self.capacity_pools.push(pool);
        self
    }

    /// Iterate over every volume of every pool, in listed order
    pub fn volumes(&self) -> impl Iterator<Item = (&CapacityPool, &Volume)> {
        self.capacity_pools
            .iter()
            .flat_map(|pool| pool.volumes.iter().map(move |volume| (pool, volume)))
    }
}

/// Capacity pool: a sized allocation at a given service level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityPool {
    pub name: String,

    pub service_level: ServiceLevel,

    /// Pool size in bytes
    pub size: u64,

    #[serde(default)]
    pub volumes: Vec<Volume>,
}

impl CapacityPool {
    pub fn new(name: impl Into<String>, service_level: ServiceLevel, size: u64) -> Self {
        Self {
            name: name.into(),
            service_level,
            size,
            volumes: Vec::new(),
        }
    }

    pub fn with_volume(mut self, volume: Volume) -> Self {
        self.volumes.push(volume);
        self
    }
}

/// Performance tier of a capacity pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ServiceLevel {
    Standard,
    Premium,
    Ultra,
}

impl ServiceLevel {
    /// Parse a service level name, case-insensitively
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Some(Self::Standard),
            "premium" => Some(Self::Premium),
            "ultra" => Some(Self::Ultra),
            _ => None,
        }
    }

    /// Name used by the provider API
    pub fn as_api_str(&self) -> &'static str {
        match self {
            Self::Standard => "Standard",
            Self::Premium => "Premium",
            Self::Ultra => "Ultra",
        }
    }
}

impl TryFrom<String> for ServiceLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_str(&value).ok_or_else(|| format!("unknown service level '{}'", value))
    }
}

impl From<ServiceLevel> for String {
    fn from(level: ServiceLevel) -> Self {
        level.as_api_str().to_string()
    }
}

impl std::fmt::Display for ServiceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_api_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_level_parse() {
        assert_eq!(ServiceLevel::from_str("premium"), Some(ServiceLevel::Premium));
        assert_eq!(ServiceLevel::from_str("ULTRA"), Some(ServiceLevel::Ultra));
        assert_eq!(ServiceLevel::from_str("gold"), None);
    }

    #[test]
    fn test_pool_deserialize() {
        let json = r#"{ "name": "P", "serviceLevel": "Premium", "size": 4398046511104 }"#;
        let pool: CapacityPool = serde_json::from_str(json).unwrap();
        assert_eq!(pool.service_level, ServiceLevel::Premium);
        assert_eq!(pool.size, 4 * crate::TIB);
        assert!(pool.volumes.is_empty());
    }

    #[test]
    fn test_unknown_service_level_rejected() {
        let json = r#"{ "name": "P", "serviceLevel": "Gold", "size": 1 }"#;
        let err = serde_json::from_str::<CapacityPool>(json).unwrap_err();
        assert!(err.to_string().contains("unknown service level"));
    }
}
