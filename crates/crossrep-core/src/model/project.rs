//! Project-level configuration: the topology plus run-wide settings

use super::account::{Account, CapacityPool};
use super::volume::Volume;
use serde::{Deserialize, Deserializer, Serialize};

/// Complete desired state of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub general: GeneralSettings,

    /// Accounts, in creation order
    #[serde(default)]
    pub accounts: Vec<Account>,
}

impl ProjectConfig {
    pub fn new(accounts: Vec<Account>) -> Self {
        Self {
            general: GeneralSettings::default(),
            accounts,
        }
    }

    /// Every volume of the topology, depth-first in listed order
    pub fn volumes(&self) -> impl Iterator<Item = VolumeEntry<'_>> {
        self.accounts.iter().flat_map(|account| {
            account
                .volumes()
                .map(move |(pool, volume)| VolumeEntry {
                    account,
                    pool,
                    volume,
                })
        })
    }

    /// Destination volumes only
    pub fn destinations(&self) -> impl Iterator<Item = VolumeEntry<'_>> {
        self.volumes().filter(|entry| entry.volume.is_destination())
    }

    pub fn pool_count(&self) -> usize {
        self.accounts.iter().map(|a| a.capacity_pools.len()).sum()
    }

    pub fn volume_count(&self) -> usize {
        self.volumes().count()
    }
}

/// A volume together with its owning account and pool
#[derive(Debug, Clone, Copy)]
pub struct VolumeEntry<'a> {
    pub account: &'a Account,
    pub pool: &'a CapacityPool,
    pub volume: &'a Volume,
}

/// Run-wide settings (the `general` section)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralSettings {
    /// Subscription the accounts are deployed into
    #[serde(default)]
    pub subscription_id: String,

    /// Run cleanup after provisioning and replication
    #[serde(
        default,
        rename = "shouldCleanUp",
        deserialize_with = "deserialize_flag"
    )]
    pub should_cleanup: bool,

    /// Polling overrides
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub polling: Option<PollingSettings>,
}

/// Optional overrides of the convergence-wait policy
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollingSettings {
    pub interval_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub settle_interval_ms: Option<u64>,
    pub settle_retries: Option<u32>,
    pub post_authorize_delay_ms: Option<u64>,
}

/// Accepts `true`/`false` or the strings `"true"`/`"false"`
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => Ok(b),
        Flag::Text(s) => match s.trim().to_lowercase().as_str() {
            "true" => Ok(true),
            "false" | "" => Ok(false),
            other => Err(serde::de::Error::custom(format!(
                "expected true or false, got '{}'",
                other
            ))),
        },
    }
}
