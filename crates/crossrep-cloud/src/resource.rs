//! Resource kinds, keys and resource ids
//!
//! A `ResourceKey` names one resource in the account → pool → volume →
//! snapshot hierarchy. Every key renders to (and parses from) an ARM-style
//! resource id:
//!
//! ```text
//! /subscriptions/{sub}/resourceGroups/{rg}/providers/Microsoft.NetApp/
//!     netAppAccounts/{account}/capacityPools/{pool}/volumes/{volume}/snapshots/{snapshot}
//! ```

use crate::error::{GatewayError, Result};
use crossrep_core::{Account, CapacityPool, SourceVolumeRef, Volume};
use serde::{Deserialize, Serialize};

/// Provider namespace of every managed resource
pub const PROVIDER_NAMESPACE: &str = "Microsoft.NetApp";

/// Kind of a managed resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Account,
    Pool,
    Volume,
    Snapshot,
}

impl ResourceKind {
    /// Path segment used in resource ids
    pub fn segment(&self) -> &'static str {
        match self {
            ResourceKind::Account => "netAppAccounts",
            ResourceKind::Pool => "capacityPools",
            ResourceKind::Volume => "volumes",
            ResourceKind::Snapshot => "snapshots",
        }
    }

    fn from_segment(segment: &str) -> Option<Self> {
        [
            ResourceKind::Account,
            ResourceKind::Pool,
            ResourceKind::Volume,
            ResourceKind::Snapshot,
        ]
        .into_iter()
        .find(|kind| kind.segment().eq_ignore_ascii_case(segment))
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Account => write!(f, "account"),
            ResourceKind::Pool => write!(f, "capacity pool"),
            ResourceKind::Volume => write!(f, "volume"),
            ResourceKind::Snapshot => write!(f, "snapshot"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountKey {
    pub resource_group: String,
    pub account: String,
}

impl AccountKey {
    pub fn new(resource_group: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            resource_group: resource_group.into(),
            account: account.into(),
        }
    }

    pub fn of(account: &Account) -> Self {
        Self::new(&account.resource_group, &account.name)
    }

    pub fn pool(&self, pool: impl Into<String>) -> PoolKey {
        PoolKey {
            account: self.clone(),
            pool: pool.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolKey {
    pub account: AccountKey,
    pub pool: String,
}

impl PoolKey {
    pub fn of(account: &Account, pool: &CapacityPool) -> Self {
        AccountKey::of(account).pool(&pool.name)
    }

    pub fn volume(&self, volume: impl Into<String>) -> VolumeKey {
        VolumeKey {
            pool: self.clone(),
            volume: volume.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VolumeKey {
    pub pool: PoolKey,
    pub volume: String,
}

impl VolumeKey {
    pub fn new(
        resource_group: impl Into<String>,
        account: impl Into<String>,
        pool: impl Into<String>,
        volume: impl Into<String>,
    ) -> Self {
        AccountKey::new(resource_group, account)
            .pool(pool)
            .volume(volume)
    }

    pub fn of(account: &Account, pool: &CapacityPool, volume: &Volume) -> Self {
        PoolKey::of(account, pool).volume(&volume.name)
    }

    pub fn snapshot(&self, snapshot: impl Into<String>) -> SnapshotKey {
        SnapshotKey {
            volume: self.clone(),
            snapshot: snapshot.into(),
        }
    }
}

impl From<&SourceVolumeRef> for VolumeKey {
    fn from(source: &SourceVolumeRef) -> Self {
        VolumeKey::new(
            &source.resource_group,
            &source.account_name,
            &source.pool_name,
            &source.volume_name,
        )
    }
}

impl std::fmt::Display for VolumeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", ResourceKey::Volume(self.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SnapshotKey {
    pub volume: VolumeKey,
    pub snapshot: String,
}

/// Identity of one managed resource, tagged by kind
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceKey {
    Account(AccountKey),
    Pool(PoolKey),
    Volume(VolumeKey),
    Snapshot(SnapshotKey),
}

impl ResourceKey {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceKey::Account(_) => ResourceKind::Account,
            ResourceKey::Pool(_) => ResourceKind::Pool,
            ResourceKey::Volume(_) => ResourceKind::Volume,
            ResourceKey::Snapshot(_) => ResourceKind::Snapshot,
        }
    }

    /// Key of the owning resource (none for accounts)
    pub fn parent(&self) -> Option<ResourceKey> {
        match self {
            ResourceKey::Account(_) => None,
            ResourceKey::Pool(k) => Some(ResourceKey::Account(k.account.clone())),
            ResourceKey::Volume(k) => Some(ResourceKey::Pool(k.pool.clone())),
            ResourceKey::Snapshot(k) => Some(ResourceKey::Volume(k.volume.clone())),
        }
    }

    pub fn account_key(&self) -> &AccountKey {
        match self {
            ResourceKey::Account(k) => k,
            ResourceKey::Pool(k) => &k.account,
            ResourceKey::Volume(k) => &k.pool.account,
            ResourceKey::Snapshot(k) => &k.volume.pool.account,
        }
    }

    /// Name of the resource itself
    pub fn name(&self) -> &str {
        match self {
            ResourceKey::Account(k) => &k.account,
            ResourceKey::Pool(k) => &k.pool,
            ResourceKey::Volume(k) => &k.volume,
            ResourceKey::Snapshot(k) => &k.snapshot,
        }
    }

    /// Resource id path below the subscription
    pub fn path(&self) -> String {
        let mut path = match self.parent() {
            Some(parent) => parent.path(),
            None => format!(
                "/resourceGroups/{}/providers/{}",
                self.account_key().resource_group,
                PROVIDER_NAMESPACE
            ),
        };
        path.push('/');
        path.push_str(self.kind().segment());
        path.push('/');
        path.push_str(self.name());
        path
    }

    /// Full resource id within a subscription
    pub fn resource_id(&self, subscription: &str) -> ResourceId {
        ResourceId(format!("/subscriptions/{}{}", subscription, self.path()))
    }
}

impl From<AccountKey> for ResourceKey {
    fn from(key: AccountKey) -> Self {
        ResourceKey::Account(key)
    }
}

impl From<PoolKey> for ResourceKey {
    fn from(key: PoolKey) -> Self {
        ResourceKey::Pool(key)
    }
}

impl From<VolumeKey> for ResourceKey {
    fn from(key: VolumeKey) -> Self {
        ResourceKey::Volume(key)
    }
}

impl From<SnapshotKey> for ResourceKey {
    fn from(key: SnapshotKey) -> Self {
        ResourceKey::Snapshot(key)
    }
}

impl std::fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let account = self.account_key();
        write!(f, "{} {}/{}", self.kind(), account.resource_group, account.account)?;
        match self {
            ResourceKey::Account(_) => Ok(()),
            ResourceKey::Pool(k) => write!(f, "/{}", k.pool),
            ResourceKey::Volume(k) => write!(f, "/{}/{}", k.pool.pool, k.volume),
            ResourceKey::Snapshot(k) => write!(
                f,
                "/{}/{}/{}",
                k.volume.pool.pool, k.volume.volume, k.snapshot
            ),
        }
    }
}

/// Provider-assigned resource id
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Subscription segment, if the id carries one
    pub fn subscription(&self) -> Option<&str> {
        let mut segments = self.0.split('/').filter(|s| !s.is_empty());
        match (segments.next(), segments.next()) {
            (Some(name), Some(value)) if name.eq_ignore_ascii_case("subscriptions") => Some(value),
            _ => None,
        }
    }

    /// Recover the resource key from the id
    ///
    /// Segments are read pairwise, so a resource group named like a
    /// segment (e.g. "volumes") is not mistaken for one.
    pub fn key(&self) -> Result<ResourceKey> {
        let invalid = || GatewayError::InvalidResourceId(self.0.clone());

        let segments: Vec<&str> = self.0.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() % 2 != 0 {
            return Err(invalid());
        }

        let mut pairs = segments
            .chunks_exact(2)
            .map(|pair| (pair[0], pair[1]))
            .peekable();

        if pairs
            .peek()
            .is_some_and(|(name, _)| name.eq_ignore_ascii_case("subscriptions"))
        {
            pairs.next();
        }

        let resource_group = match pairs.next() {
            Some((name, value)) if name.eq_ignore_ascii_case("resourceGroups") => value,
            _ => return Err(invalid()),
        };
        match pairs.next() {
            Some((name, value))
                if name.eq_ignore_ascii_case("providers")
                    && value.eq_ignore_ascii_case(PROVIDER_NAMESPACE) => {}
            _ => return Err(invalid()),
        }
        let account = match pairs.next() {
            Some((name, value))
                if ResourceKind::from_segment(name) == Some(ResourceKind::Account) =>
            {
                value
            }
            _ => return Err(invalid()),
        };

        let mut key = ResourceKey::Account(AccountKey::new(resource_group, account));
        for (name, value) in pairs {
            key = match (key, ResourceKind::from_segment(name)) {
                (ResourceKey::Account(k), Some(ResourceKind::Pool)) => k.pool(value).into(),
                (ResourceKey::Pool(k), Some(ResourceKind::Volume)) => k.volume(value).into(),
                (ResourceKey::Volume(k), Some(ResourceKind::Snapshot)) => {
                    k.snapshot(value).into()
                }
                _ => return Err(invalid()),
            };
        }
        Ok(key)
    }
}

impl std::fmt::Display for ResourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
