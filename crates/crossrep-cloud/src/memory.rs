//! In-memory control plane
//!
//! An eventually-consistent stand-in for the remote API. Resources become
//! visible only after a configurable number of polls, replication states
//! advance on polls rather than on the call that requested them, and the
//! hierarchy is enforced the way the real service enforces it. A child whose
//! deletion was already accepted no longer blocks deleting its parent, and a
//! replication being removed no longer blocks deleting its volumes. Every
//! call is recorded so callers can check ordering and idempotency.

use crate::error::{GatewayError, Result};
use crate::provider::{
    MirrorState, ProvisioningState, ReplicationStatus, Resource, ResourceSpec, StorageGateway,
};
use crate::resource::{ResourceId, ResourceKey, VolumeKey};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

/// How many polls each kind of convergence takes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvergenceProfile {
    /// `get` calls answering "not found" after a create
    pub presence_polls: u32,
    /// Visible `get` calls reporting `Creating` before `Succeeded`
    pub provisioning_polls: u32,
    /// Status queries before an authorized pair reports `Mirrored`
    pub mirror_polls: u32,
    /// Status queries before a broken pair reports `Broken`
    pub break_polls: u32,
    /// Polls a deleted resource or replication stays visible
    pub absence_polls: u32,
}

impl ConvergenceProfile {
    /// Everything converges on the first poll
    pub fn immediate() -> Self {
        Self {
            presence_polls: 0,
            provisioning_polls: 0,
            mirror_polls: 0,
            break_polls: 0,
            absence_polls: 0,
        }
    }
}

impl Default for ConvergenceProfile {
    fn default() -> Self {
        Self {
            presence_polls: 2,
            provisioning_polls: 1,
            mirror_polls: 3,
            break_polls: 1,
            absence_polls: 2,
        }
    }
}

/// One recorded gateway call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    Get(ResourceKey),
    Create(ResourceKey),
    Delete(ResourceKey),
    Authorize {
        source: VolumeKey,
        destination: ResourceId,
    },
    BreakReplication(VolumeKey),
    DeleteReplication(VolumeKey),
    ReplicationStatus(VolumeKey),
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Pending(u32),
    Provisioning(u32),
    Ready,
    Deleting(u32),
}

#[derive(Debug, Clone)]
struct Entry {
    id: ResourceId,
    location: String,
    phase: Phase,
    provisioning_polls: u32,
    failed: bool,
    /// Destination volume whose replication has not been removed
    data_protection: Option<ResourceId>,
}

#[derive(Debug, Clone, Copy)]
enum LinkPhase {
    Authorizing(u32),
    Mirrored,
    Breaking(u32),
    Broken,
    Removing(u32),
}

#[derive(Debug, Clone)]
struct Link {
    source: VolumeKey,
    phase: LinkPhase,
}

#[derive(Debug, Default)]
struct Inner {
    resources: HashMap<ResourceKey, Entry>,
    links: HashMap<VolumeKey, Link>,
    doomed: HashSet<ResourceKey>,
    transient_reads: u32,
    journal: Vec<GatewayCall>,
}

/// In-memory gateway
pub struct InMemoryGateway {
    subscription: String,
    profile: ConvergenceProfile,
    inner: Mutex<Inner>,
}

impl InMemoryGateway {
    pub fn new(subscription: impl Into<String>) -> Self {
        Self::with_profile(subscription, ConvergenceProfile::default())
    }

    pub fn with_profile(subscription: impl Into<String>, profile: ConvergenceProfile) -> Self {
        Self {
            subscription: subscription.into(),
            profile,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn profile(&self) -> ConvergenceProfile {
        self.profile
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Register an already-converged resource without recording a call
    pub fn seed(&self, key: impl Into<ResourceKey>, location: impl Into<String>) {
        let key = key.into();
        let entry = Entry {
            id: key.resource_id(&self.subscription),
            location: location.into(),
            phase: Phase::Ready,
            provisioning_polls: 0,
            failed: false,
            data_protection: None,
        };
        self.lock().resources.insert(key, entry);
    }

    /// Make the resource converge to `Failed` once it is created
    pub fn fail_provisioning(&self, key: impl Into<ResourceKey>) {
        let key = key.into();
        let mut inner = self.lock();
        if let Some(entry) = inner.resources.get_mut(&key) {
            entry.failed = true;
        }
        inner.doomed.insert(key);
    }

    /// Fail the next `count` read calls with a transient error
    pub fn inject_transient_reads(&self, count: u32) {
        self.lock().transient_reads += count;
    }

    /// Every call received so far, in order
    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().journal.clone()
    }

    pub fn create_calls(&self) -> Vec<ResourceKey> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Create(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    pub fn delete_calls(&self) -> Vec<ResourceKey> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                GatewayCall::Delete(key) => Some(key),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.lock().journal.clear();
    }

    /// Whether the resource exists in any phase, without polling it
    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.lock().resources.contains_key(key)
    }

    pub fn resource_count(&self) -> usize {
        self.lock().resources.len()
    }

    /// Whether a replication object exists for the destination
    pub fn has_replication(&self, destination: &VolumeKey) -> bool {
        self.lock().links.contains_key(destination)
    }

    fn take_transient(inner: &mut Inner) -> Result<()> {
        if inner.transient_reads > 0 {
            inner.transient_reads -= 1;
            return Err(GatewayError::Transient(
                "service temporarily unavailable".to_string(),
            ));
        }
        Ok(())
    }

    /// Advance a resource by one observation
    fn observe(inner: &mut Inner, key: &ResourceKey) -> Option<Resource> {
        let entry = inner.resources.get_mut(key)?;
        loop {
            match entry.phase {
                Phase::Pending(0) => entry.phase = Phase::Provisioning(entry.provisioning_polls),
                Phase::Pending(n) => {
                    entry.phase = Phase::Pending(n - 1);
                    return None;
                }
                Phase::Provisioning(0) => entry.phase = Phase::Ready,
                Phase::Provisioning(n) => {
                    entry.phase = Phase::Provisioning(n - 1);
                    return Some(resource_of(key, entry, ProvisioningState::Creating));
                }
                Phase::Ready => {
                    let state = if entry.failed {
                        ProvisioningState::Failed
                    } else {
                        ProvisioningState::Succeeded
                    };
                    return Some(resource_of(key, entry, state));
                }
                Phase::Deleting(0) => {
                    inner.resources.remove(key);
                    return None;
                }
                Phase::Deleting(n) => {
                    entry.phase = Phase::Deleting(n - 1);
                    return Some(resource_of(key, entry, ProvisioningState::Deleting));
                }
            }
        }
    }

    /// Whether a resource is visible to a caller without advancing it
    fn is_live(inner: &Inner, key: &ResourceKey) -> bool {
        inner
            .resources
            .get(key)
            .is_some_and(|e| !matches!(e.phase, Phase::Deleting(_)))
    }
}

fn resource_of(key: &ResourceKey, entry: &Entry, state: ProvisioningState) -> Resource {
    Resource {
        id: entry.id.clone(),
        key: key.clone(),
        location: entry.location.clone(),
        provisioning_state: state,
    }
}

#[async_trait]
impl StorageGateway for InMemoryGateway {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn get(&self, key: &ResourceKey) -> Result<Option<Resource>> {
        let mut inner = self.lock();
        inner.journal.push(GatewayCall::Get(key.clone()));
        Self::take_transient(&mut inner)?;
        Ok(Self::observe(&mut inner, key))
    }

    async fn create(&self, key: &ResourceKey, spec: &ResourceSpec) -> Result<()> {
        let mut inner = self.lock();
        inner.journal.push(GatewayCall::Create(key.clone()));

        if spec.kind() != key.kind() {
            return Err(GatewayError::InvalidConfig(format!(
                "{} spec given for {}",
                spec.kind(),
                key
            )));
        }
        if inner.resources.contains_key(key) {
            return Err(GatewayError::Conflict(format!("{} already exists", key)));
        }
        if let Some(parent) = key.parent() {
            if !Self::is_live(&inner, &parent) {
                return Err(GatewayError::Conflict(format!(
                    "parent {} of {} does not exist",
                    parent, key
                )));
            }
        }

        let data_protection = match spec {
            ResourceSpec::Volume(volume) => volume
                .data_protection
                .as_ref()
                .map(|dp| dp.remote_volume_resource_id.clone()),
            _ => None,
        };
        if let Some(source_id) = &data_protection {
            let source = source_id.key()?;
            if !Self::is_live(&inner, &source) {
                return Err(GatewayError::Permanent(format!(
                    "remote volume {} not found",
                    source_id
                )));
            }
        }

        let failed = inner.doomed.contains(key);
        let entry = Entry {
            id: key.resource_id(&self.subscription),
            location: spec.location().to_string(),
            phase: Phase::Pending(self.profile.presence_polls),
            provisioning_polls: self.profile.provisioning_polls,
            failed,
            data_protection,
        };
        tracing::debug!("in-memory: accepted create of {}", key);
        inner.resources.insert(key.clone(), entry);
        Ok(())
    }

    async fn delete(&self, key: &ResourceKey) -> Result<()> {
        let mut inner = self.lock();
        inner.journal.push(GatewayCall::Delete(key.clone()));

        if !inner.resources.contains_key(key) {
            return Ok(());
        }
        if let Some(child) = inner
            .resources
            .iter()
            .filter(|(_, entry)| !matches!(entry.phase, Phase::Deleting(_)))
            .map(|(k, _)| k)
            .find(|k| k.parent().as_ref() == Some(key))
        {
            return Err(GatewayError::Conflict(format!(
                "{} still contains {}",
                key, child
            )));
        }
        if let ResourceKey::Volume(volume) = key {
            let blocking = |link: &Link| !matches!(link.phase, LinkPhase::Removing(_));
            if inner.links.get(volume).is_some_and(blocking) {
                return Err(GatewayError::Conflict(format!(
                    "{} still has a replication",
                    key
                )));
            }
            if inner
                .links
                .values()
                .any(|link| &link.source == volume && blocking(link))
            {
                return Err(GatewayError::Conflict(format!(
                    "{} is the source of a replication",
                    key
                )));
            }
        }

        let absence_polls = self.profile.absence_polls;
        if let Some(entry) = inner.resources.get_mut(key) {
            if !matches!(entry.phase, Phase::Deleting(_)) {
                entry.phase = Phase::Deleting(absence_polls);
            }
        }
        Ok(())
    }

    async fn authorize_replication(
        &self,
        source: &VolumeKey,
        destination_id: &ResourceId,
    ) -> Result<()> {
        let mut inner = self.lock();
        inner.journal.push(GatewayCall::Authorize {
            source: source.clone(),
            destination: destination_id.clone(),
        });

        let destination = match destination_id.key()? {
            ResourceKey::Volume(volume) => volume,
            other => {
                return Err(GatewayError::Permanent(format!(
                    "{} is not a volume",
                    other
                )));
            }
        };
        let source_key = ResourceKey::Volume(source.clone());
        if !Self::is_live(&inner, &source_key) {
            return Err(GatewayError::Permanent(format!(
                "source {} not found",
                source_key
            )));
        }
        let destination_key = ResourceKey::Volume(destination.clone());
        let source_id = source_key.resource_id(&self.subscription);
        match inner.resources.get(&destination_key) {
            Some(entry) if !matches!(entry.phase, Phase::Deleting(_)) => {
                match &entry.data_protection {
                    Some(remote) if *remote == source_id => {}
                    Some(remote) => {
                        return Err(GatewayError::Conflict(format!(
                            "{} replicates from {}, not {}",
                            destination_key, remote, source_id
                        )));
                    }
                    None => {
                        return Err(GatewayError::Conflict(format!(
                            "{} is not a data protection volume",
                            destination_key
                        )));
                    }
                }
            }
            _ => {
                return Err(GatewayError::Permanent(format!(
                    "destination {} not found",
                    destination_key
                )));
            }
        }

        if inner.links.contains_key(&destination) {
            return Err(GatewayError::ReplicationAlreadyAuthorized(
                destination_key.to_string(),
            ));
        }
        inner.links.insert(
            destination,
            Link {
                source: source.clone(),
                phase: LinkPhase::Authorizing(self.profile.mirror_polls),
            },
        );
        Ok(())
    }

    async fn break_replication(&self, destination: &VolumeKey) -> Result<()> {
        let mut inner = self.lock();
        inner
            .journal
            .push(GatewayCall::BreakReplication(destination.clone()));

        let break_polls = self.profile.break_polls;
        match inner.links.get_mut(destination) {
            Some(link) => match link.phase {
                LinkPhase::Authorizing(_) | LinkPhase::Mirrored => {
                    link.phase = LinkPhase::Breaking(break_polls);
                    Ok(())
                }
                _ => Err(GatewayError::Conflict(format!(
                    "replication of {} is already broken",
                    destination
                ))),
            },
            None => Err(GatewayError::Conflict(format!(
                "no replication on {}",
                destination
            ))),
        }
    }

    async fn delete_replication(&self, destination: &VolumeKey) -> Result<()> {
        let mut inner = self.lock();
        inner
            .journal
            .push(GatewayCall::DeleteReplication(destination.clone()));

        let absence_polls = self.profile.absence_polls;
        match inner.links.get_mut(destination) {
            Some(link) => match link.phase {
                LinkPhase::Broken => {
                    link.phase = LinkPhase::Removing(absence_polls);
                    Ok(())
                }
                LinkPhase::Removing(_) => Ok(()),
                _ => Err(GatewayError::Conflict(format!(
                    "replication of {} must be broken before deletion",
                    destination
                ))),
            },
            None => Err(GatewayError::Conflict(format!(
                "no replication on {}",
                destination
            ))),
        }
    }

    async fn replication_status(&self, volume: &VolumeKey) -> Result<Option<ReplicationStatus>> {
        let mut inner = self.lock();
        inner
            .journal
            .push(GatewayCall::ReplicationStatus(volume.clone()));
        Self::take_transient(&mut inner)?;

        let state = match inner.links.get_mut(volume) {
            Some(link) => match link.phase {
                LinkPhase::Authorizing(0) | LinkPhase::Mirrored => {
                    link.phase = LinkPhase::Mirrored;
                    Some(MirrorState::Mirrored)
                }
                LinkPhase::Authorizing(n) => {
                    link.phase = LinkPhase::Authorizing(n - 1);
                    Some(MirrorState::Authorizing)
                }
                LinkPhase::Breaking(0) | LinkPhase::Broken => {
                    link.phase = LinkPhase::Broken;
                    Some(MirrorState::Broken)
                }
                LinkPhase::Breaking(n) => {
                    link.phase = LinkPhase::Breaking(n - 1);
                    Some(MirrorState::Mirrored)
                }
                LinkPhase::Removing(0) => None,
                LinkPhase::Removing(n) => {
                    link.phase = LinkPhase::Removing(n - 1);
                    Some(MirrorState::Broken)
                }
            },
            None => {
                let key = ResourceKey::Volume(volume.clone());
                match inner.resources.get(&key) {
                    Some(entry) if entry.data_protection.is_some() => {
                        Some(MirrorState::Uninitialized)
                    }
                    _ => None,
                }
            }
        };

        if state.is_none() && inner.links.remove(volume).is_some() {
            let key = ResourceKey::Volume(volume.clone());
            if let Some(entry) = inner.resources.get_mut(&key) {
                entry.data_protection = None;
            }
        }

        Ok(state.map(|mirror_state| ReplicationStatus {
            healthy: Some(mirror_state == MirrorState::Mirrored),
            relationship_status: Some("Idle".to_string()),
            ..ReplicationStatus::new(mirror_state)
        }))
    }
}
