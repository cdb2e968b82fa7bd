//! Resource provisioner
//!
//! Creates the hierarchy depth-first in listed order: an account, then each
//! of its pools, each pool followed by its volumes. Resources that already
//! exist are left untouched, so running twice creates nothing new.

use crate::clock::Sleeper;
use crate::config::OrchestratorConfig;
use crate::error::{Operation, OrchestratorError, Result};
use crate::report::{RunReport, StepKind};
use crate::waiter::{WaitOutcome, Waiter};
use crossrep_cloud::{
    AccountKey, AccountSpec, DataProtection, PoolKey, PoolSpec, ProvisioningState, Resource,
    ResourceId, ResourceKey, ResourceSpec, StorageGateway, VolumeKey, VolumeSpec,
};
use crossrep_core::{Account, CapacityPool, EndpointRole, ProjectConfig, Volume};
use std::time::Instant;

pub struct Provisioner<'a> {
    waiter: Waiter<'a>,
    config: &'a OrchestratorConfig,
}

impl<'a> Provisioner<'a> {
    pub fn new(
        gateway: &'a dyn StorageGateway,
        sleeper: &'a dyn Sleeper,
        config: &'a OrchestratorConfig,
    ) -> Self {
        Self {
            waiter: Waiter::new(gateway, sleeper),
            config,
        }
    }

    /// Ensure every account, pool and volume of the topology exists
    pub async fn run(&self, project: &ProjectConfig) -> Result<RunReport> {
        let started = Instant::now();
        let mut report = RunReport::new();

        tracing::info!(
            "Provisioning {} account(s), {} pool(s), {} volume(s) via {}",
            project.accounts.len(),
            project.pool_count(),
            project.volume_count(),
            self.waiter.gateway().name()
        );

        for account in &project.accounts {
            self.ensure_account(account, &mut report).await?;
        }

        report.finish(started);
        Ok(report)
    }

    async fn ensure_account(&self, account: &Account, report: &mut RunReport) -> Result<()> {
        let key = AccountKey::of(account);
        let spec = ResourceSpec::Account(AccountSpec {
            location: account.location.clone(),
        });
        self.ensure(key.into(), &spec, report).await?;

        for pool in &account.capacity_pools {
            self.ensure_pool(account, pool, report).await?;
        }
        Ok(())
    }

    async fn ensure_pool(
        &self,
        account: &Account,
        pool: &CapacityPool,
        report: &mut RunReport,
    ) -> Result<()> {
        let key = PoolKey::of(account, pool);
        let spec = ResourceSpec::Pool(PoolSpec {
            location: account.location.clone(),
            service_level: pool.service_level,
            size: pool.size,
        });
        self.ensure(key.into(), &spec, report).await?;

        for volume in &pool.volumes {
            self.ensure_volume(account, pool, volume, report).await?;
        }
        Ok(())
    }

    async fn ensure_volume(
        &self,
        account: &Account,
        pool: &CapacityPool,
        volume: &Volume,
        report: &mut RunReport,
    ) -> Result<()> {
        let key: ResourceKey = VolumeKey::of(account, pool, volume).into();

        if let Some(existing) = self.existing(&key).await? {
            return keep_existing(existing, report);
        }

        let source_id = match &volume.source_volume {
            Some(source) => {
                let source_key: ResourceKey = VolumeKey::from(source).into();
                let resolved = self
                    .waiter
                    .lookup(&source_key, &self.config.request)
                    .await?
                    .ok_or_else(|| OrchestratorError::SourceVolumeNotFound {
                        destination: key.clone(),
                        source_volume: source_key.clone(),
                    })?;
                tracing::debug!("Resolved source {} to {}", source_key, resolved.id);
                Some(resolved.id)
            }
            None => None,
        };

        let spec = ResourceSpec::Volume(volume_spec(account, volume, source_id));
        self.create(key, &spec, report).await
    }

    /// Create `key` unless it already exists
    async fn ensure(&self, key: ResourceKey, spec: &ResourceSpec, report: &mut RunReport) -> Result<()> {
        match self.existing(&key).await? {
            Some(existing) => keep_existing(existing, report),
            None => self.create(key, spec, report).await,
        }
    }

    /// Current resource at `key`; a resource being deleted is waited out first
    async fn existing(&self, key: &ResourceKey) -> Result<Option<Resource>> {
        let existing = self.waiter.lookup(key, &self.config.request).await?;
        match existing {
            Some(resource) if resource.provisioning_state == ProvisioningState::Deleting => {
                tracing::info!("{} is being deleted, waiting before recreating it", key);
                match self.waiter.absent(key, &self.config.absence).await? {
                    WaitOutcome::Converged { .. } => Ok(None),
                    WaitOutcome::TimedOut { attempts } => Err(OrchestratorError::StillDeleting {
                        resource: key.clone(),
                        attempts,
                    }),
                }
            }
            other => Ok(other),
        }
    }

    async fn create(&self, key: ResourceKey, spec: &ResourceSpec, report: &mut RunReport) -> Result<()> {
        tracing::info!("Creating {}", key);
        let gateway = self.waiter.gateway();
        let target = &key;
        self.waiter
            .call(Operation::Create, &key, &self.config.request, move || {
                gateway.create(target, spec)
            })
            .await?;

        let created = self.waiter.present(&key, &self.config.presence).await?;
        tracing::info!("Created {} ({})", key, created.id);
        report.record(StepKind::Created, key, Some(created.id));
        Ok(())
    }
}

fn keep_existing(existing: Resource, report: &mut RunReport) -> Result<()> {
    if existing.provisioning_state.is_failed() {
        return Err(OrchestratorError::ProvisioningFailed {
            resource: existing.key,
            reason: format!("existing resource is in state {}", existing.provisioning_state),
        });
    }
    tracing::info!("{} already exists, skipping", existing.key);
    report.record(StepKind::Unchanged, existing.key, Some(existing.id));
    Ok(())
}

/// Create request of a volume; destinations carry their data protection settings
pub fn volume_spec(account: &Account, volume: &Volume, source_id: Option<ResourceId>) -> VolumeSpec {
    VolumeSpec {
        location: account.location.to_lowercase(),
        creation_token: volume.creation_token.clone(),
        usage_threshold: volume.usage_threshold,
        protocol_types: volume.protocol_types(),
        subnet_id: volume.subnet_id.clone(),
        export_policy: volume.export_policies.clone(),
        data_protection: source_id.map(|remote_volume_resource_id| DataProtection {
            endpoint: EndpointRole::Destination,
            remote_volume_resource_id,
            schedule: volume.schedule(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::InstantSleeper;
    use crate::config::WaitPolicy;
    use crossrep_cloud::{ConvergenceProfile, GatewayCall, InMemoryGateway};
    use crossrep_core::{ProtocolType, ReplicationSchedule, ServiceLevel, SourceVolumeRef, GIB, TIB};
    use std::time::Duration;

    fn topology() -> ProjectConfig {
        ProjectConfig::new(vec![
            Account::new("rg", "A", "EastUS").with_pool(
                CapacityPool::new("P", ServiceLevel::Premium, 4 * TIB)
                    .with_volume(Volume::new("V1", "v1", ProtocolType::NfsV3, 100 * GIB)),
            ),
            Account::new("rg", "B", "westus").with_pool(
                CapacityPool::new("P2", ServiceLevel::Standard, 4 * TIB).with_volume(
                    Volume::new("V2", "v2", ProtocolType::NfsV3, 100 * GIB)
                        .with_source(SourceVolumeRef::new("rg", "A", "P", "V1")),
                ),
            ),
        ])
    }

    fn account_key(name: &str) -> ResourceKey {
        AccountKey::new("rg", name).into()
    }

    #[tokio::test]
    async fn test_creates_depth_first() {
        let gateway = InMemoryGateway::new("sub");
        let sleeper = InstantSleeper::new();
        let config = OrchestratorConfig::default();

        let report = Provisioner::new(&gateway, &sleeper, &config)
            .run(&topology())
            .await
            .unwrap();

        let expected: Vec<ResourceKey> = vec![
            account_key("A"),
            AccountKey::new("rg", "A").pool("P").into(),
            VolumeKey::new("rg", "A", "P", "V1").into(),
            account_key("B"),
            AccountKey::new("rg", "B").pool("P2").into(),
            VolumeKey::new("rg", "B", "P2", "V2").into(),
        ];
        assert_eq!(gateway.create_calls(), expected);
        assert_eq!(report.summary().created, 6);
        assert_eq!(gateway.resource_count(), 6);
    }

    #[tokio::test]
    async fn test_second_run_creates_nothing() {
        let gateway = InMemoryGateway::with_profile("sub", ConvergenceProfile::immediate());
        let sleeper = InstantSleeper::new();
        let config = OrchestratorConfig::default();
        let provisioner = Provisioner::new(&gateway, &sleeper, &config);

        provisioner.run(&topology()).await.unwrap();
        gateway.clear_calls();
        let report = provisioner.run(&topology()).await.unwrap();

        assert!(gateway.create_calls().is_empty());
        assert_eq!(report.summary().unchanged, 6);
        assert_eq!(report.summary().created, 0);
    }

    #[tokio::test]
    async fn test_missing_source_fails_before_create() {
        let gateway = InMemoryGateway::with_profile("sub", ConvergenceProfile::immediate());
        let sleeper = InstantSleeper::new();
        let config = OrchestratorConfig::default();
        let mut project = topology();
        // the destination now lists its account first, so the source is never created
        project.accounts.reverse();

        let err = Provisioner::new(&gateway, &sleeper, &config)
            .run(&project)
            .await
            .unwrap_err();

        let destination: ResourceKey = VolumeKey::new("rg", "B", "P2", "V2").into();
        assert!(matches!(
            &err,
            OrchestratorError::SourceVolumeNotFound { destination: d, .. } if *d == destination
        ));
        assert!(!gateway.calls().contains(&GatewayCall::Create(destination)));
        assert_eq!(gateway.create_calls().len(), 2);
    }

    #[tokio::test]
    async fn test_existing_failed_resource_is_fatal() {
        let gateway = InMemoryGateway::with_profile("sub", ConvergenceProfile::immediate());
        let sleeper = InstantSleeper::new();
        let config = OrchestratorConfig::default();
        gateway.seed(account_key("A"), "eastus");
        gateway.fail_provisioning(account_key("A"));

        let err = Provisioner::new(&gateway, &sleeper, &config)
            .run(&topology())
            .await
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::ProvisioningFailed { .. }));
        assert!(gateway.create_calls().is_empty());
    }

    #[tokio::test]
    async fn test_pool_failing_after_creating_stops_the_run() {
        let gateway = InMemoryGateway::with_profile(
            "sub",
            ConvergenceProfile {
                provisioning_polls: 1,
                ..ConvergenceProfile::immediate()
            },
        );
        let sleeper = InstantSleeper::new();
        let config = OrchestratorConfig::default();
        let pool: ResourceKey = AccountKey::new("rg", "A").pool("P").into();
        gateway.fail_provisioning(pool.clone());

        let err = Provisioner::new(&gateway, &sleeper, &config)
            .run(&topology())
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            OrchestratorError::ProvisioningFailed { resource, .. } if *resource == pool
        ));
        assert_eq!(gateway.create_calls(), vec![account_key("A"), pool]);
    }

    #[tokio::test]
    async fn test_resource_being_deleted_is_recreated() {
        let gateway = InMemoryGateway::with_profile(
            "sub",
            ConvergenceProfile {
                absence_polls: 2,
                ..ConvergenceProfile::immediate()
            },
        );
        let sleeper = InstantSleeper::new();
        let config = OrchestratorConfig::default();
        gateway.seed(account_key("A"), "eastus");
        gateway.delete(&account_key("A")).await.unwrap();

        let report = Provisioner::new(&gateway, &sleeper, &config)
            .run(&topology())
            .await
            .unwrap();

        assert_eq!(gateway.create_calls().first(), Some(&account_key("A")));
        assert_eq!(report.summary().created, 6);
        assert_eq!(report.summary().unchanged, 0);
    }

    #[tokio::test]
    async fn test_resource_stuck_deleting_is_reported() {
        let gateway = InMemoryGateway::with_profile(
            "sub",
            ConvergenceProfile {
                absence_polls: 50,
                ..ConvergenceProfile::immediate()
            },
        );
        let sleeper = InstantSleeper::new();
        let config = OrchestratorConfig::uniform(WaitPolicy::new(Duration::from_secs(1), 3));
        gateway.seed(account_key("A"), "eastus");
        gateway.delete(&account_key("A")).await.unwrap();

        let err = Provisioner::new(&gateway, &sleeper, &config)
            .run(&topology())
            .await
            .unwrap_err();

        assert!(matches!(
            &err,
            OrchestratorError::StillDeleting { resource, attempts: 3 } if *resource == account_key("A")
        ));
        assert!(gateway.create_calls().is_empty());
    }

    #[tokio::test]
    async fn test_waits_for_presence_after_each_create() {
        let gateway = InMemoryGateway::with_profile(
            "sub",
            ConvergenceProfile {
                presence_polls: 2,
                ..ConvergenceProfile::immediate()
            },
        );
        let sleeper = InstantSleeper::new();
        let config = OrchestratorConfig::default();

        Provisioner::new(&gateway, &sleeper, &config)
            .run(&topology())
            .await
            .unwrap();

        // six resources, two "not found" polls each
        assert_eq!(sleeper.count(), 12);
    }

    #[test]
    fn test_destination_spec() {
        let project = topology();
        let account = &project.accounts[1];
        let volume = &account.capacity_pools[0].volumes[0];
        let source_id = ResourceId::new(
            "/subscriptions/sub/resourceGroups/rg/providers/Microsoft.NetApp/netAppAccounts/A/capacityPools/P/volumes/V1",
        );

        let spec = volume_spec(account, volume, Some(source_id.clone()));
        let dp = spec.data_protection.as_ref().unwrap();
        assert_eq!(dp.endpoint, EndpointRole::Destination);
        assert_eq!(dp.remote_volume_resource_id, source_id);
        assert_eq!(dp.schedule, ReplicationSchedule::Hourly);
        assert_eq!(spec.volume_type(), Some("DataProtection"));

        let source_account = &project.accounts[0];
        let source = volume_spec(source_account, &source_account.capacity_pools[0].volumes[0], None);
        assert_eq!(source.location, "eastus");
        assert!(source.data_protection.is_none());
    }
}
