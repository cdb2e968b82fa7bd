//! Cleanup orchestrator
//!
//! Tears the topology down in two phases. Replication is removed first, from
//! the last listed destination to the first: break the relationship, wait
//! for `Broken`, delete the replication object, then wait for it to vanish.
//! Resources are then deleted in exact reverse of creation order.
//!
//! Waiting for a deleted object to disappear is soft: a timeout is logged
//! and recorded in the report, and the run moves on. Every other failure
//! aborts the cleanup.

use crate::clock::Sleeper;
use crate::config::OrchestratorConfig;
use crate::error::{Operation, Result};
use crate::report::{RunReport, StepKind};
use crate::waiter::{WaitOutcome, Waiter};
use crossrep_cloud::{AccountKey, MirrorState, ResourceKey, StorageGateway, VolumeKey};
use crossrep_core::{ProjectConfig, VolumeEntry};
use std::time::Instant;

pub struct CleanupOrchestrator<'a> {
    waiter: Waiter<'a>,
    config: &'a OrchestratorConfig,
}

impl<'a> CleanupOrchestrator<'a> {
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

    pub async fn run(&self, project: &ProjectConfig) -> Result<RunReport> {
        let started = Instant::now();
        let mut report = RunReport::new();

        tracing::info!("Removing replication");
        let destinations: Vec<VolumeEntry<'_>> = project.destinations().collect();
        for entry in destinations.iter().rev() {
            self.remove_replication(entry, &mut report).await?;
        }

        tracing::info!("Deleting resources");
        for account in project.accounts.iter().rev() {
            let account_key = AccountKey::of(account);
            for pool in account.capacity_pools.iter().rev() {
                let pool_key = account_key.pool(&pool.name);
                for volume in pool.volumes.iter().rev() {
                    self.remove(pool_key.volume(&volume.name).into(), &mut report)
                        .await?;
                }
                self.remove(pool_key.into(), &mut report).await?;
            }
            self.remove(account_key.into(), &mut report).await?;
        }

        report.finish(started);
        Ok(report)
    }

    async fn remove_replication(&self, entry: &VolumeEntry<'_>, report: &mut RunReport) -> Result<()> {
        let gateway = self.waiter.gateway();
        let destination = VolumeKey::of(entry.account, entry.pool, entry.volume);
        let key: ResourceKey = destination.clone().into();
        let volume = &destination;

        if self.waiter.lookup(&key, &self.config.request).await?.is_none() {
            tracing::info!("{} does not exist, no replication to remove", key);
            report.record(StepKind::AlreadyAbsent, key, None);
            return Ok(());
        }

        let status = self
            .waiter
            .call(
                Operation::ReplicationStatus,
                &key,
                &self.config.request,
                move || gateway.replication_status(volume),
            )
            .await?;

        match status.map(|s| s.mirror_state) {
            None | Some(MirrorState::Uninitialized) => {
                tracing::info!("{} has no replication", key);
                report.record(StepKind::NoReplication, key, None);
                return Ok(());
            }
            Some(MirrorState::Broken) => {
                tracing::info!("Replication of {} is already broken", key);
            }
            Some(state) => {
                tracing::info!("Breaking replication of {} ({})", key, state);
                self.waiter
                    .call(
                        Operation::BreakReplication,
                        &key,
                        &self.config.request,
                        move || gateway.break_replication(volume),
                    )
                    .await?;
                self.waiter
                    .mirror_state(&destination, MirrorState::Broken, &self.config.replication)
                    .await?;
            }
        }
        report.record(StepKind::Broken, key.clone(), None);

        tracing::info!("Deleting replication of {}", key);
        self.waiter
            .call(
                Operation::DeleteReplication,
                &key,
                &self.config.request,
                move || gateway.delete_replication(volume),
            )
            .await?;

        let outcome = self
            .waiter
            .replication_removed(&destination, &self.config.absence)
            .await?;
        if let WaitOutcome::TimedOut { attempts } = outcome {
            tracing::warn!(
                "Replication of {} still reported after {} polls, continuing",
                key,
                attempts
            );
            report.warn(
                key.clone(),
                format!("replication still reported after {} polls", attempts),
            );
        }
        report.record(StepKind::ReplicationDeleted, key, None);
        Ok(())
    }

    async fn remove(&self, key: ResourceKey, report: &mut RunReport) -> Result<()> {
        let gateway = self.waiter.gateway();

        let Some(existing) = self.waiter.lookup(&key, &self.config.request).await? else {
            tracing::info!("{} already absent, skipping", key);
            report.record(StepKind::AlreadyAbsent, key, None);
            return Ok(());
        };

        tracing::info!("Deleting {}", key);
        let target = &key;
        self.waiter
            .call(Operation::Delete, &key, &self.config.request, move || {
                gateway.delete(target)
            })
            .await?;

        match self.waiter.absent(&key, &self.config.absence).await? {
            WaitOutcome::Converged { .. } => tracing::info!("Deleted {}", key),
            WaitOutcome::TimedOut { attempts } => {
                tracing::warn!("{} still present after {} polls, continuing", key, attempts);
                report.warn(key.clone(), format!("still present after {} polls", attempts));
            }
        }
        report.record(StepKind::Deleted, key, Some(existing.id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::InstantSleeper;
    use crate::config::WaitPolicy;
    use crate::error::OrchestratorError;
    use crate::provisioner::Provisioner;
    use crate::replication::ReplicationOrchestrator;
    use crossrep_cloud::{ConvergenceProfile, GatewayCall, InMemoryGateway};
    use crossrep_core::{Account, CapacityPool, ProtocolType, ServiceLevel, SourceVolumeRef, Volume, GIB, TIB};
    use std::time::Duration;

    fn topology() -> ProjectConfig {
        ProjectConfig::new(vec![
            Account::new("rg", "A", "eastus").with_pool(
                CapacityPool::new("P", ServiceLevel::Premium, 4 * TIB)
                    .with_volume(Volume::new("V1", "v1", ProtocolType::NfsV3, 100 * GIB)),
            ),
            Account::new("rg", "B", "westus").with_pool(
                CapacityPool::new("P2", ServiceLevel::Premium, 4 * TIB).with_volume(
                    Volume::new("V2", "v2", ProtocolType::NfsV3, 100 * GIB)
                        .with_source(SourceVolumeRef::new("rg", "A", "P", "V1")),
                ),
            ),
        ])
    }

    fn config() -> OrchestratorConfig {
        OrchestratorConfig::uniform(WaitPolicy::new(Duration::from_secs(1), 10))
    }

    async fn replicated(gateway: &InMemoryGateway, sleeper: &InstantSleeper, config: &OrchestratorConfig) {
        let project = topology();
        Provisioner::new(gateway, sleeper, config)
            .run(&project)
            .await
            .unwrap();
        ReplicationOrchestrator::new(gateway, sleeper, config)
            .run(&project)
            .await
            .unwrap();
        gateway.clear_calls();
    }

    #[tokio::test]
    async fn test_deletes_in_reverse_creation_order() {
        let gateway = InMemoryGateway::new("sub");
        let sleeper = InstantSleeper::new();
        let config = config();
        replicated(&gateway, &sleeper, &config).await;

        let report = CleanupOrchestrator::new(&gateway, &sleeper, &config)
            .run(&topology())
            .await
            .unwrap();

        let expected: Vec<ResourceKey> = vec![
            VolumeKey::new("rg", "B", "P2", "V2").into(),
            AccountKey::new("rg", "B").pool("P2").into(),
            AccountKey::new("rg", "B").into(),
            VolumeKey::new("rg", "A", "P", "V1").into(),
            AccountKey::new("rg", "A").pool("P").into(),
            AccountKey::new("rg", "A").into(),
        ];
        assert_eq!(gateway.delete_calls(), expected);
        assert_eq!(gateway.resource_count(), 0);
        assert!(report.is_clean());

        // replication is removed before any resource delete
        let calls = gateway.calls();
        let position = |wanted: &GatewayCall| calls.iter().position(|c| c == wanted).unwrap();
        let destination = VolumeKey::new("rg", "B", "P2", "V2");
        let broken = position(&GatewayCall::BreakReplication(destination.clone()));
        let removed = position(&GatewayCall::DeleteReplication(destination));
        let first_delete = position(&GatewayCall::Delete(expected[0].clone()));
        assert!(broken < removed && removed < first_delete);
    }

    #[tokio::test]
    async fn test_already_broken_skips_break() {
        let gateway = InMemoryGateway::with_profile("sub", ConvergenceProfile::immediate());
        let sleeper = InstantSleeper::new();
        let config = config();
        replicated(&gateway, &sleeper, &config).await;
        let destination = VolumeKey::new("rg", "B", "P2", "V2");
        gateway.break_replication(&destination).await.unwrap();
        gateway.clear_calls();

        CleanupOrchestrator::new(&gateway, &sleeper, &config)
            .run(&topology())
            .await
            .unwrap();

        let calls = gateway.calls();
        assert!(!calls.iter().any(|c| matches!(c, GatewayCall::BreakReplication(_))));
        assert!(calls.contains(&GatewayCall::DeleteReplication(destination)));
    }

    #[tokio::test]
    async fn test_absent_resources_are_skipped() {
        let gateway = InMemoryGateway::with_profile("sub", ConvergenceProfile::immediate());
        let sleeper = InstantSleeper::new();
        let config = config();

        let report = CleanupOrchestrator::new(&gateway, &sleeper, &config)
            .run(&topology())
            .await
            .unwrap();

        assert!(gateway.delete_calls().is_empty());
        assert!(
            !gateway
                .calls()
                .iter()
                .any(|c| matches!(c, GatewayCall::DeleteReplication(_)))
        );
        assert_eq!(report.steps_of(StepKind::AlreadyAbsent).count(), 7);
    }

    #[tokio::test]
    async fn test_absence_timeout_is_soft() {
        let gateway = InMemoryGateway::with_profile(
            "sub",
            ConvergenceProfile {
                absence_polls: 5,
                ..ConvergenceProfile::immediate()
            },
        );
        let sleeper = InstantSleeper::new();
        let config = OrchestratorConfig {
            absence: WaitPolicy::new(Duration::from_secs(1), 2),
            ..config()
        };
        replicated(&gateway, &sleeper, &config).await;

        let report = CleanupOrchestrator::new(&gateway, &sleeper, &config)
            .run(&topology())
            .await
            .unwrap();

        // every delete was still issued despite each wait timing out
        assert_eq!(gateway.delete_calls().len(), 6);
        assert_eq!(report.warnings.len(), 7);
        assert_eq!(report.steps_of(StepKind::Deleted).count(), 6);
    }

    #[tokio::test]
    async fn test_break_timeout_aborts() {
        let gateway = InMemoryGateway::with_profile(
            "sub",
            ConvergenceProfile {
                break_polls: 50,
                ..ConvergenceProfile::immediate()
            },
        );
        let sleeper = InstantSleeper::new();
        let config = config();
        replicated(&gateway, &sleeper, &config).await;

        let err = CleanupOrchestrator::new(&gateway, &sleeper, &config)
            .run(&topology())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            OrchestratorError::ReplicationTimeout {
                expected: MirrorState::Broken,
                ..
            }
        ));
        assert!(gateway.delete_calls().is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_destination_has_no_replication() {
        let gateway = InMemoryGateway::with_profile("sub", ConvergenceProfile::immediate());
        let sleeper = InstantSleeper::new();
        let config = config();
        Provisioner::new(&gateway, &sleeper, &config)
            .run(&topology())
            .await
            .unwrap();

        let report = CleanupOrchestrator::new(&gateway, &sleeper, &config)
            .run(&topology())
            .await
            .unwrap();

        assert_eq!(report.steps_of(StepKind::NoReplication).count(), 1);
        assert_eq!(gateway.resource_count(), 0);
    }
}
