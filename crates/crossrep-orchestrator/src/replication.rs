//! Replication orchestrator
//!
//! For each destination volume, in listed order:
//!
//! 1. authorize replication on the source, naming the destination id
//! 2. wait for both volumes to report provisioning state Succeeded
//! 3. pause for the post-authorize delay
//! 4. wait for the destination to report `Mirrored`
//!
//! Authorizing an already-authorized pair is not an error, so the phase can
//! be re-run against a topology that is already mirrored.

use crate::clock::Sleeper;
use crate::config::OrchestratorConfig;
use crate::error::{Operation, OrchestratorError, Result};
use crate::report::{RunReport, StepKind};
use crate::waiter::Waiter;
use crossrep_cloud::{GatewayError, MirrorState, ResourceKey, StorageGateway, VolumeKey};
use crossrep_core::{ProjectConfig, SourceVolumeRef, VolumeEntry};
use std::time::Instant;

pub struct ReplicationOrchestrator<'a> {
    waiter: Waiter<'a>,
    config: &'a OrchestratorConfig,
}

impl<'a> ReplicationOrchestrator<'a> {
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

    /// Establish replication for every destination volume
    pub async fn run(&self, project: &ProjectConfig) -> Result<RunReport> {
        let started = Instant::now();
        let mut report = RunReport::new();

        for entry in project.destinations() {
            if let Some(source) = &entry.volume.source_volume {
                self.replicate(entry, source, &mut report).await?;
            }
        }

        report.finish(started);
        Ok(report)
    }

    async fn replicate(
        &self,
        entry: VolumeEntry<'_>,
        source: &SourceVolumeRef,
        report: &mut RunReport,
    ) -> Result<()> {
        let gateway = self.waiter.gateway();
        let destination = VolumeKey::of(entry.account, entry.pool, entry.volume);
        let destination_key: ResourceKey = destination.clone().into();
        let source = VolumeKey::from(source);
        let source_key: ResourceKey = source.clone().into();

        let destination_id = self
            .waiter
            .lookup(&destination_key, &self.config.request)
            .await?
            .ok_or_else(|| OrchestratorError::DestinationVolumeNotFound {
                destination: destination_key.clone(),
            })?
            .id;

        tracing::info!("Authorizing replication {} -> {}", source_key, destination_key);
        let (source_ref, destination_ref) = (&source, &destination_id);
        let newly_authorized = self
            .waiter
            .call(
                Operation::Authorize,
                &destination_key,
                &self.config.request,
                move || async move {
                    match gateway
                        .authorize_replication(source_ref, destination_ref)
                        .await
                    {
                        Ok(()) => Ok(true),
                        Err(GatewayError::ReplicationAlreadyAuthorized(_)) => Ok(false),
                        Err(e) => Err(e),
                    }
                },
            )
            .await?;

        if newly_authorized {
            report.record(StepKind::Authorized, destination_key.clone(), Some(destination_id.clone()));
        } else {
            tracing::info!("Replication of {} is already authorized", destination_key);
            report.record(
                StepKind::AlreadyAuthorized,
                destination_key.clone(),
                Some(destination_id.clone()),
            );
        }

        self.waiter.provisioned(&source_key, &self.config.settle).await?;
        self.waiter
            .provisioned(&destination_key, &self.config.settle)
            .await?;

        if !self.config.post_authorize_delay.is_zero() {
            tracing::debug!(
                "Pausing {:?} before polling mirror state",
                self.config.post_authorize_delay
            );
            self.waiter
                .sleeper()
                .sleep(self.config.post_authorize_delay)
                .await;
        }

        let status = self
            .waiter
            .mirror_state(&destination, MirrorState::Mirrored, &self.config.replication)
            .await?;
        tracing::info!(
            "Replication {} -> {} is {}",
            source_key,
            destination_key,
            status.mirror_state
        );
        report.record(StepKind::Mirrored, destination_key, Some(destination_id));
        Ok(())
    }
}
