//! End-to-end run: provision, replicate, optionally clean up

use crate::cleanup::CleanupOrchestrator;
use crate::clock::Sleeper;
use crate::config::OrchestratorConfig;
use crate::error::Result;
use crate::provisioner::Provisioner;
use crate::replication::ReplicationOrchestrator;
use crate::report::RunReport;
use crossrep_cloud::StorageGateway;
use crossrep_core::ProjectConfig;
use std::time::Instant;

pub struct Lifecycle<'a> {
    gateway: &'a dyn StorageGateway,
    sleeper: &'a dyn Sleeper,
    config: &'a OrchestratorConfig,
}

impl<'a> Lifecycle<'a> {
    pub fn new(
        gateway: &'a dyn StorageGateway,
        sleeper: &'a dyn Sleeper,
        config: &'a OrchestratorConfig,
    ) -> Self {
        Self {
            gateway,
            sleeper,
            config,
        }
    }

    /// Provision the topology and establish every replication
    pub async fn up(&self, project: &ProjectConfig) -> Result<RunReport> {
        let started = Instant::now();
        let mut report = Provisioner::new(self.gateway, self.sleeper, self.config)
            .run(project)
            .await?;
        let replication = ReplicationOrchestrator::new(self.gateway, self.sleeper, self.config)
            .run(project)
            .await?;
        report.absorb(replication);
        report.finish(started);
        Ok(report)
    }

    /// Remove every replication and resource of the topology
    pub async fn down(&self, project: &ProjectConfig) -> Result<RunReport> {
        CleanupOrchestrator::new(self.gateway, self.sleeper, self.config)
            .run(project)
            .await
    }

    /// `up`, followed by `down` when `cleanup` is set
    pub async fn run(&self, project: &ProjectConfig, cleanup: bool) -> Result<RunReport> {
        let started = Instant::now();
        let mut report = self.up(project).await?;
        if cleanup {
            tracing::info!("Cleaning up");
            report.absorb(self.down(project).await?);
        } else {
            tracing::info!("Cleanup disabled, leaving resources in place");
        }
        report.finish(started);
        Ok(report)
    }
}
