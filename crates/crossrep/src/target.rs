//! Gateway selection: Azure, or the in-memory control plane with `--simulate`

use crossrep_cloud::{InMemoryGateway, StorageGateway};
use crossrep_cloud_azure::{AzureConfig, AzureNetAppGateway};
use crossrep_core::ProjectConfig;
use crossrep_orchestrator::{InstantSleeper, Sleeper, TokioSleeper};

pub enum Target {
    Simulated {
        gateway: InMemoryGateway,
        sleeper: InstantSleeper,
    },
    Azure {
        gateway: AzureNetAppGateway,
        sleeper: TokioSleeper,
    },
}

impl Target {
    pub fn build(project: &ProjectConfig, simulate: bool) -> anyhow::Result<Self> {
        let subscription = &project.general.subscription_id;
        if simulate {
            tracing::info!("Simulating against an in-memory control plane");
            return Ok(Target::Simulated {
                gateway: InMemoryGateway::new(subscription),
                sleeper: InstantSleeper::new(),
            });
        }

        let config = AzureConfig::from_env(subscription)?;
        Ok(Target::Azure {
            gateway: AzureNetAppGateway::new(config)?,
            sleeper: TokioSleeper,
        })
    }

    pub fn gateway(&self) -> &dyn StorageGateway {
        match self {
            Target::Simulated { gateway, .. } => gateway,
            Target::Azure { gateway, .. } => gateway,
        }
    }

    pub fn sleeper(&self) -> &dyn Sleeper {
        match self {
            Target::Simulated { sleeper, .. } => sleeper,
            Target::Azure { sleeper, .. } => sleeper,
        }
    }
}
