//! Convergence waiter
//!
//! The remote control plane converges asynchronously, so every mutation is
//! followed by polling a predicate until it holds or the policy's evaluation
//! ceiling is reached. The predicate is evaluated immediately; the waiter
//! sleeps only between evaluations.
//!
//! Transient gateway errors count as "not yet". Any other error aborts the
//! wait.

use crate::clock::Sleeper;
use crate::config::WaitPolicy;
use crate::error::{Operation, OrchestratorError, Result};
use crossrep_cloud::{
    GatewayError, MirrorState, ReplicationStatus, Resource, ResourceKey, StorageGateway, VolumeKey,
};
use std::future::Future;

/// One evaluation of a wait predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Probe<T> {
    Converged(T),
    Pending,
    /// The target converged to a state that will never satisfy the predicate
    Failed(String),
}

/// Result of a wait that did not abort
#[derive(Debug, Clone, PartialEq)]
pub enum WaitOutcome<T> {
    Converged { value: T, attempts: u32 },
    TimedOut { attempts: u32 },
}

impl<T> WaitOutcome<T> {
    pub fn attempts(&self) -> u32 {
        match self {
            WaitOutcome::Converged { attempts, .. } | WaitOutcome::TimedOut { attempts } => *attempts,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, WaitOutcome::Converged { .. })
    }
}

/// Why a wait aborted before its ceiling
#[derive(Debug, thiserror::Error)]
pub enum WaitError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error("{0}")]
    Failed(String),
}

/// Evaluate `probe` until it converges or `policy` is exhausted
///
/// Converging on evaluation N costs N-1 sleeps of `policy.interval`; a
/// timeout costs `policy.evaluations()` evaluations and one sleep less.
pub async fn wait_until<T, F, Fut>(
    sleeper: &dyn Sleeper,
    label: &str,
    policy: &WaitPolicy,
    mut probe: F,
) -> std::result::Result<WaitOutcome<T>, WaitError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = crossrep_cloud::Result<Probe<T>>>,
{
    let evaluations = policy.evaluations();

    for attempt in 1..=evaluations {
        match probe().await {
            Ok(Probe::Converged(value)) => {
                tracing::debug!("{}: converged after {} attempt(s)", label, attempt);
                return Ok(WaitOutcome::Converged { value, attempts: attempt });
            }
            Ok(Probe::Pending) => {
                tracing::debug!("{}: not yet ({}/{})", label, attempt, evaluations);
            }
            Ok(Probe::Failed(reason)) => return Err(WaitError::Failed(reason)),
            Err(e) if e.is_transient() => {
                tracing::warn!("{}: transient error ({}/{}): {}", label, attempt, evaluations, e);
            }
            Err(e) => return Err(e.into()),
        }

        if attempt < evaluations {
            sleeper.sleep(policy.interval).await;
        }
    }

    Ok(WaitOutcome::TimedOut {
        attempts: evaluations,
    })
}

/// The canonical waits of the lifecycle, bound to one gateway
#[derive(Clone, Copy)]
pub struct Waiter<'a> {
    gateway: &'a dyn StorageGateway,
    sleeper: &'a dyn Sleeper,
}

impl<'a> Waiter<'a> {
    pub fn new(gateway: &'a dyn StorageGateway, sleeper: &'a dyn Sleeper) -> Self {
        Self { gateway, sleeper }
    }

    pub fn gateway(&self) -> &'a dyn StorageGateway {
        self.gateway
    }

    pub fn sleeper(&self) -> &'a dyn Sleeper {
        self.sleeper
    }

    /// Issue a single gateway call, retrying it while it fails transiently
    pub async fn call<T, F, Fut>(
        &self,
        operation: Operation,
        resource: &ResourceKey,
        policy: &WaitPolicy,
        mut call: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = crossrep_cloud::Result<T>>,
    {
        let label = format!("{} {}", operation, resource);
        let outcome = wait_until(self.sleeper, &label, policy, move || {
            let pending = call();
            async move { pending.await.map(Probe::Converged) }
        })
        .await;

        match outcome {
            Ok(WaitOutcome::Converged { value, .. }) => Ok(value),
            Ok(WaitOutcome::TimedOut { attempts }) => Err(OrchestratorError::Unavailable {
                operation,
                resource: resource.clone(),
                attempts,
            }),
            Err(e) => Err(aborted(operation, resource, e)),
        }
    }

    /// Current state of a resource, `None` when it does not exist
    pub async fn lookup(&self, key: &ResourceKey, policy: &WaitPolicy) -> Result<Option<Resource>> {
        let gateway = self.gateway;
        self.call(Operation::Get, key, policy, move || gateway.get(key))
            .await
    }

    /// Wait until a created resource is visible and done provisioning; fatal on timeout
    ///
    /// A resource that becomes visible while still `Creating` keeps being
    /// polled, so a later `Failed` is reported instead of being built upon.
    pub async fn present(&self, key: &ResourceKey, policy: &WaitPolicy) -> Result<Resource> {
        let gateway = self.gateway;
        let label = format!("waiting for {}", key);
        let outcome = wait_until(self.sleeper, &label, policy, move || async move {
            let probe = match gateway.get(key).await? {
                Some(resource) if resource.provisioning_state.is_succeeded() => {
                    Probe::Converged(resource)
                }
                Some(resource) if resource.provisioning_state.is_failed() => Probe::Failed(
                    format!("provisioning state {}", resource.provisioning_state),
                ),
                Some(resource) => {
                    tracing::debug!("{} is visible, state {}", key, resource.provisioning_state);
                    Probe::Pending
                }
                None => Probe::Pending,
            };
            Ok::<_, GatewayError>(probe)
        })
        .await
        .map_err(|e| aborted(Operation::Get, key, e))?;

        match outcome {
            WaitOutcome::Converged { value, .. } => Ok(value),
            WaitOutcome::TimedOut { attempts } => Err(OrchestratorError::PresenceTimeout {
                resource: key.clone(),
                attempts,
            }),
        }
    }

    /// Wait until a resource reports provisioning state Succeeded
    pub async fn provisioned(&self, key: &ResourceKey, policy: &WaitPolicy) -> Result<Resource> {
        let gateway = self.gateway;
        let label = format!("waiting for {} to settle", key);
        let outcome = wait_until(self.sleeper, &label, policy, move || async move {
            let probe = match gateway.get(key).await? {
                Some(resource) if resource.provisioning_state.is_succeeded() => {
                    Probe::Converged(resource)
                }
                Some(resource) if resource.provisioning_state.is_failed() => Probe::Failed(
                    format!("provisioning state {}", resource.provisioning_state),
                ),
                _ => Probe::Pending,
            };
            Ok::<_, GatewayError>(probe)
        })
        .await
        .map_err(|e| aborted(Operation::Get, key, e))?;

        match outcome {
            WaitOutcome::Converged { value, .. } => Ok(value),
            WaitOutcome::TimedOut { attempts } => Err(OrchestratorError::SettleTimeout {
                resource: key.clone(),
                attempts,
            }),
        }
    }

    /// Wait until a deleted resource is gone
    ///
    /// A timeout is not an error here; callers decide how to report it.
    pub async fn absent(&self, key: &ResourceKey, policy: &WaitPolicy) -> Result<WaitOutcome<()>> {
        let gateway = self.gateway;
        let label = format!("waiting for {} to disappear", key);
        wait_until(self.sleeper, &label, policy, move || async move {
            let probe = match gateway.get(key).await? {
                None => Probe::Converged(()),
                Some(_) => Probe::Pending,
            };
            Ok::<_, GatewayError>(probe)
        })
        .await
        .map_err(|e| aborted(Operation::Get, key, e))
    }

    /// Wait until the replication of `volume` reports `expected`; fatal on timeout
    pub async fn mirror_state(
        &self,
        volume: &VolumeKey,
        expected: MirrorState,
        policy: &WaitPolicy,
    ) -> Result<ReplicationStatus> {
        let gateway = self.gateway;
        let label = format!("waiting for {} to report {}", volume, expected);
        let outcome = wait_until(self.sleeper, &label, policy, move || async move {
            let probe = match gateway.replication_status(volume).await? {
                Some(status) if status.mirror_state == expected => Probe::Converged(status),
                _ => Probe::Pending,
            };
            Ok::<_, GatewayError>(probe)
        })
        .await
        .map_err(|e| aborted(Operation::ReplicationStatus, &volume.clone().into(), e))?;

        match outcome {
            WaitOutcome::Converged { value, .. } => Ok(value),
            WaitOutcome::TimedOut { attempts } => Err(OrchestratorError::ReplicationTimeout {
                resource: volume.clone().into(),
                expected,
                attempts,
            }),
        }
    }

    /// Wait until no replication exists for `volume`; soft like [`Waiter::absent`]
    pub async fn replication_removed(
        &self,
        volume: &VolumeKey,
        policy: &WaitPolicy,
    ) -> Result<WaitOutcome<()>> {
        let gateway = self.gateway;
        let label = format!("waiting for replication of {} to disappear", volume);
        wait_until(self.sleeper, &label, policy, move || async move {
            let probe = match gateway.replication_status(volume).await? {
                None => Probe::Converged(()),
                Some(_) => Probe::Pending,
            };
            Ok::<_, GatewayError>(probe)
        })
        .await
        .map_err(|e| aborted(Operation::ReplicationStatus, &volume.clone().into(), e))
    }
}

fn aborted(operation: Operation, resource: &ResourceKey, error: WaitError) -> OrchestratorError {
    match error {
        WaitError::Gateway(source) => OrchestratorError::Gateway {
            operation,
            resource: resource.clone(),
            source,
        },
        WaitError::Failed(reason) => OrchestratorError::ProvisioningFailed {
            resource: resource.clone(),
            reason,
        },
    }
}
