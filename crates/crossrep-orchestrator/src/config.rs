//! Orchestrator timing configuration

use crossrep_core::PollingSettings;
use std::time::Duration;

/// Poll interval and evaluation ceiling of one convergence wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    pub interval: Duration,
    /// Maximum number of evaluations; zero is treated as one
    pub max_retries: u32,
}

impl WaitPolicy {
    pub const fn new(interval: Duration, max_retries: u32) -> Self {
        Self {
            interval,
            max_retries,
        }
    }

    /// Number of times the predicate is evaluated at most
    pub fn evaluations(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Longest time a wait under this policy can take
    pub fn ceiling(&self) -> Duration {
        self.interval * self.evaluations().saturating_sub(1)
    }
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), 60)
    }
}

/// Wait policies of every orchestration phase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Retries of a single call failing transiently
    pub request: WaitPolicy,
    /// Waiting for a created resource to become visible
    pub presence: WaitPolicy,
    /// Waiting for a deleted resource or replication to disappear
    pub absence: WaitPolicy,
    /// Waiting for a mirror state
    pub replication: WaitPolicy,
    /// Waiting for both volumes of a pair to report Succeeded
    pub settle: WaitPolicy,
    pub post_authorize_delay: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            request: WaitPolicy::new(Duration::from_secs(10), 6),
            presence: WaitPolicy::default(),
            absence: WaitPolicy::default(),
            replication: WaitPolicy::default(),
            settle: WaitPolicy::default(),
            post_authorize_delay: Duration::from_secs(30),
        }
    }
}

impl OrchestratorConfig {
    /// Defaults with the overrides of the `general.polling` section applied
    pub fn from_polling(polling: Option<&PollingSettings>) -> Self {
        let mut config = Self::default();
        let Some(polling) = polling else {
            return config;
        };

        if let Some(ms) = polling.interval_ms {
            let interval = Duration::from_millis(ms);
            config.presence.interval = interval;
            config.absence.interval = interval;
            config.replication.interval = interval;
        }
        if let Some(retries) = polling.max_retries {
            config.presence.max_retries = retries;
            config.absence.max_retries = retries;
            config.replication.max_retries = retries;
        }
        if let Some(ms) = polling.settle_interval_ms {
            config.settle.interval = Duration::from_millis(ms);
        }
        if let Some(retries) = polling.settle_retries {
            config.settle.max_retries = retries;
        }
        if let Some(ms) = polling.post_authorize_delay_ms {
            config.post_authorize_delay = Duration::from_millis(ms);
        }
        config
    }

    /// Every phase polls with the same policy and no post-authorize delay
    pub fn uniform(policy: WaitPolicy) -> Self {
        Self {
            request: policy,
            presence: policy,
            absence: policy,
            replication: policy,
            settle: policy,
            post_authorize_delay: Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.presence, WaitPolicy::new(Duration::from_secs(10), 60));
        assert_eq!(config.post_authorize_delay, Duration::from_secs(30));
        assert_eq!(config.presence.ceiling(), Duration::from_secs(590));
    }

    #[test]
    fn test_zero_retries_evaluates_once() {
        let policy = WaitPolicy::new(Duration::from_secs(5), 0);
        assert_eq!(policy.evaluations(), 1);
        assert_eq!(policy.ceiling(), Duration::ZERO);
    }

    #[test]
    fn test_polling_overrides() {
        let polling = PollingSettings {
            interval_ms: Some(500),
            max_retries: Some(4),
            settle_retries: Some(2),
            post_authorize_delay_ms: Some(0),
            ..Default::default()
        };
        let config = OrchestratorConfig::from_polling(Some(&polling));
        assert_eq!(config.absence, WaitPolicy::new(Duration::from_millis(500), 4));
        assert_eq!(config.replication.max_retries, 4);
        assert_eq!(config.settle, WaitPolicy::new(Duration::from_secs(10), 2));
        assert_eq!(config.post_authorize_delay, Duration::ZERO);
        assert_eq!(config.request, OrchestratorConfig::default().request);

        assert_eq!(
            OrchestratorConfig::from_polling(None),
            OrchestratorConfig::default()
        );
    }
}
