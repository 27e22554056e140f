//! Embedder-facing configuration, analogous to the teacher crate's
//! `RuntimeBuilder`/`EngineBuilder` construction pattern.

use crate::model::RetryPolicy;
use std::time::Duration;

/// Tunables the embedder may override; every field has a spec-mandated
/// default.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Default retry policy applied to tasks that don't carry their own.
    pub default_retry_policy: RetryPolicy,
    /// Upper bound on how long a worker will sleep in the Waiting state
    /// before re-polling, even if nothing wakes it. Guards against a missed
    /// wake-up notification stranding a worker forever.
    pub max_poll_wait: Duration,
    /// Retention window used by periodic cleanup, in days.
    pub default_retention_days: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            default_retry_policy: RetryPolicy::default(),
            max_poll_wait: Duration::from_secs(300),
            default_retention_days: 30,
        }
    }
}

impl SchedulerConfig {
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.default_retry_policy = policy;
        self
    }

    pub fn with_max_poll_wait(mut self, wait: Duration) -> Self {
        self.max_poll_wait = wait;
        self
    }

    pub fn with_retention_days(mut self, days: i64) -> Self {
        self.default_retention_days = days;
        self
    }
}
