//! Per-step retry policies.
//!
//! Only outcomes the gateway classifies as transient consume attempts from
//! these policies; business rejections and simulated faults bypass the
//! table entirely.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::step::Step;

/// How the backoff delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// Same delay before every retry.
    Fixed,
    /// Delay doubles after each failed attempt, capped at the maximum.
    Exponential,
}

/// Retry configuration for one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts allowed, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Ceiling on the backoff delay.
    pub max_backoff: Duration,
    /// Backoff growth mode.
    pub backoff: Backoff,
}

impl RetryPolicy {
    /// Creates a policy with exponential backoff.
    pub fn exponential(max_attempts: u32, initial: Duration, max: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff: initial,
            max_backoff: max,
            backoff: Backoff::Exponential,
        }
    }

    /// Creates a policy with a fixed delay between attempts.
    pub fn fixed(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff: delay,
            max_backoff: delay,
            backoff: Backoff::Fixed,
        }
    }

    /// Creates a policy that retries without any delay. Intended for tests.
    pub fn no_backoff(max_attempts: u32) -> Self {
        Self::fixed(max_attempts, Duration::ZERO)
    }

    /// Returns the delay to wait after the given failed attempt (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.initial_backoff,
            Backoff::Exponential => {
                let exp = attempt.saturating_sub(1).min(31);
                let delay = self.initial_backoff.saturating_mul(1u32 << exp);
                delay.min(self.max_backoff)
            }
        }
    }
}

/// Per-step retry policies, consulted by the orchestrator when a step fails
/// with a retryable outcome.
#[derive(Debug, Clone)]
pub struct RetryPolicyTable {
    policies: BTreeMap<Step, RetryPolicy>,
}

impl RetryPolicyTable {
    /// Returns the default deployment policies:
    ///
    /// | Step         | Max attempts | Backoff             |
    /// |--------------|--------------|---------------------|
    /// | PAYMENT      | 3            | exponential 1s..10s |
    /// | INVENTORY    | 3            | fixed 1s            |
    /// | SHIPPING     | 3            | fixed 1s            |
    /// | NOTIFICATION | 2            | fixed 1s            |
    pub fn standard() -> Self {
        let mut policies = BTreeMap::new();
        policies.insert(
            Step::Payment,
            RetryPolicy::exponential(3, Duration::from_secs(1), Duration::from_secs(10)),
        );
        policies.insert(
            Step::Inventory,
            RetryPolicy::fixed(3, Duration::from_secs(1)),
        );
        policies.insert(Step::Shipping, RetryPolicy::fixed(3, Duration::from_secs(1)));
        policies.insert(
            Step::Notification,
            RetryPolicy::fixed(2, Duration::from_secs(1)),
        );
        Self { policies }
    }

    /// Returns the standard attempt limits with all backoff removed.
    /// Intended for tests.
    pub fn immediate() -> Self {
        let mut table = Self::standard();
        for policy in table.policies.values_mut() {
            policy.initial_backoff = Duration::ZERO;
            policy.max_backoff = Duration::ZERO;
        }
        table
    }

    /// Overrides the policy for one step.
    pub fn with_policy(mut self, step: Step, policy: RetryPolicy) -> Self {
        self.policies.insert(step, policy);
        self
    }

    /// Returns the policy for a step.
    pub fn policy(&self, step: Step) -> &RetryPolicy {
        // Constructors populate every step; with_policy only replaces.
        &self.policies[&step]
    }
}

impl Default for RetryPolicyTable {
    fn default() -> Self {
        Self::standard()
    }
}
