//! Saga error types and the step failure taxonomy.

use common::OrderId;
use journal::JournalError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::step::Step;

/// Classification of a step failure.
///
/// Only [`FailureKind::Transient`] consumes retry attempts. Everything else
/// escalates immediately: business rejections and simulated faults will not
/// change outcome on retry, and an exhausted transient failure is treated
/// identically to a non-retryable one from that point on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureKind {
    /// Network-style failure; the call may succeed on retry.
    Transient,
    /// Business-rule rejection from the provider.
    Rejected,
    /// Fault injected through the signal surface.
    Simulated,
    /// Transient failure that ran out of retry attempts.
    RetryExhausted,
}

impl FailureKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Transient => "TRANSIENT",
            FailureKind::Rejected => "REJECTED",
            FailureKind::Simulated => "SIMULATED",
            FailureKind::RetryExhausted => "RETRY_EXHAUSTED",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A classified failure of one step action, produced by the gateway.
#[derive(Debug, Clone, Error)]
#[error("step {step} failed ({kind}): {message}")]
pub struct StepError {
    /// The step whose action failed.
    pub step: Step,
    /// Failure classification.
    pub kind: FailureKind,
    /// Message from the underlying provider.
    pub message: String,
}

impl StepError {
    /// Creates a classified step error.
    pub fn new(step: Step, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            step,
            kind,
            message: message.into(),
        }
    }

    /// Creates the synthetic error for an injected fault.
    pub fn simulated(step: Step) -> Self {
        Self::new(
            step,
            FailureKind::Simulated,
            format!("simulated failure: {step}"),
        )
    }

    /// Returns true if this failure consumes a retry attempt.
    pub fn is_retryable(&self) -> bool {
        self.kind == FailureKind::Transient
    }
}

/// The authoritative reason a saga failed.
///
/// Captured exactly once, at the moment forward progress stopped; never
/// overwritten by a later compensation error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    /// Failure classification at the point forward execution was abandoned.
    pub kind: FailureKind,
    /// Human-readable reason.
    pub message: String,
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.message, self.kind)
    }
}

/// Errors surfaced by the orchestration layer itself.
///
/// Step failures are not in here: they are absorbed into the saga's terminal
/// state and reported through `OrderResult`, not as an `Err`.
#[derive(Debug, Error)]
pub enum SagaError {
    /// The order request failed validation.
    #[error("invalid order request: {0}")]
    InvalidRequest(String),

    /// An unknown step name was supplied to the signal surface.
    #[error("unknown saga step: {0}")]
    UnknownStep(String),

    /// No saga is registered for the given order.
    #[error("order not found: {0}")]
    OrderNotFound(OrderId),

    /// The saga for this order has already been started.
    #[error("saga for order {0} has already been started")]
    AlreadyStarted(OrderId),

    /// Checkpoint log error.
    #[error("journal error: {0}")]
    Journal(#[from] JournalError),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
