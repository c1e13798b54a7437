//! Checkpoint record payloads for the saga.
//!
//! Every orchestration decision is captured as one of these events and
//! appended to the journal before it becomes externally visible. Replaying
//! the sequence through [`crate::SagaInstance::apply`] re-derives the saga.

use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId};
use serde::{Deserialize, Serialize};

use crate::error::FailureKind;
use crate::step::Step;

/// Events that can occur during saga execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum SagaEvent {
    /// Saga execution started.
    SagaStarted(SagaStartedData),

    /// An attempt of a forward step started.
    StepStarted(StepAttemptData),

    /// A forward step completed successfully.
    StepCompleted(StepCompletedData),

    /// A retryable failure occurred and a retry was scheduled.
    RetryScheduled(RetryScheduledData),

    /// A forward step failed non-retryably; forward execution stops here.
    StepFailed(StepFailedData),

    /// Compensation started after a step failure.
    CompensationStarted(CompensationStartedData),

    /// A compensating action completed successfully.
    CompensationStepCompleted(CompensationStepData),

    /// A compensating action failed (recorded, compensation continues).
    CompensationStepFailed(CompensationStepFailedData),

    /// The best-effort cancellation notice was sent.
    CancellationNoticeSent(CancellationNoticeData),

    /// The cancellation notice could not be sent (recorded only).
    CancellationNoticeFailed(CancellationNoticeFailedData),

    /// Saga completed successfully.
    SagaCompleted(SagaCompletedData),

    /// Saga failed after compensation.
    SagaFailed(SagaFailedData),
}

impl SagaEvent {
    /// Returns the record type name used in the journal.
    pub fn record_type(&self) -> &'static str {
        match self {
            SagaEvent::SagaStarted(_) => "SagaStarted",
            SagaEvent::StepStarted(_) => "StepStarted",
            SagaEvent::StepCompleted(_) => "StepCompleted",
            SagaEvent::RetryScheduled(_) => "RetryScheduled",
            SagaEvent::StepFailed(_) => "StepFailed",
            SagaEvent::CompensationStarted(_) => "CompensationStarted",
            SagaEvent::CompensationStepCompleted(_) => "CompensationStepCompleted",
            SagaEvent::CompensationStepFailed(_) => "CompensationStepFailed",
            SagaEvent::CancellationNoticeSent(_) => "CancellationNoticeSent",
            SagaEvent::CancellationNoticeFailed(_) => "CancellationNoticeFailed",
            SagaEvent::SagaCompleted(_) => "SagaCompleted",
            SagaEvent::SagaFailed(_) => "SagaFailed",
        }
    }
}

/// Data for SagaStarted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaStartedData {
    /// The order being fulfilled.
    pub order_id: OrderId,
    /// The customer who placed it.
    pub customer_id: CustomerId,
    /// When the saga started.
    pub started_at: DateTime<Utc>,
}

/// Data for StepStarted events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepAttemptData {
    /// The step being attempted.
    pub step: Step,
    /// 1-based attempt number.
    pub attempt: u32,
}

/// Data for StepCompleted events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepCompletedData {
    /// The step that completed.
    pub step: Step,
    /// Reference token returned by the step's forward action.
    pub artifact: Option<String>,
}

/// Data for RetryScheduled events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryScheduledData {
    /// The step whose attempt failed.
    pub step: Step,
    /// The attempt that failed.
    pub attempt: u32,
    /// Backoff delay before the next attempt, in milliseconds.
    pub delay_ms: u64,
    /// The transient error that triggered the retry.
    pub error: String,
}

/// Data for StepFailed events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepFailedData {
    /// The step that failed.
    pub step: Step,
    /// Failure classification.
    pub kind: FailureKind,
    /// Error message describing the failure.
    pub error: String,
}

/// Data for CompensationStarted events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensationStartedData {
    /// The step whose failure triggered compensation.
    pub from_step: Step,
}

/// Data for CompensationStepCompleted events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensationStepData {
    /// The step whose artifact was compensated.
    pub step: Step,
}

/// Data for CompensationStepFailed events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompensationStepFailedData {
    /// The step whose compensating action failed.
    pub step: Step,
    /// Error message from the compensating action.
    pub error: String,
}

/// Data for CancellationNoticeSent events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationNoticeData {
    /// When the notice was sent.
    pub sent_at: DateTime<Utc>,
}

/// Data for CancellationNoticeFailed events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CancellationNoticeFailedData {
    /// Error message from the notification provider.
    pub error: String,
}

/// Data for SagaCompleted events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaCompletedData {
    /// When the saga completed.
    pub completed_at: DateTime<Utc>,
}

/// Data for SagaFailed events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaFailedData {
    /// Classification of the failure that stopped forward progress.
    pub kind: FailureKind,
    /// Reason for failure.
    pub reason: String,
    /// When the saga failed.
    pub failed_at: DateTime<Utc>,
}

// Convenience constructors
impl SagaEvent {
    /// Creates a SagaStarted event.
    pub fn saga_started(order_id: OrderId, customer_id: CustomerId) -> Self {
        SagaEvent::SagaStarted(SagaStartedData {
            order_id,
            customer_id,
            started_at: Utc::now(),
        })
    }

    /// Creates a StepStarted event.
    pub fn step_started(step: Step, attempt: u32) -> Self {
        SagaEvent::StepStarted(StepAttemptData { step, attempt })
    }

    /// Creates a StepCompleted event.
    pub fn step_completed(step: Step, artifact: Option<String>) -> Self {
        SagaEvent::StepCompleted(StepCompletedData { step, artifact })
    }

    /// Creates a RetryScheduled event.
    pub fn retry_scheduled(step: Step, attempt: u32, delay_ms: u64, error: impl Into<String>) -> Self {
        SagaEvent::RetryScheduled(RetryScheduledData {
            step,
            attempt,
            delay_ms,
            error: error.into(),
        })
    }

    /// Creates a StepFailed event.
    pub fn step_failed(step: Step, kind: FailureKind, error: impl Into<String>) -> Self {
        SagaEvent::StepFailed(StepFailedData {
            step,
            kind,
            error: error.into(),
        })
    }

    /// Creates a CompensationStarted event.
    pub fn compensation_started(from_step: Step) -> Self {
        SagaEvent::CompensationStarted(CompensationStartedData { from_step })
    }

    /// Creates a CompensationStepCompleted event.
    pub fn compensation_step_completed(step: Step) -> Self {
        SagaEvent::CompensationStepCompleted(CompensationStepData { step })
    }

    /// Creates a CompensationStepFailed event.
    pub fn compensation_step_failed(step: Step, error: impl Into<String>) -> Self {
        SagaEvent::CompensationStepFailed(CompensationStepFailedData {
            step,
            error: error.into(),
        })
    }

    /// Creates a CancellationNoticeSent event.
    pub fn cancellation_notice_sent() -> Self {
        SagaEvent::CancellationNoticeSent(CancellationNoticeData { sent_at: Utc::now() })
    }

    /// Creates a CancellationNoticeFailed event.
    pub fn cancellation_notice_failed(error: impl Into<String>) -> Self {
        SagaEvent::CancellationNoticeFailed(CancellationNoticeFailedData {
            error: error.into(),
        })
    }

    /// Creates a SagaCompleted event.
    pub fn saga_completed() -> Self {
        SagaEvent::SagaCompleted(SagaCompletedData {
            completed_at: Utc::now(),
        })
    }

    /// Creates a SagaFailed event.
    pub fn saga_failed(kind: FailureKind, reason: impl Into<String>) -> Self {
        SagaEvent::SagaFailed(SagaFailedData {
            kind,
            reason: reason.into(),
            failed_at: Utc::now(),
        })
    }
}
