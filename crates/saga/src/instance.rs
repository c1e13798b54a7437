//! The saga state record and its decision function.
//!
//! [`SagaInstance`] is pure data: it is rebuilt by replaying checkpoint
//! events through [`SagaInstance::apply`], and [`SagaInstance::decide`]
//! derives the next orchestration action from the record alone. The
//! orchestrator performs the side effects; nothing here touches the
//! outside world, so any storage/replay strategy can drive it.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId};
use serde::{Deserialize, Serialize};

use crate::error::FailureReason;
use crate::events::SagaEvent;
use crate::state::OrderStatus;
use crate::step::Step;

/// The next action the orchestrator should take, derived purely from the
/// state record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Execute the named forward step.
    Execute(Step),
    /// All forward steps are done; finish the saga as completed.
    Complete,
    /// Forward execution was abandoned; unwind the completed steps.
    Compensate,
    /// The saga is in a terminal state; there is nothing left to do.
    Finished,
}

/// Externally-persisted state of one saga execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SagaInstance {
    order_id: Option<OrderId>,
    customer_id: Option<CustomerId>,
    status: OrderStatus,
    completed_steps: Vec<Step>,
    /// Reference token per completed step, set at most once and passed
    /// unchanged to that step's compensating action.
    artifacts: BTreeMap<Step, String>,
    failure_reason: Option<FailureReason>,
    compensated_steps: Vec<Step>,
    compensation_started: bool,
    cancellation_notice_sent: bool,
    /// Set by the saga-level terminal record; a failed saga is not
    /// finished until its compensation run has been recorded.
    finished: bool,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
}

impl SagaInstance {
    /// Applies a checkpoint event to the record.
    ///
    /// Pure and deterministic: replaying the same sequence always produces
    /// the same record. Events represent committed decisions, so apply
    /// never fails; out-of-order writes are ignored rather than panicking
    /// (an artifact is set at most once, the failure reason is never
    /// overwritten, terminal status is never left).
    pub fn apply(&mut self, event: SagaEvent) {
        match event {
            SagaEvent::SagaStarted(data) => {
                self.order_id = Some(data.order_id);
                self.customer_id = Some(data.customer_id);
                self.started_at = Some(data.started_at);
                if self.status.can_start() {
                    self.status = OrderStatus::Processing;
                }
            }
            SagaEvent::StepStarted(_) | SagaEvent::RetryScheduled(_) => {
                // Attempt bookkeeping lives in the journal; the record only
                // tracks outcomes.
            }
            SagaEvent::StepCompleted(data) => {
                if !self.completed_steps.contains(&data.step) {
                    self.completed_steps.push(data.step);
                }
                if let Some(artifact) = data.artifact {
                    self.artifacts.entry(data.step).or_insert(artifact);
                }
            }
            SagaEvent::StepFailed(data) => {
                // Forward execution is abandoned here: status and reason are
                // fixed before compensation runs and never change after.
                if !self.finished && self.status != OrderStatus::Completed {
                    self.status = OrderStatus::Failed;
                    if self.failure_reason.is_none() {
                        self.failure_reason = Some(FailureReason {
                            kind: data.kind,
                            message: data.error,
                        });
                    }
                }
            }
            SagaEvent::CompensationStarted(_) => {
                self.compensation_started = true;
            }
            SagaEvent::CompensationStepCompleted(data) => {
                self.compensated_steps.push(data.step);
            }
            SagaEvent::CompensationStepFailed(_) => {
                // Recorded in the journal; does not stop the chain and
                // never touches status or failure_reason.
            }
            SagaEvent::CancellationNoticeSent(_) => {
                self.cancellation_notice_sent = true;
            }
            SagaEvent::CancellationNoticeFailed(_) => {}
            SagaEvent::SagaCompleted(data) => {
                if !self.finished && self.status != OrderStatus::Failed {
                    self.status = OrderStatus::Completed;
                    self.finished = true;
                    self.finished_at = Some(data.completed_at);
                }
            }
            SagaEvent::SagaFailed(data) => {
                if !self.finished && self.status != OrderStatus::Completed {
                    self.status = OrderStatus::Failed;
                    self.finished = true;
                    self.finished_at = Some(data.failed_at);
                    if self.failure_reason.is_none() {
                        self.failure_reason = Some(FailureReason {
                            kind: data.kind,
                            message: data.reason,
                        });
                    }
                }
            }
        }
    }

    /// Applies multiple events in sequence.
    pub fn apply_events(&mut self, events: impl IntoIterator<Item = SagaEvent>) {
        for event in events {
            self.apply(event);
        }
    }

    /// Derives the next orchestration action from the record.
    ///
    /// Completed steps are always a prefix of the canonical order, so the
    /// next forward step is simply the one at index `completed_steps.len()`.
    pub fn decide(&self) -> Decision {
        if self.finished {
            return Decision::Finished;
        }
        if self.status == OrderStatus::Failed {
            return Decision::Compensate;
        }
        match Step::CANONICAL_ORDER.get(self.completed_steps.len()) {
            Some(&step) => Decision::Execute(step),
            None => Decision::Complete,
        }
    }
}

// Query methods
impl SagaInstance {
    /// Returns the order ID, once the saga has started.
    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    /// Returns the customer ID, once the saga has started.
    pub fn customer_id(&self) -> Option<&CustomerId> {
        self.customer_id.as_ref()
    }

    /// Returns the saga's status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Returns the completed forward steps in completion order.
    pub fn completed_steps(&self) -> &[Step] {
        &self.completed_steps
    }

    /// Returns the artifact recorded for a step, if any.
    pub fn artifact(&self, step: Step) -> Option<&str> {
        self.artifacts.get(&step).map(String::as_str)
    }

    /// Returns the payment transaction ID, if the payment step completed.
    pub fn payment_transaction_id(&self) -> Option<&str> {
        self.artifact(Step::Payment)
    }

    /// Returns the shipping tracking number, if the shipping step completed.
    pub fn shipping_tracking_number(&self) -> Option<&str> {
        self.artifact(Step::Shipping)
    }

    /// Returns the failure reason, if forward execution was abandoned.
    pub fn failure_reason(&self) -> Option<&FailureReason> {
        self.failure_reason.as_ref()
    }

    /// Returns the steps whose compensating actions completed, in the order
    /// they were attempted (reverse completion order).
    pub fn compensated_steps(&self) -> &[Step] {
        &self.compensated_steps
    }

    /// Returns true if compensation has started.
    pub fn compensation_started(&self) -> bool {
        self.compensation_started
    }

    /// Returns true if the cancellation notice went out.
    pub fn cancellation_notice_sent(&self) -> bool {
        self.cancellation_notice_sent
    }

    /// Returns when the saga reached a terminal state.
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Returns a read-only snapshot of the saga's progress.
    pub fn snapshot(&self, order_id: OrderId) -> StatusSnapshot {
        StatusSnapshot {
            order_id,
            status: self.status,
            completed_steps: self.completed_steps.clone(),
            failure_reason: self.failure_reason.clone(),
        }
    }
}

/// A consistent point-in-time view of a saga's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    /// The order this saga is fulfilling.
    pub order_id: OrderId,
    /// Current status.
    pub status: OrderStatus,
    /// Forward steps completed so far, in order.
    pub completed_steps: Vec<Step>,
    /// Failure reason, if forward execution was abandoned.
    pub failure_reason: Option<FailureReason>,
}

/// The final outcome of a saga, returned to the caller at completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    /// The order this result belongs to.
    pub order_id: OrderId,
    /// Terminal status: always Completed or Failed.
    pub status: OrderStatus,
    /// Payment transaction ID, when the payment step completed.
    pub payment_transaction_id: Option<String>,
    /// Shipping tracking number, when the shipping step completed.
    pub shipping_tracking_number: Option<String>,
    /// Forward steps that completed before the saga finished.
    pub completed_steps: Vec<Step>,
    /// Failure reason for failed sagas.
    pub failure_reason: Option<FailureReason>,
    /// When the saga reached its terminal state.
    pub completed_at: DateTime<Utc>,
}
