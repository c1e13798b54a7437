//! The saga orchestrator.
//!
//! Drives one saga per order: forward steps in canonical order with
//! per-step retry, then reverse-order compensation when forward execution
//! is abandoned. Every transition is journaled before it becomes visible,
//! and the next action is always derived from the state record via
//! [`SagaInstance::decide`], never from control flow held in memory.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use journal::{AppendOptions, CheckpointLog, CheckpointLogExt, CheckpointRecord, Version};
use tracing::{info, warn};

use common::{OrderId, OrderRequest};

use crate::compensation::{
    CompensationAttempt, CompensationOutcome, CompensationReport, compensation_plan,
};
use crate::error::{FailureKind, Result, SagaError, StepError};
use crate::events::SagaEvent;
use crate::instance::{Decision, OrderResult, SagaInstance};
use crate::providers::{
    InventoryProvider, NotificationProvider, PaymentProvider, ShippingProvider, StepGateway,
};
use crate::registry::{SagaHandle, SagaRegistry};
use crate::retry::RetryPolicyTable;
use crate::step::Step;

/// Orchestrates order-fulfillment sagas over a checkpoint log.
pub struct SagaOrchestrator<L, P, I, Sh, N>
where
    L: CheckpointLog,
    P: PaymentProvider,
    I: InventoryProvider,
    Sh: ShippingProvider,
    N: NotificationProvider,
{
    log: L,
    gateway: StepGateway<P, I, Sh, N>,
    policies: RetryPolicyTable,
    registry: SagaRegistry,
}

impl<L, P, I, Sh, N> SagaOrchestrator<L, P, I, Sh, N>
where
    L: CheckpointLog,
    P: PaymentProvider,
    I: InventoryProvider,
    Sh: ShippingProvider,
    N: NotificationProvider,
{
    /// Creates a new orchestrator.
    pub fn new(log: L, gateway: StepGateway<P, I, Sh, N>, policies: RetryPolicyTable) -> Self {
        Self {
            log,
            gateway,
            policies,
            registry: SagaRegistry::new(),
        }
    }

    /// The registry backing the query and signal surfaces.
    pub fn registry(&self) -> &SagaRegistry {
        &self.registry
    }

    /// Accepts an order for fulfillment.
    ///
    /// Validates the request and registers a saga for it; [`Self::run`]
    /// performs the actual execution.
    pub fn submit(&self, request: OrderRequest) -> Result<OrderId> {
        request
            .validate()
            .map_err(|e| SagaError::InvalidRequest(e.to_string()))?;
        let order_id = OrderId::new();
        self.registry.register(order_id, request)?;
        info!(%order_id, "order accepted");
        Ok(order_id)
    }

    /// Runs a submitted saga to its terminal state.
    #[tracing::instrument(skip(self), fields(saga_type = "OrderFulfillment"))]
    pub async fn run(&self, order_id: OrderId) -> Result<OrderResult> {
        metrics::counter!("saga_executions_total").increment(1);
        let saga_start = Instant::now();

        let handle = self
            .registry
            .handle(order_id)
            .ok_or(SagaError::OrderNotFound(order_id))?;

        let mut saga = SagaInstance::default();
        let mut version = Version::initial();

        let started =
            SagaEvent::saga_started(order_id, handle.request().customer_id.clone());
        version = self.append_event(order_id, version, &started).await?;
        saga.apply(started);
        handle.publish(&saga);

        loop {
            match saga.decide() {
                Decision::Execute(step) => {
                    self.execute_step(&handle, &mut saga, &mut version, step)
                        .await?;
                }
                Decision::Complete => {
                    let completed = SagaEvent::saga_completed();
                    version = self.append_event(order_id, version, &completed).await?;
                    saga.apply(completed);
                    handle.publish(&saga);

                    let duration = saga_start.elapsed().as_secs_f64();
                    metrics::histogram!("saga_duration_seconds").record(duration);
                    metrics::counter!("saga_completed").increment(1);
                    info!(%order_id, duration, "saga completed successfully");
                }
                Decision::Compensate => {
                    let report = self
                        .run_compensation(&handle, &mut saga, &mut version)
                        .await?;
                    if !report.fully_compensated() {
                        warn!(
                            %order_id,
                            failed_steps = ?report.failed_steps(),
                            "compensation finished with failed steps; manual cleanup may be required"
                        );
                    }
                    metrics::histogram!("saga_duration_seconds")
                        .record(saga_start.elapsed().as_secs_f64());
                }
                Decision::Finished => break,
            }
        }

        Ok(result_of(order_id, &saga))
    }

    /// Submits and runs an order in one call.
    pub async fn process_order(&self, request: OrderRequest) -> Result<OrderResult> {
        let order_id = self.submit(request)?;
        self.run(order_id).await
    }

    /// Executes one forward step, retrying per its policy.
    ///
    /// The step's terminal outcome (completed or failed) is journaled here;
    /// a failure does not return an error, it lands in the record and the
    /// decision loop picks compensation up from there.
    async fn execute_step(
        &self,
        handle: &Arc<SagaHandle>,
        saga: &mut SagaInstance,
        version: &mut Version,
        step: Step,
    ) -> Result<()> {
        let order_id = handle.order_id();
        let policy = self.policies.policy(step).clone();
        let mut attempt = 1;

        loop {
            info!(%order_id, %step, attempt, "saga step started");
            let started = SagaEvent::step_started(step, attempt);
            *version = self.append_event(order_id, *version, &started).await?;
            saga.apply(started);

            // The injection inbox is consulted only here, at step
            // evaluation; a pending injection for another step stays put.
            let outcome = if handle.take_injection(step) {
                Err(StepError::simulated(step))
            } else {
                self.gateway.forward(step, order_id, handle.request()).await
            };

            match outcome {
                Ok(artifact) => {
                    let completed = SagaEvent::step_completed(step, artifact);
                    *version = self.append_event(order_id, *version, &completed).await?;
                    saga.apply(completed);
                    handle.publish(saga);
                    return Ok(());
                }
                Err(error) if error.is_retryable() && attempt < policy.max_attempts => {
                    let delay = policy.delay_for(attempt);
                    metrics::counter!("saga_step_retries_total").increment(1);
                    warn!(%order_id, %step, attempt, %error, delay_ms = delay.as_millis() as u64, "step failed, retry scheduled");

                    let scheduled = SagaEvent::retry_scheduled(
                        step,
                        attempt,
                        delay.as_millis() as u64,
                        error.to_string(),
                    );
                    *version = self.append_event(order_id, *version, &scheduled).await?;
                    saga.apply(scheduled);
                    handle.publish(saga);

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    let (kind, message) = if error.kind == FailureKind::Transient {
                        (
                            FailureKind::RetryExhausted,
                            format!("retries exhausted after {attempt} attempts: {}", error.message),
                        )
                    } else {
                        (error.kind, error.message)
                    };
                    warn!(%order_id, %step, attempt, %kind, %message, "step failed");

                    let failed = SagaEvent::step_failed(step, kind, message);
                    *version = self.append_event(order_id, *version, &failed).await?;
                    saga.apply(failed);
                    handle.publish(saga);
                    return Ok(());
                }
            }
        }
    }

    /// Unwinds completed steps in reverse order, then sends the
    /// cancellation notice and records the terminal failure.
    ///
    /// A failed compensating action is journaled and skipped; the chain
    /// never stops early and the notice always goes out.
    #[tracing::instrument(skip(self, handle, saga, version))]
    async fn run_compensation(
        &self,
        handle: &Arc<SagaHandle>,
        saga: &mut SagaInstance,
        version: &mut Version,
    ) -> Result<CompensationReport> {
        let order_id = handle.order_id();
        metrics::counter!("saga_compensations_total").increment(1);

        // The step that failed is the one forward execution stopped at
        let from_step = Step::CANONICAL_ORDER
            .get(saga.completed_steps().len())
            .copied()
            .unwrap_or(Step::Notification);

        let started = SagaEvent::compensation_started(from_step);
        *version = self.append_event(order_id, *version, &started).await?;
        saga.apply(started);
        handle.publish(saga);

        let mut report = CompensationReport::default();

        for planned in compensation_plan(saga) {
            match self.gateway.compensate(planned.step, &planned.artifact).await {
                Ok(()) => {
                    info!(%order_id, step = %planned.step, "compensation step completed");
                    let event = SagaEvent::compensation_step_completed(planned.step);
                    *version = self.append_event(order_id, *version, &event).await?;
                    saga.apply(event);
                    report.attempts.push(CompensationAttempt {
                        step: planned.step,
                        outcome: CompensationOutcome::Compensated,
                    });
                }
                Err(error) => {
                    warn!(%order_id, step = %planned.step, %error, "compensation step failed, continuing");
                    let event =
                        SagaEvent::compensation_step_failed(planned.step, error.to_string());
                    *version = self.append_event(order_id, *version, &event).await?;
                    saga.apply(event);
                    report.attempts.push(CompensationAttempt {
                        step: planned.step,
                        outcome: CompensationOutcome::Failed(error.to_string()),
                    });
                }
            }
            handle.publish(saga);
        }

        // Best-effort cancellation notice, sent on every compensation run
        let notice_event = match self
            .gateway
            .send_cancellation_notice(order_id, handle.request())
            .await
        {
            Ok(()) => {
                report.cancellation_notice_sent = true;
                SagaEvent::cancellation_notice_sent()
            }
            Err(error) => {
                warn!(%order_id, %error, "cancellation notice failed");
                SagaEvent::cancellation_notice_failed(error.to_string())
            }
        };
        *version = self.append_event(order_id, *version, &notice_event).await?;
        saga.apply(notice_event);

        let (kind, reason) = match saga.failure_reason() {
            Some(reason) => (reason.kind, reason.message.clone()),
            None => (FailureKind::Rejected, "unknown failure".to_string()),
        };
        let failed = SagaEvent::saga_failed(kind, reason.clone());
        *version = self.append_event(order_id, *version, &failed).await?;
        saga.apply(failed);
        handle.publish(saga);

        metrics::counter!("saga_failed").increment(1);
        warn!(%order_id, %from_step, %reason, "saga failed");

        Ok(report)
    }

    /// Rebuilds a saga record by replaying its journal.
    pub async fn load_saga(&self, order_id: OrderId) -> Result<Option<SagaInstance>> {
        let records = self.log.records_for_saga(order_id).await?;
        if records.is_empty() {
            return Ok(None);
        }

        let mut saga = SagaInstance::default();
        for record in records {
            let event: SagaEvent = record.decode()?;
            saga.apply(event);
        }
        Ok(Some(saga))
    }

    /// Journals a single saga event with optimistic concurrency.
    async fn append_event(
        &self,
        order_id: OrderId,
        current_version: Version,
        event: &SagaEvent,
    ) -> Result<Version> {
        let next_version = current_version.next();
        let record =
            CheckpointRecord::new(order_id, next_version, event.record_type(), event)?;
        let version = self
            .log
            .append_record(record, AppendOptions::expect_version(current_version))
            .await?;
        Ok(version)
    }
}

fn result_of(order_id: OrderId, saga: &SagaInstance) -> OrderResult {
    OrderResult {
        order_id,
        status: saga.status(),
        payment_transaction_id: saga.payment_transaction_id().map(str::to_string),
        shipping_tracking_number: saga.shipping_tracking_number().map(str::to_string),
        completed_steps: saga.completed_steps().to_vec(),
        failure_reason: saga.failure_reason().cloned(),
        completed_at: saga.finished_at().unwrap_or_else(Utc::now),
    }
}
