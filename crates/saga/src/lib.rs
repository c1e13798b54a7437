//! Order-fulfillment saga orchestration.
//!
//! This crate drives multi-step order fulfillment with compensating
//! actions on failure. Each order runs one saga through the canonical
//! step order:
//! 1. Charge payment
//! 2. Reserve inventory
//! 3. Create shipment
//! 4. Send confirmation
//!
//! Steps retry per a per-step policy; when a step fails for good, the
//! completed steps are unwound in reverse order and a cancellation notice
//! goes out. Every transition is checkpointed to a [`journal`] log before
//! it becomes queryable, so an execution can be rebuilt by replay.

pub mod compensation;
pub mod error;
pub mod events;
pub mod instance;
pub mod orchestrator;
pub mod providers;
pub mod registry;
pub mod retry;
pub mod state;
pub mod step;

pub use compensation::{CompensationOutcome, CompensationReport, compensation_plan};
pub use error::{FailureKind, FailureReason, SagaError, StepError};
pub use events::SagaEvent;
pub use instance::{Decision, OrderResult, SagaInstance, StatusSnapshot};
pub use orchestrator::SagaOrchestrator;
pub use providers::{
    InMemoryInventoryProvider, InMemoryNotificationProvider, InMemoryPaymentProvider,
    InMemoryShippingProvider, InventoryProvider, NotificationProvider, PaymentProvider,
    ShippingProvider, StepGateway,
};
pub use registry::{SagaHandle, SagaRegistry};
pub use retry::{Backoff, RetryPolicy, RetryPolicyTable};
pub use state::OrderStatus;
pub use step::Step;
