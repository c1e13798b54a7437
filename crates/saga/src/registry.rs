//! Live saga handles: queryable snapshots plus the failure-injection inbox.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use common::{OrderId, OrderRequest};
use tracing::debug;

use crate::error::{Result, SagaError};
use crate::instance::{SagaInstance, StatusSnapshot};
use crate::step::Step;

/// Shared state for one running (or finished) saga.
///
/// The snapshot is the queryable view: the orchestrator updates it only
/// after the checkpoint append succeeds, so a reader never observes
/// progress that was not journaled. The inbox holds at most one pending
/// injected failure; injections are latest-wins and are consumed only
/// when the orchestrator evaluates the matching step.
#[derive(Debug)]
pub struct SagaHandle {
    order_id: OrderId,
    request: OrderRequest,
    snapshot: RwLock<SagaInstance>,
    inbox: Mutex<Option<Step>>,
}

impl SagaHandle {
    fn new(order_id: OrderId, request: OrderRequest) -> Self {
        Self {
            order_id,
            request,
            snapshot: RwLock::new(SagaInstance::default()),
            inbox: Mutex::new(None),
        }
    }

    /// The order this saga is fulfilling.
    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// The order request the saga was started with.
    pub fn request(&self) -> &OrderRequest {
        &self.request
    }

    /// Replaces the queryable snapshot with the given record.
    ///
    /// Called by the orchestrator after each successful journal append.
    pub fn publish(&self, instance: &SagaInstance) {
        *self.snapshot.write().unwrap() = instance.clone();
    }

    /// Returns a point-in-time view of the saga's progress.
    pub fn status(&self) -> StatusSnapshot {
        self.snapshot.read().unwrap().snapshot(self.order_id)
    }

    /// Stages an injected failure for a step, replacing any previous one.
    pub fn inject(&self, step: Step) {
        let mut inbox = self.inbox.lock().unwrap();
        if let Some(previous) = inbox.replace(step) {
            debug!(order_id = %self.order_id, %previous, %step, "replaced pending injected failure");
        }
    }

    /// Consumes the pending injection if it targets the given step.
    ///
    /// An injection for a different step stays in the inbox untouched; it
    /// fires (or expires unconsumed) on its own step's next evaluation.
    pub fn take_injection(&self, step: Step) -> bool {
        let mut inbox = self.inbox.lock().unwrap();
        if *inbox == Some(step) {
            *inbox = None;
            true
        } else {
            false
        }
    }
}

/// Tracks every saga the orchestrator has accepted, keyed by order ID.
#[derive(Debug, Clone, Default)]
pub struct SagaRegistry {
    handles: Arc<RwLock<HashMap<OrderId, Arc<SagaHandle>>>>,
}

impl SagaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new saga and returns its handle.
    pub fn register(&self, order_id: OrderId, request: OrderRequest) -> Result<Arc<SagaHandle>> {
        let mut handles = self.handles.write().unwrap();
        if handles.contains_key(&order_id) {
            return Err(SagaError::AlreadyStarted(order_id));
        }
        let handle = Arc::new(SagaHandle::new(order_id, request));
        handles.insert(order_id, Arc::clone(&handle));
        Ok(handle)
    }

    /// Looks up the handle for an order.
    pub fn handle(&self, order_id: OrderId) -> Option<Arc<SagaHandle>> {
        self.handles.read().unwrap().get(&order_id).cloned()
    }

    /// Returns the current progress snapshot for an order.
    pub fn status(&self, order_id: OrderId) -> Result<StatusSnapshot> {
        self.handle(order_id)
            .map(|handle| handle.status())
            .ok_or(SagaError::OrderNotFound(order_id))
    }

    /// Stages an injected failure for one step of one saga.
    ///
    /// The step name is validated before the order is looked up, so an
    /// unknown step is reported as such even for an unknown order. Staging
    /// against a saga that has already passed (or finished) the step is
    /// accepted and simply never fires.
    pub fn inject_failure(&self, order_id: OrderId, step_name: &str) -> Result<Step> {
        let step: Step = step_name
            .parse()
            .map_err(|_| SagaError::UnknownStep(step_name.to_string()))?;
        let handle = self
            .handle(order_id)
            .ok_or(SagaError::OrderNotFound(order_id))?;
        handle.inject(step);
        Ok(step)
    }

    /// Number of registered sagas.
    pub fn len(&self) -> usize {
        self.handles.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SagaEvent;
    use crate::state::OrderStatus;
    use common::{Money, OrderItem};

    fn request() -> OrderRequest {
        OrderRequest::new(
            "C1",
            vec![OrderItem::new("P1", 1, Money::from_cents(100))],
            Money::from_cents(100),
            "Addr",
        )
    }

    #[test]
    fn test_register_and_status() {
        let registry = SagaRegistry::new();
        let order_id = OrderId::new();
        registry.register(order_id, request()).unwrap();

        let snapshot = registry.status(order_id).unwrap();
        assert_eq!(snapshot.order_id, order_id);
        assert_eq!(snapshot.status, OrderStatus::Pending);
        assert!(snapshot.completed_steps.is_empty());
    }

    #[test]
    fn test_register_twice_is_rejected() {
        let registry = SagaRegistry::new();
        let order_id = OrderId::new();
        registry.register(order_id, request()).unwrap();

        let result = registry.register(order_id, request());
        assert!(matches!(result, Err(SagaError::AlreadyStarted(id)) if id == order_id));
    }

    #[test]
    fn test_status_for_unknown_order() {
        let registry = SagaRegistry::new();
        let result = registry.status(OrderId::new());
        assert!(matches!(result, Err(SagaError::OrderNotFound(_))));
    }

    #[test]
    fn test_publish_updates_snapshot() {
        let registry = SagaRegistry::new();
        let order_id = OrderId::new();
        let handle = registry.register(order_id, request()).unwrap();

        let mut instance = SagaInstance::default();
        instance.apply(SagaEvent::saga_started(order_id, "C1".into()));
        instance.apply(SagaEvent::step_completed(Step::Payment, Some("TXN-1".into())));
        handle.publish(&instance);

        let snapshot = registry.status(order_id).unwrap();
        assert_eq!(snapshot.status, OrderStatus::Processing);
        assert_eq!(snapshot.completed_steps, vec![Step::Payment]);
    }

    #[test]
    fn test_injection_latest_wins() {
        let registry = SagaRegistry::new();
        let order_id = OrderId::new();
        let handle = registry.register(order_id, request()).unwrap();

        registry.inject_failure(order_id, "PAYMENT").unwrap();
        registry.inject_failure(order_id, "SHIPPING").unwrap();

        // The earlier injection was replaced
        assert!(!handle.take_injection(Step::Payment));
        assert!(handle.take_injection(Step::Shipping));
        // And consuming it empties the inbox
        assert!(!handle.take_injection(Step::Shipping));
    }

    #[test]
    fn test_injection_for_other_step_stays_staged() {
        let registry = SagaRegistry::new();
        let order_id = OrderId::new();
        let handle = registry.register(order_id, request()).unwrap();

        registry.inject_failure(order_id, "INVENTORY").unwrap();
        assert!(!handle.take_injection(Step::Payment));
        assert!(handle.take_injection(Step::Inventory));
    }

    #[test]
    fn test_inject_unknown_step_validated_first() {
        let registry = SagaRegistry::new();
        // Unknown step wins over unknown order
        let result = registry.inject_failure(OrderId::new(), "TELEPORT");
        assert!(matches!(result, Err(SagaError::UnknownStep(name)) if name == "TELEPORT"));
    }

    #[test]
    fn test_inject_unknown_order() {
        let registry = SagaRegistry::new();
        let result = registry.inject_failure(OrderId::new(), "PAYMENT");
        assert!(matches!(result, Err(SagaError::OrderNotFound(_))));
    }
}
