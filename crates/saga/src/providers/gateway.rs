//! The step action gateway.
//!
//! One typed wrapper per external step, binding the forward action, the
//! compensating action, and the failure classification together. This is
//! the only place a raw provider error is translated into retryable vs.
//! non-retryable: business-rule rejections (a declined card, an out-of-stock
//! product) are non-retryable because retrying cannot change the outcome,
//! while network-style errors are retryable.

use common::{OrderId, OrderRequest};

use crate::error::{FailureKind, StepError};
use crate::step::Step;

use super::inventory::{InventoryError, InventoryProvider};
use super::notification::{NotificationError, NotificationProvider};
use super::payment::{PaymentError, PaymentProvider};
use super::shipping::{ShippingError, ShippingProvider};

/// Dispatches forward and compensating actions by step and classifies
/// their failures.
pub struct StepGateway<P, I, Sh, N>
where
    P: PaymentProvider,
    I: InventoryProvider,
    Sh: ShippingProvider,
    N: NotificationProvider,
{
    payment: P,
    inventory: I,
    shipping: Sh,
    notification: N,
}

impl<P, I, Sh, N> StepGateway<P, I, Sh, N>
where
    P: PaymentProvider,
    I: InventoryProvider,
    Sh: ShippingProvider,
    N: NotificationProvider,
{
    /// Creates a gateway over the four step providers.
    pub fn new(payment: P, inventory: I, shipping: Sh, notification: N) -> Self {
        Self {
            payment,
            inventory,
            shipping,
            notification,
        }
    }

    /// Executes the forward action for a step.
    ///
    /// Returns the step's artifact token on success, or a classified
    /// failure.
    pub async fn forward(
        &self,
        step: Step,
        order_id: OrderId,
        request: &OrderRequest,
    ) -> Result<Option<String>, StepError> {
        match step {
            Step::Payment => self
                .payment
                .charge(order_id, &request.customer_id, request.total_amount)
                .await
                .map(|r| Some(r.transaction_id))
                .map_err(|e| classify_payment(step, e)),
            Step::Inventory => self
                .inventory
                .reserve(order_id, &request.items)
                .await
                .map(|r| Some(r.reservation_id))
                .map_err(|e| classify_inventory(step, e)),
            Step::Shipping => self
                .shipping
                .create_shipment(order_id, &request.shipping_address)
                .await
                .map(|r| Some(r.tracking_number))
                .map_err(|e| classify_shipping(step, e)),
            Step::Notification => self
                .notification
                .send_confirmation(order_id, &request.customer_id)
                .await
                .map(|r| Some(r.notice_id))
                .map_err(|e| classify_notification(step, e)),
        }
    }

    /// Executes the compensating action for a step against its recorded
    /// artifact.
    pub async fn compensate(&self, step: Step, artifact: &str) -> Result<(), StepError> {
        match step {
            Step::Payment => self
                .payment
                .refund(artifact)
                .await
                .map_err(|e| classify_payment(step, e)),
            Step::Inventory => self
                .inventory
                .release(artifact)
                .await
                .map_err(|e| classify_inventory(step, e)),
            Step::Shipping => self
                .shipping
                .cancel_shipment(artifact)
                .await
                .map_err(|e| classify_shipping(step, e)),
            // A confirmation cannot be unsent; the cancellation notice
            // covers this step.
            Step::Notification => Ok(()),
        }
    }

    /// Sends the best-effort cancellation notice issued at the end of
    /// every compensation run.
    pub async fn send_cancellation_notice(
        &self,
        order_id: OrderId,
        request: &OrderRequest,
    ) -> Result<(), StepError> {
        self.notification
            .send_cancellation(order_id, &request.customer_id)
            .await
            .map(|_| ())
            .map_err(|e| classify_notification(Step::Notification, e))
    }
}

fn classify_payment(step: Step, error: PaymentError) -> StepError {
    let kind = match &error {
        PaymentError::Unreachable(_) => FailureKind::Transient,
        PaymentError::Declined(_) | PaymentError::InsufficientFunds => FailureKind::Rejected,
    };
    StepError::new(step, kind, error.to_string())
}

fn classify_inventory(step: Step, error: InventoryError) -> StepError {
    let kind = match &error {
        InventoryError::Unavailable(_) => FailureKind::Transient,
        InventoryError::OutOfStock(_) => FailureKind::Rejected,
    };
    StepError::new(step, kind, error.to_string())
}

fn classify_shipping(step: Step, error: ShippingError) -> StepError {
    let kind = match &error {
        ShippingError::CarrierUnavailable(_) => FailureKind::Transient,
        ShippingError::InvalidAddress(_) => FailureKind::Rejected,
    };
    StepError::new(step, kind, error.to_string())
}

fn classify_notification(step: Step, error: NotificationError) -> StepError {
    let kind = match &error {
        NotificationError::Unavailable(_) => FailureKind::Transient,
        NotificationError::Undeliverable(_) => FailureKind::Rejected,
    };
    StepError::new(step, kind, error.to_string())
}
