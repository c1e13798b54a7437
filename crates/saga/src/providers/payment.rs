//! Payment provider trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{CustomerId, Money, OrderId};
use thiserror::Error;

/// Raw errors a payment provider can return. Classification into
/// retryable/non-retryable happens in the gateway, not here.
#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    /// The card or account was declined.
    #[error("payment declined: {0}")]
    Declined(String),

    /// The customer does not have sufficient funds.
    #[error("insufficient funds")]
    InsufficientFunds,

    /// The payment gateway could not be reached.
    #[error("payment gateway unreachable: {0}")]
    Unreachable(String),
}

/// Receipt for a successful charge.
#[derive(Debug, Clone)]
pub struct ChargeReceipt {
    /// The transaction ID assigned by the payment provider.
    pub transaction_id: String,
}

/// Trait for payment processing operations.
///
/// Both actions must be idempotent: `charge` is keyed by the order ID and
/// `refund` by the transaction ID, so a re-executed decision never
/// double-charges or double-refunds.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
    /// Charges a customer for an order.
    async fn charge(
        &self,
        order_id: OrderId,
        customer_id: &CustomerId,
        amount: Money,
    ) -> Result<ChargeReceipt, PaymentError>;

    /// Refunds a previously made charge.
    async fn refund(&self, transaction_id: &str) -> Result<(), PaymentError>;
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    charges: HashMap<String, (OrderId, Money)>,
    by_order: HashMap<OrderId, String>,
    next_id: u32,
    decline_charges: bool,
    transient_failures: u32,
    fail_on_refund: bool,
}

/// In-memory payment provider for tests and the demo server.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentProvider {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentProvider {
    /// Creates a new in-memory payment provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the provider to decline all charges (business rejection).
    pub fn set_decline_charges(&self, decline: bool) {
        self.state.write().unwrap().decline_charges = decline;
    }

    /// Makes the next `count` charge calls fail with a network-style error.
    pub fn set_transient_failures(&self, count: u32) {
        self.state.write().unwrap().transient_failures = count;
    }

    /// Configures refunds to fail (used to exercise compensation errors).
    pub fn set_fail_on_refund(&self, fail: bool) {
        self.state.write().unwrap().fail_on_refund = fail;
    }

    /// Returns the number of outstanding (not refunded) charges.
    pub fn charge_count(&self) -> usize {
        self.state.read().unwrap().charges.len()
    }

    /// Returns true if a charge exists with the given transaction ID.
    pub fn has_charge(&self, transaction_id: &str) -> bool {
        self.state.read().unwrap().charges.contains_key(transaction_id)
    }
}

#[async_trait]
impl PaymentProvider for InMemoryPaymentProvider {
    async fn charge(
        &self,
        order_id: OrderId,
        _customer_id: &CustomerId,
        amount: Money,
    ) -> Result<ChargeReceipt, PaymentError> {
        let mut state = self.state.write().unwrap();

        // Idempotency: a repeated charge for the same order returns the
        // original receipt instead of charging again.
        if let Some(transaction_id) = state.by_order.get(&order_id) {
            return Ok(ChargeReceipt {
                transaction_id: transaction_id.clone(),
            });
        }

        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(PaymentError::Unreachable("connection reset".to_string()));
        }

        if state.decline_charges {
            return Err(PaymentError::Declined("card declined".to_string()));
        }

        state.next_id += 1;
        let transaction_id = format!("TXN-{:04}", state.next_id);
        state
            .charges
            .insert(transaction_id.clone(), (order_id, amount));
        state.by_order.insert(order_id, transaction_id.clone());

        Ok(ChargeReceipt { transaction_id })
    }

    async fn refund(&self, transaction_id: &str) -> Result<(), PaymentError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_refund {
            return Err(PaymentError::Unreachable(
                "refund endpoint unavailable".to_string(),
            ));
        }

        // Idempotent: refunding an unknown or already-refunded transaction
        // is a no-op.
        if let Some((order_id, _)) = state.charges.remove(transaction_id) {
            state.by_order.remove(&order_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_charge_and_refund() {
        let provider = InMemoryPaymentProvider::new();
        let order_id = OrderId::new();
        let customer = CustomerId::new("C1");

        let receipt = provider
            .charge(order_id, &customer, Money::from_cents(5000))
            .await
            .unwrap();
        assert!(receipt.transaction_id.starts_with("TXN-"));
        assert_eq!(provider.charge_count(), 1);

        provider.refund(&receipt.transaction_id).await.unwrap();
        assert_eq!(provider.charge_count(), 0);
    }

    #[tokio::test]
    async fn test_charge_is_idempotent_per_order() {
        let provider = InMemoryPaymentProvider::new();
        let order_id = OrderId::new();
        let customer = CustomerId::new("C1");

        let r1 = provider
            .charge(order_id, &customer, Money::from_cents(1000))
            .await
            .unwrap();
        let r2 = provider
            .charge(order_id, &customer, Money::from_cents(1000))
            .await
            .unwrap();

        assert_eq!(r1.transaction_id, r2.transaction_id);
        assert_eq!(provider.charge_count(), 1);
    }

    #[tokio::test]
    async fn test_refund_is_idempotent() {
        let provider = InMemoryPaymentProvider::new();
        let order_id = OrderId::new();
        let customer = CustomerId::new("C1");

        let receipt = provider
            .charge(order_id, &customer, Money::from_cents(1000))
            .await
            .unwrap();
        provider.refund(&receipt.transaction_id).await.unwrap();
        provider.refund(&receipt.transaction_id).await.unwrap();
        assert_eq!(provider.charge_count(), 0);
    }

    #[tokio::test]
    async fn test_transient_failures_then_success() {
        let provider = InMemoryPaymentProvider::new();
        provider.set_transient_failures(2);
        let order_id = OrderId::new();
        let customer = CustomerId::new("C1");

        assert!(matches!(
            provider.charge(order_id, &customer, Money::from_cents(100)).await,
            Err(PaymentError::Unreachable(_))
        ));
        assert!(matches!(
            provider.charge(order_id, &customer, Money::from_cents(100)).await,
            Err(PaymentError::Unreachable(_))
        ));
        assert!(
            provider
                .charge(order_id, &customer, Money::from_cents(100))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_declined_charge() {
        let provider = InMemoryPaymentProvider::new();
        provider.set_decline_charges(true);

        let result = provider
            .charge(OrderId::new(), &CustomerId::new("C1"), Money::from_cents(100))
            .await;
        assert!(matches!(result, Err(PaymentError::Declined(_))));
        assert_eq!(provider.charge_count(), 0);
    }
}
