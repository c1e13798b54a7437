//! Inventory provider trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{OrderId, OrderItem};
use thiserror::Error;

/// Raw errors an inventory provider can return.
#[derive(Debug, Clone, Error)]
pub enum InventoryError {
    /// Not enough stock for one of the requested products.
    #[error("out of stock: {0}")]
    OutOfStock(String),

    /// The warehouse system could not be reached.
    #[error("inventory system unavailable: {0}")]
    Unavailable(String),
}

/// Receipt for a successful reservation.
#[derive(Debug, Clone)]
pub struct ReservationReceipt {
    /// The reservation ID assigned by the inventory provider.
    pub reservation_id: String,
}

/// Trait for inventory operations.
///
/// `reserve` is idempotent per order; `release` per reservation ID.
#[async_trait]
pub trait InventoryProvider: Send + Sync {
    /// Reserves stock for the given order items.
    async fn reserve(
        &self,
        order_id: OrderId,
        items: &[OrderItem],
    ) -> Result<ReservationReceipt, InventoryError>;

    /// Releases a previously made reservation.
    async fn release(&self, reservation_id: &str) -> Result<(), InventoryError>;
}

#[derive(Debug, Default)]
struct InMemoryInventoryState {
    reservations: HashMap<String, (OrderId, Vec<OrderItem>)>,
    by_order: HashMap<OrderId, String>,
    next_id: u32,
    out_of_stock: bool,
    transient_failures: u32,
    fail_on_release: bool,
}

/// In-memory inventory provider for tests and the demo server.
#[derive(Debug, Clone, Default)]
pub struct InMemoryInventoryProvider {
    state: Arc<RwLock<InMemoryInventoryState>>,
}

impl InMemoryInventoryProvider {
    /// Creates a new in-memory inventory provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the provider to reject reservations as out of stock.
    pub fn set_out_of_stock(&self, out: bool) {
        self.state.write().unwrap().out_of_stock = out;
    }

    /// Makes the next `count` reserve calls fail with a network-style error.
    pub fn set_transient_failures(&self, count: u32) {
        self.state.write().unwrap().transient_failures = count;
    }

    /// Configures releases to fail (used to exercise compensation errors).
    pub fn set_fail_on_release(&self, fail: bool) {
        self.state.write().unwrap().fail_on_release = fail;
    }

    /// Returns the number of active reservations.
    pub fn reservation_count(&self) -> usize {
        self.state.read().unwrap().reservations.len()
    }

    /// Returns true if a reservation exists with the given ID.
    pub fn has_reservation(&self, reservation_id: &str) -> bool {
        self.state
            .read()
            .unwrap()
            .reservations
            .contains_key(reservation_id)
    }
}

#[async_trait]
impl InventoryProvider for InMemoryInventoryProvider {
    async fn reserve(
        &self,
        order_id: OrderId,
        items: &[OrderItem],
    ) -> Result<ReservationReceipt, InventoryError> {
        let mut state = self.state.write().unwrap();

        if let Some(reservation_id) = state.by_order.get(&order_id) {
            return Ok(ReservationReceipt {
                reservation_id: reservation_id.clone(),
            });
        }

        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(InventoryError::Unavailable(
                "warehouse timeout".to_string(),
            ));
        }

        if state.out_of_stock {
            let product = items
                .first()
                .map(|i| i.product_id.to_string())
                .unwrap_or_default();
            return Err(InventoryError::OutOfStock(product));
        }

        state.next_id += 1;
        let reservation_id = format!("RES-{:04}", state.next_id);
        state
            .reservations
            .insert(reservation_id.clone(), (order_id, items.to_vec()));
        state.by_order.insert(order_id, reservation_id.clone());

        Ok(ReservationReceipt { reservation_id })
    }

    async fn release(&self, reservation_id: &str) -> Result<(), InventoryError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_release {
            return Err(InventoryError::Unavailable(
                "release endpoint unavailable".to_string(),
            ));
        }

        if let Some((order_id, _)) = state.reservations.remove(reservation_id) {
            state.by_order.remove(&order_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::Money;

    fn items() -> Vec<OrderItem> {
        vec![OrderItem::new("SKU-001", 2, Money::from_cents(1000))]
    }

    #[tokio::test]
    async fn test_reserve_and_release() {
        let provider = InMemoryInventoryProvider::new();
        let order_id = OrderId::new();

        let receipt = provider.reserve(order_id, &items()).await.unwrap();
        assert!(receipt.reservation_id.starts_with("RES-"));
        assert_eq!(provider.reservation_count(), 1);
        assert!(provider.has_reservation(&receipt.reservation_id));

        provider.release(&receipt.reservation_id).await.unwrap();
        assert_eq!(provider.reservation_count(), 0);
    }

    #[tokio::test]
    async fn test_reserve_is_idempotent_per_order() {
        let provider = InMemoryInventoryProvider::new();
        let order_id = OrderId::new();

        let r1 = provider.reserve(order_id, &items()).await.unwrap();
        let r2 = provider.reserve(order_id, &items()).await.unwrap();

        assert_eq!(r1.reservation_id, r2.reservation_id);
        assert_eq!(provider.reservation_count(), 1);
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let provider = InMemoryInventoryProvider::new();
        let order_id = OrderId::new();

        let receipt = provider.reserve(order_id, &items()).await.unwrap();
        provider.release(&receipt.reservation_id).await.unwrap();
        provider.release(&receipt.reservation_id).await.unwrap();
        assert_eq!(provider.reservation_count(), 0);
    }

    #[tokio::test]
    async fn test_out_of_stock_names_product() {
        let provider = InMemoryInventoryProvider::new();
        provider.set_out_of_stock(true);

        let result = provider.reserve(OrderId::new(), &items()).await;
        match result {
            Err(InventoryError::OutOfStock(product)) => assert_eq!(product, "SKU-001"),
            other => panic!("expected OutOfStock, got {other:?}"),
        }
    }
}
