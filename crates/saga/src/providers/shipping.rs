//! Shipping provider trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::OrderId;
use thiserror::Error;

/// Raw errors a shipping provider can return.
#[derive(Debug, Clone, Error)]
pub enum ShippingError {
    /// The carrier rejected the destination address.
    #[error("invalid shipping address: {0}")]
    InvalidAddress(String),

    /// The carrier API could not be reached.
    #[error("carrier unavailable: {0}")]
    CarrierUnavailable(String),
}

/// Receipt for a successfully created shipment.
#[derive(Debug, Clone)]
pub struct ShipmentReceipt {
    /// The tracking number assigned by the carrier.
    pub tracking_number: String,
}

/// Trait for shipping operations.
///
/// `create_shipment` is idempotent per order; `cancel_shipment` per
/// tracking number.
#[async_trait]
pub trait ShippingProvider: Send + Sync {
    /// Creates a shipment for an order to the given address.
    async fn create_shipment(
        &self,
        order_id: OrderId,
        address: &str,
    ) -> Result<ShipmentReceipt, ShippingError>;

    /// Cancels a previously created shipment.
    async fn cancel_shipment(&self, tracking_number: &str) -> Result<(), ShippingError>;
}

#[derive(Debug, Default)]
struct InMemoryShippingState {
    shipments: HashMap<String, OrderId>,
    by_order: HashMap<OrderId, String>,
    next_id: u32,
    reject_address: bool,
    transient_failures: u32,
    fail_on_cancel: bool,
}

/// In-memory shipping provider for tests and the demo server.
#[derive(Debug, Clone, Default)]
pub struct InMemoryShippingProvider {
    state: Arc<RwLock<InMemoryShippingState>>,
}

impl InMemoryShippingProvider {
    /// Creates a new in-memory shipping provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the provider to reject all addresses.
    pub fn set_reject_address(&self, reject: bool) {
        self.state.write().unwrap().reject_address = reject;
    }

    /// Makes the next `count` create calls fail with a network-style error.
    pub fn set_transient_failures(&self, count: u32) {
        self.state.write().unwrap().transient_failures = count;
    }

    /// Configures cancellations to fail (used to exercise compensation errors).
    pub fn set_fail_on_cancel(&self, fail: bool) {
        self.state.write().unwrap().fail_on_cancel = fail;
    }

    /// Returns the number of active shipments.
    pub fn shipment_count(&self) -> usize {
        self.state.read().unwrap().shipments.len()
    }

    /// Returns true if a shipment exists with the given tracking number.
    pub fn has_shipment(&self, tracking_number: &str) -> bool {
        self.state
            .read()
            .unwrap()
            .shipments
            .contains_key(tracking_number)
    }
}

#[async_trait]
impl ShippingProvider for InMemoryShippingProvider {
    async fn create_shipment(
        &self,
        order_id: OrderId,
        address: &str,
    ) -> Result<ShipmentReceipt, ShippingError> {
        let mut state = self.state.write().unwrap();

        if let Some(tracking_number) = state.by_order.get(&order_id) {
            return Ok(ShipmentReceipt {
                tracking_number: tracking_number.clone(),
            });
        }

        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(ShippingError::CarrierUnavailable(
                "carrier API timeout".to_string(),
            ));
        }

        if state.reject_address {
            return Err(ShippingError::InvalidAddress(address.to_string()));
        }

        state.next_id += 1;
        let tracking_number = format!("TRACK-{:04}", state.next_id);
        state.shipments.insert(tracking_number.clone(), order_id);
        state.by_order.insert(order_id, tracking_number.clone());

        Ok(ShipmentReceipt { tracking_number })
    }

    async fn cancel_shipment(&self, tracking_number: &str) -> Result<(), ShippingError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_cancel {
            return Err(ShippingError::CarrierUnavailable(
                "cancellation endpoint unavailable".to_string(),
            ));
        }

        if let Some(order_id) = state.shipments.remove(tracking_number) {
            state.by_order.remove(&order_id);
        }
        Ok(())
    }
}
