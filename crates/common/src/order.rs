//! Value objects for order submissions.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Identifier of the customer placing an order.
///
/// Opaque to the saga system; it is passed through to the payment and
/// notification providers unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(String);

impl CustomerId {
    /// Creates a customer ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the customer ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CustomerId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for CustomerId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Product identifier (SKU).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Creates a new product ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the product ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProductId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Money amount represented in cents to avoid floating point issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Money {
    /// Amount in cents (e.g., 1000 = $10.00)
    cents: i64,
}

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self { cents }
    }

    /// Creates a new Money amount from a dollar value.
    pub fn from_dollars(dollars: i64) -> Self {
        Self {
            cents: dollars * 100,
        }
    }

    /// Returns zero money.
    pub fn zero() -> Self {
        Self { cents: 0 }
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.cents
    }

    /// Returns the dollar portion (whole number).
    pub fn dollars(&self) -> i64 {
        self.cents / 100
    }

    /// Returns the cents portion (remainder after dollars).
    pub fn cents_part(&self) -> i64 {
        self.cents.abs() % 100
    }

    /// Returns true if the amount is zero.
    pub fn is_zero(&self) -> bool {
        self.cents == 0
    }

    /// Returns true if the amount is negative.
    pub fn is_negative(&self) -> bool {
        self.cents < 0
    }

    /// Multiplies by a quantity.
    pub fn multiply(&self, quantity: u32) -> Money {
        Money {
            cents: self.cents * quantity as i64,
        }
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.cents < 0 {
            write!(f, "-${}.{:02}", self.dollars().abs(), self.cents_part())
        } else {
            write!(f, "${}.{:02}", self.dollars(), self.cents_part())
        }
    }
}

impl std::ops::Add for Money {
    type Output = Money;

    fn add(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents + rhs.cents,
        }
    }
}

impl std::ops::Sub for Money {
    type Output = Money;

    fn sub(self, rhs: Self) -> Self::Output {
        Money {
            cents: self.cents - rhs.cents,
        }
    }
}

impl std::ops::AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.cents += rhs.cents;
    }
}

/// A line item in an order request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// The product being ordered.
    pub product_id: ProductId,

    /// Quantity ordered, must be positive.
    pub quantity: u32,

    /// Price per unit.
    pub unit_price: Money,
}

impl OrderItem {
    /// Creates a new order item.
    pub fn new(product_id: impl Into<ProductId>, quantity: u32, unit_price: Money) -> Self {
        Self {
            product_id: product_id.into(),
            quantity,
            unit_price,
        }
    }

    /// Returns the total price for this item (quantity * unit_price).
    pub fn total_price(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Validation errors for an order request.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OrderValidationError {
    /// The request contains no items.
    #[error("order has no items")]
    NoItems,

    /// An item has a zero quantity.
    #[error("item {product_id} has invalid quantity 0")]
    InvalidQuantity { product_id: ProductId },

    /// An item has a negative unit price.
    #[error("item {product_id} has negative unit price {price}")]
    NegativePrice { product_id: ProductId, price: Money },

    /// The order total is negative.
    #[error("order total {0} is negative")]
    NegativeTotal(Money),

    /// The shipping address is empty.
    #[error("shipping address is empty")]
    EmptyShippingAddress,
}

/// An order submitted for fulfillment. Immutable once submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRequest {
    /// The customer placing the order.
    pub customer_id: CustomerId,

    /// Ordered sequence of line items.
    pub items: Vec<OrderItem>,

    /// Total amount to charge.
    pub total_amount: Money,

    /// Destination address for the shipment.
    pub shipping_address: String,
}

impl OrderRequest {
    /// Creates a new order request.
    pub fn new(
        customer_id: impl Into<CustomerId>,
        items: Vec<OrderItem>,
        total_amount: Money,
        shipping_address: impl Into<String>,
    ) -> Self {
        Self {
            customer_id: customer_id.into(),
            items,
            total_amount,
            shipping_address: shipping_address.into(),
        }
    }

    /// Checks the structural constraints on a request.
    ///
    /// Every item must have a positive quantity and a non-negative unit
    /// price, the total must be non-negative, and the shipping address
    /// must be present.
    pub fn validate(&self) -> Result<(), OrderValidationError> {
        if self.items.is_empty() {
            return Err(OrderValidationError::NoItems);
        }
        for item in &self.items {
            if item.quantity == 0 {
                return Err(OrderValidationError::InvalidQuantity {
                    product_id: item.product_id.clone(),
                });
            }
            if item.unit_price.is_negative() {
                return Err(OrderValidationError::NegativePrice {
                    product_id: item.product_id.clone(),
                    price: item.unit_price,
                });
            }
        }
        if self.total_amount.is_negative() {
            return Err(OrderValidationError::NegativeTotal(self.total_amount));
        }
        if self.shipping_address.trim().is_empty() {
            return Err(OrderValidationError::EmptyShippingAddress);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> OrderRequest {
        OrderRequest::new(
            "C1",
            vec![OrderItem::new("P1", 2, Money::from_cents(500))],
            Money::from_cents(1000),
            "Addr",
        )
    }

    #[test]
    fn test_money_from_cents() {
        let money = Money::from_cents(1234);
        assert_eq!(money.cents(), 1234);
        assert_eq!(money.dollars(), 12);
        assert_eq!(money.cents_part(), 34);
    }

    #[test]
    fn test_money_display() {
        assert_eq!(Money::from_cents(1234).to_string(), "$12.34");
        assert_eq!(Money::from_cents(5).to_string(), "$0.05");
        assert_eq!(Money::from_cents(-1234).to_string(), "-$12.34");
    }

    #[test]
    fn test_money_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!(a.multiply(3).cents(), 3000);
    }

    #[test]
    fn test_order_item_total_price() {
        let item = OrderItem::new("SKU-001", 3, Money::from_cents(1000));
        assert_eq!(item.total_price().cents(), 3000);
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn test_empty_items_rejected() {
        let mut req = valid_request();
        req.items.clear();
        assert_eq!(req.validate(), Err(OrderValidationError::NoItems));
    }

    #[test]
    fn test_zero_quantity_rejected() {
        let mut req = valid_request();
        req.items[0].quantity = 0;
        assert!(matches!(
            req.validate(),
            Err(OrderValidationError::InvalidQuantity { .. })
        ));
    }

    #[test]
    fn test_negative_price_rejected() {
        let mut req = valid_request();
        req.items[0].unit_price = Money::from_cents(-1);
        assert!(matches!(
            req.validate(),
            Err(OrderValidationError::NegativePrice { .. })
        ));
    }

    #[test]
    fn test_empty_address_rejected() {
        let mut req = valid_request();
        req.shipping_address = "  ".to_string();
        assert_eq!(
            req.validate(),
            Err(OrderValidationError::EmptyShippingAddress)
        );
    }

    #[test]
    fn test_request_serialization_roundtrip() {
        let req = valid_request();
        let json = serde_json::to_string(&req).unwrap();
        let deserialized: OrderRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(req, deserialized);
    }
}
