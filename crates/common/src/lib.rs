//! Shared types for the order saga system.
//!
//! This crate provides the identifiers and value objects that every other
//! crate in the workspace agrees on: order IDs, money amounts, and the
//! immutable [`OrderRequest`] that a caller submits for fulfillment.

pub mod order;
pub mod types;

pub use order::{CustomerId, Money, OrderItem, OrderRequest, OrderValidationError, ProductId};
pub use types::OrderId;
