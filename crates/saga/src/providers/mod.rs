//! Step providers and the gateway that fronts them.
//!
//! Each provider is a trait abstracting one external service, plus an
//! in-memory implementation with failure knobs for tests and local runs.

pub mod gateway;
pub mod inventory;
pub mod notification;
pub mod payment;
pub mod shipping;

pub use gateway::StepGateway;
pub use inventory::{
    InMemoryInventoryProvider, InventoryError, InventoryProvider, ReservationReceipt,
};
pub use notification::{
    InMemoryNotificationProvider, NotificationError, NotificationProvider, NoticeReceipt,
};
pub use payment::{ChargeReceipt, InMemoryPaymentProvider, PaymentError, PaymentProvider};
pub use shipping::{InMemoryShippingProvider, ShipmentReceipt, ShippingError, ShippingProvider};
