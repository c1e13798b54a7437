//! Forward step identifiers and their canonical order.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A forward step of the order fulfillment saga.
///
/// Steps always execute in [`Step::CANONICAL_ORDER`]; the list of completed
/// steps on a saga instance is by construction a prefix of it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Step {
    /// Charge the customer for the order total.
    Payment,
    /// Reserve stock for the order items.
    Inventory,
    /// Create a shipment to the order's address.
    Shipping,
    /// Send the order confirmation to the customer.
    Notification,
}

/// Error returned when parsing an unknown step name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown saga step: {0}")]
pub struct ParseStepError(pub String);

impl Step {
    /// The order in which forward steps execute.
    pub const CANONICAL_ORDER: [Step; 4] = [
        Step::Payment,
        Step::Inventory,
        Step::Shipping,
        Step::Notification,
    ];

    /// Returns the step name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Payment => "PAYMENT",
            Step::Inventory => "INVENTORY",
            Step::Shipping => "SHIPPING",
            Step::Notification => "NOTIFICATION",
        }
    }

    /// Returns true if this step's artifact can be compensated.
    ///
    /// A confirmation notice cannot be unsent; the cancellation notice at
    /// the end of compensation covers it instead.
    pub fn is_compensatable(&self) -> bool {
        !matches!(self, Step::Notification)
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Step {
    type Err = ParseStepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PAYMENT" => Ok(Step::Payment),
            "INVENTORY" => Ok(Step::Inventory),
            "SHIPPING" => Ok(Step::Shipping),
            "NOTIFICATION" => Ok(Step::Notification),
            other => Err(ParseStepError(other.to_string())),
        }
    }
}
