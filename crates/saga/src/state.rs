//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order's saga in its lifecycle.
///
/// Transitions are monotonic:
/// ```text
/// Pending ──► Processing ──┬──► Completed
///                          └──► Failed
/// ```
/// Terminal states are final; a failed saga is never resumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Saga has been submitted but the first step has not started.
    #[default]
    Pending,

    /// Forward steps are being executed.
    Processing,

    /// All steps completed successfully (terminal state).
    Completed,

    /// A step failed non-retryably and compensation ran (terminal state).
    Failed,
}

impl OrderStatus {
    /// Returns true if the saga can begin running.
    pub fn can_start(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Failed)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Processing => "PROCESSING",
            OrderStatus::Completed => "COMPLETED",
            OrderStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
