//! Notification provider trait and in-memory implementation.
//!
//! Confirmations cannot be unsent, so this step has no compensating
//! action. It still participates in compensation through the best-effort
//! cancellation notice sent at the end of every unwind.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{CustomerId, OrderId};
use thiserror::Error;

/// Raw errors a notification provider can return.
#[derive(Debug, Clone, Error)]
pub enum NotificationError {
    /// The customer has no reachable contact channel.
    #[error("undeliverable: {0}")]
    Undeliverable(String),

    /// The notification service could not be reached.
    #[error("notifier unavailable: {0}")]
    Unavailable(String),
}

/// Receipt for a successfully sent notice.
#[derive(Debug, Clone)]
pub struct NoticeReceipt {
    /// The notice ID assigned by the notification provider.
    pub notice_id: String,
}

/// Trait for customer notifications.
///
/// Both notices are idempotent per order: re-sending returns the original
/// receipt without delivering a duplicate message.
#[async_trait]
pub trait NotificationProvider: Send + Sync {
    /// Sends the order confirmation.
    async fn send_confirmation(
        &self,
        order_id: OrderId,
        customer_id: &CustomerId,
    ) -> Result<NoticeReceipt, NotificationError>;

    /// Sends the order cancellation notice.
    async fn send_cancellation(
        &self,
        order_id: OrderId,
        customer_id: &CustomerId,
    ) -> Result<NoticeReceipt, NotificationError>;
}

#[derive(Debug, Default)]
struct InMemoryNotificationState {
    confirmations: HashMap<OrderId, String>,
    cancellations: HashMap<OrderId, String>,
    next_id: u32,
    fail_on_confirmation: bool,
    fail_on_cancellation: bool,
    transient_failures: u32,
}

/// In-memory notification provider for tests and the demo server.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotificationProvider {
    state: Arc<RwLock<InMemoryNotificationState>>,
}

impl InMemoryNotificationProvider {
    /// Creates a new in-memory notification provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures confirmations to fail as undeliverable.
    pub fn set_fail_on_confirmation(&self, fail: bool) {
        self.state.write().unwrap().fail_on_confirmation = fail;
    }

    /// Configures cancellation notices to fail.
    pub fn set_fail_on_cancellation(&self, fail: bool) {
        self.state.write().unwrap().fail_on_cancellation = fail;
    }

    /// Makes the next `count` confirmation calls fail transiently.
    pub fn set_transient_failures(&self, count: u32) {
        self.state.write().unwrap().transient_failures = count;
    }

    /// Returns the number of confirmations sent.
    pub fn confirmation_count(&self) -> usize {
        self.state.read().unwrap().confirmations.len()
    }

    /// Returns the number of cancellation notices sent.
    pub fn cancellation_count(&self) -> usize {
        self.state.read().unwrap().cancellations.len()
    }
}

#[async_trait]
impl NotificationProvider for InMemoryNotificationProvider {
    async fn send_confirmation(
        &self,
        order_id: OrderId,
        _customer_id: &CustomerId,
    ) -> Result<NoticeReceipt, NotificationError> {
        let mut state = self.state.write().unwrap();

        if let Some(notice_id) = state.confirmations.get(&order_id) {
            return Ok(NoticeReceipt {
                notice_id: notice_id.clone(),
            });
        }

        if state.transient_failures > 0 {
            state.transient_failures -= 1;
            return Err(NotificationError::Unavailable(
                "notifier timeout".to_string(),
            ));
        }

        if state.fail_on_confirmation {
            return Err(NotificationError::Undeliverable(
                "no contact channel".to_string(),
            ));
        }

        state.next_id += 1;
        let notice_id = format!("NOTICE-{:04}", state.next_id);
        state.confirmations.insert(order_id, notice_id.clone());

        Ok(NoticeReceipt { notice_id })
    }

    async fn send_cancellation(
        &self,
        order_id: OrderId,
        _customer_id: &CustomerId,
    ) -> Result<NoticeReceipt, NotificationError> {
        let mut state = self.state.write().unwrap();

        if let Some(notice_id) = state.cancellations.get(&order_id) {
            return Ok(NoticeReceipt {
                notice_id: notice_id.clone(),
            });
        }

        if state.fail_on_cancellation {
            return Err(NotificationError::Unavailable(
                "notifier unavailable".to_string(),
            ));
        }

        state.next_id += 1;
        let notice_id = format!("NOTICE-{:04}", state.next_id);
        state.cancellations.insert(order_id, notice_id.clone());

        Ok(NoticeReceipt { notice_id })
    }
}
