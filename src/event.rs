//! Purchase lifecycle events.

use tokio::sync::broadcast;

/// Events emitted by the purchase orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PurchaseEvent {
    /// Credits were applied and recorded.
    Credited {
        /// Credited user.
        user_id: String,
        /// Purchased product.
        product_id: String,
        /// Credits granted.
        credit_amount: u64,
        /// Balance after crediting.
        balance: u64,
    },

    /// A purchase request was declined.
    Declined {
        /// Requesting user.
        user_id: String,
        /// Decline code.
        code: &'static str,
        /// Decline message.
        message: String,
    },

    /// A failure record could not be written.
    AuditWriteFailed {
        /// Requesting user.
        user_id: String,
        /// Store error message.
        message: String,
    },
}

/// Channel for receiving purchase events.
pub type PurchaseEventsChannel = broadcast::Receiver<PurchaseEvent>;

/// Sender for purchase events.
pub type PurchaseEventsSender = broadcast::Sender<PurchaseEvent>;

/// Create a new event channel pair.
#[must_use]
pub fn create_event_channel() -> (PurchaseEventsSender, PurchaseEventsChannel) {
    broadcast::channel(256)
}
