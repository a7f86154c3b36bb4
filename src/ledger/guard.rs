//! Replay check for purchase tokens.

use crate::error::StoreError;
use crate::ledger::{SuccessfulTransaction, TransactionStore};
use crate::verify::token_fingerprint;
use std::sync::Arc;
use tracing::debug;

/// Whether a purchase token has already been credited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenStatus {
    /// No successful transaction uses the token.
    Unconsumed,
    /// The token was already credited by this transaction.
    Consumed(Box<SuccessfulTransaction>),
}

/// Looks up whether a purchase token was already consumed.
///
/// The lookup and the later insert are separate operations, so two
/// concurrent requests for one token can both see [`TokenStatus::Unconsumed`].
/// The store's uniqueness constraint decides which one wins.
#[derive(Clone)]
pub struct IdempotencyGuard {
    store: Arc<dyn TransactionStore>,
}

impl IdempotencyGuard {
    /// Create a guard over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn TransactionStore>) -> Self {
        Self { store }
    }

    /// Check whether `purchase_token` has been consumed.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    pub async fn check(&self, purchase_token: &str) -> Result<TokenStatus, StoreError> {
        let status = match self.store.find_successful(purchase_token).await? {
            Some(existing) => TokenStatus::Consumed(Box::new(existing)),
            None => TokenStatus::Unconsumed,
        };
        debug!(
            token = %token_fingerprint(purchase_token),
            consumed = matches!(status, TokenStatus::Consumed(_)),
            "Idempotency check"
        );
        Ok(status)
    }
}
