//! Transaction records, storage ports and credit issuance.
//!
//! The store holding successful transactions is the only shared mutable
//! resource. It must reject a second successful transaction for the same
//! purchase token; [`IdempotencyGuard`] only spares a store round trip to
//! the platform for tokens already known to be consumed.

mod credit;
mod guard;
mod memory;

pub use credit::{CreditLedger, Credited};
pub use guard::{IdempotencyGuard, TokenStatus};
pub use memory::MemoryStore;

use crate::error::StoreError;
use crate::verify::Platform;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap a user identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// The part of a user account this crate reads and updates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// User identity.
    pub id: UserId,
    /// Current credit balance.
    pub generate_credits: u64,
}

impl User {
    /// User with the given starting balance.
    pub fn new(id: impl Into<UserId>, generate_credits: u64) -> Self {
        Self {
            id: id.into(),
            generate_credits,
        }
    }
}

/// A purchase token that was verified and credited.
///
/// Exactly one may exist per purchase token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuccessfulTransaction {
    /// Credited user.
    pub user_id: UserId,
    /// Consumed purchase token.
    pub purchase_token: String,
    /// Purchased product.
    pub product_id: String,
    /// Credits granted.
    pub credit_amount: u64,
    /// Store the purchase was made on.
    pub platform: Platform,
    /// When the credit was recorded.
    pub date: DateTime<Utc>,
}

/// An audit record of a declined purchase attempt.
///
/// Append-only; one per attempt, never deduplicated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedTransaction {
    /// Requesting user.
    pub user_id: UserId,
    /// Purchase token as submitted.
    pub purchase_token: String,
    /// Why the attempt failed.
    pub error_message: String,
    /// When the attempt failed.
    pub date: DateTime<Utc>,
}

/// Storage of successful and failed transactions.
#[async_trait]
pub trait TransactionStore: Send + Sync {
    /// Find the successful transaction that consumed `purchase_token`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be queried.
    async fn find_successful(
        &self,
        purchase_token: &str,
    ) -> Result<Option<SuccessfulTransaction>, StoreError>;

    /// Add `transaction.credit_amount` to the user's balance and insert
    /// `transaction`, returning the new balance.
    ///
    /// Both writes happen as one unit: either the balance changes and the
    /// record exists, or neither.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateToken`] if a successful transaction
    /// already exists for the token, [`StoreError::UserNotFound`] if the user
    /// is unknown, or [`StoreError::Backend`] on storage failure.
    async fn commit_credit(&self, transaction: SuccessfulTransaction) -> Result<u64, StoreError>;

    /// Append a failure record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    async fn record_failure(&self, failure: FailedTransaction) -> Result<(), StoreError>;
}

/// Lookup of users by authenticated identity.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fetch the user with `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be queried.
    async fn find_user(&self, id: &UserId) -> Result<Option<User>, StoreError>;
}
