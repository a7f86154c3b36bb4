//! In-memory transaction store and user directory.
//!
//! All tables live behind one mutex, so `commit_credit` checks the token,
//! bumps the balance and inserts the record atomically.

use crate::error::StoreError;
use crate::ledger::{
    FailedTransaction, SuccessfulTransaction, TransactionStore, User, UserDirectory, UserId,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct Tables {
    users: HashMap<UserId, User>,
    /// Keyed by purchase token; the map key is the uniqueness constraint.
    successful: HashMap<String, SuccessfulTransaction>,
    failed: Vec<FailedTransaction>,
}

/// Process-local implementation of [`TransactionStore`] and [`UserDirectory`].
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a user.
    pub fn insert_user(&self, user: User) {
        self.inner.lock().users.insert(user.id.clone(), user);
    }

    /// Current state of a user.
    #[must_use]
    pub fn user(&self, id: &UserId) -> Option<User> {
        self.inner.lock().users.get(id).cloned()
    }

    /// All successful transactions.
    #[must_use]
    pub fn successful_transactions(&self) -> Vec<SuccessfulTransaction> {
        self.inner.lock().successful.values().cloned().collect()
    }

    /// All failure records in insertion order.
    #[must_use]
    pub fn failed_transactions(&self) -> Vec<FailedTransaction> {
        self.inner.lock().failed.clone()
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn find_successful(
        &self,
        purchase_token: &str,
    ) -> Result<Option<SuccessfulTransaction>, StoreError> {
        Ok(self.inner.lock().successful.get(purchase_token).cloned())
    }

    async fn commit_credit(&self, transaction: SuccessfulTransaction) -> Result<u64, StoreError> {
        let mut tables = self.inner.lock();
        if tables.successful.contains_key(&transaction.purchase_token) {
            return Err(StoreError::DuplicateToken);
        }

        let user = tables
            .users
            .get_mut(&transaction.user_id)
            .ok_or_else(|| StoreError::UserNotFound(transaction.user_id.to_string()))?;
        let balance = user
            .generate_credits
            .checked_add(transaction.credit_amount)
            .ok_or_else(|| StoreError::Backend("credit balance overflow".to_string()))?;
        user.generate_credits = balance;

        tables
            .successful
            .insert(transaction.purchase_token.clone(), transaction);
        Ok(balance)
    }

    async fn record_failure(&self, failure: FailedTransaction) -> Result<(), StoreError> {
        self.inner.lock().failed.push(failure);
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn find_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.user(id))
    }
}
