//! Credit issuance and failure bookkeeping.

use crate::catalog::ProductCatalog;
use crate::error::{PurchaseError, StoreError};
use crate::ledger::{
    FailedTransaction, SuccessfulTransaction, TransactionStore, UserDirectory, UserId,
};
use crate::verify::Platform;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info};

/// Outcome of a committed credit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credited {
    /// User balance after the credit.
    pub balance: u64,
    /// The recorded transaction.
    pub transaction: SuccessfulTransaction,
}

/// Applies credits for verified purchases and records outcomes.
#[derive(Clone)]
pub struct CreditLedger {
    catalog: Arc<ProductCatalog>,
    store: Arc<dyn TransactionStore>,
    users: Arc<dyn UserDirectory>,
}

impl CreditLedger {
    /// Create a ledger over the given catalog and stores.
    #[must_use]
    pub fn new(
        catalog: Arc<ProductCatalog>,
        store: Arc<dyn TransactionStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        Self {
            catalog,
            store,
            users,
        }
    }

    /// Credit amount for `product_id`.
    ///
    /// # Errors
    ///
    /// Returns [`PurchaseError::UnknownProduct`] if the catalog has no entry.
    pub fn resolve(&self, product_id: &str) -> Result<u64, PurchaseError> {
        self.catalog
            .credits_for(product_id)
            .ok_or_else(|| PurchaseError::UnknownProduct {
                product_id: product_id.to_string(),
            })
    }

    /// Credit `user_id` for a verified purchase and record the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`PurchaseError::UnknownProduct`] for an unmapped product,
    /// [`PurchaseError::DuplicatePurchase`] if the store already holds the
    /// token, and [`PurchaseError::CreditingFailed`] for any other storage
    /// failure. On error no credit is applied and no record is written.
    pub async fn credit(
        &self,
        user_id: &UserId,
        platform: Platform,
        purchase_token: &str,
        product_id: &str,
    ) -> Result<Credited, PurchaseError> {
        let credit_amount = self.resolve(product_id)?;

        let user = self
            .users
            .find_user(user_id)
            .await
            .map_err(PurchaseError::CreditingFailed)?
            .ok_or_else(|| {
                PurchaseError::CreditingFailed(StoreError::UserNotFound(user_id.to_string()))
            })?;
        debug!(
            user_id = %user.id,
            balance = user.generate_credits,
            credit_amount,
            "Crediting user"
        );

        let transaction = SuccessfulTransaction {
            user_id: user.id,
            purchase_token: purchase_token.to_string(),
            product_id: product_id.to_string(),
            credit_amount,
            platform,
            date: Utc::now(),
        };
        let balance = self.store.commit_credit(transaction.clone()).await?;

        info!(
            user_id = %transaction.user_id,
            product_id,
            credit_amount,
            balance,
            "Successful transaction recorded"
        );
        Ok(Credited {
            balance,
            transaction,
        })
    }

    /// Append a failure record for a declined attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be written.
    pub async fn record_failure(
        &self,
        user_id: &UserId,
        purchase_token: &str,
        error: &PurchaseError,
    ) -> Result<(), StoreError> {
        self.store
            .record_failure(FailedTransaction {
                user_id: user_id.clone(),
                purchase_token: purchase_token.to_string(),
                error_message: error.to_string(),
                date: Utc::now(),
            })
            .await
    }
}
