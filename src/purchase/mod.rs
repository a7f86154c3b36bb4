//! End-to-end purchase flow.
//!
//! ```text
//! PurchaseRequest
//!        │
//!        ▼
//!  platform known? ── no ──► InvalidPlatform
//!        │
//!        ▼
//!  product in catalog? ── no ──► UnknownProduct ─┐
//!        │                                       │
//!        ▼                                       │
//!  token already credited? ── yes ──► Duplicate ─┤
//!        │                                       │
//!        ▼                                       │
//!  store verification ── error ──► Verification ─┤
//!        │            ── invalid ─► InvalidPurchase
//!        ▼                                       │
//!  commit credit ── error ──► CreditingFailed ───┤
//!        │                                       ▼
//!        ▼                              FailedTransaction
//!  balance                               (logged on write failure)
//! ```


use crate::catalog::ProductCatalog;
use crate::error::PurchaseError;
use crate::event::{
    create_event_channel, PurchaseEvent, PurchaseEventsChannel, PurchaseEventsSender,
};
use crate::ledger::{
    CreditLedger, Credited, IdempotencyGuard, TokenStatus, TransactionStore, UserDirectory, UserId,
};
use crate::response::ApiResponse;
use crate::verify::{token_fingerprint, Platform, PurchaseVerifier, UnknownPlatform, Verdict};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Inbound purchase submission from an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseRequest {
    /// Store purchase token, or the App Store receipt.
    pub purchase_token: String,
    /// Store product identifier.
    pub product_id: String,
    /// `android` or `ios`, unvalidated.
    pub platform: String,
}

impl PurchaseRequest {
    /// Build a request.
    pub fn new(
        purchase_token: impl Into<String>,
        product_id: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            purchase_token: purchase_token.into(),
            product_id: product_id.into(),
            platform: platform.into(),
        }
    }
}

/// Balance reported after a successful purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditBalance {
    /// Credits now held by the user.
    pub generate_credits: u64,
}

/// Runs verification, replay defense, crediting and failure bookkeeping for
/// each purchase request.
pub struct PurchaseOrchestrator<V> {
    verifier: V,
    ledger: CreditLedger,
    guard: IdempotencyGuard,
    events: PurchaseEventsSender,
}

impl<V: PurchaseVerifier> PurchaseOrchestrator<V> {
    /// Create an orchestrator.
    #[must_use]
    pub fn new(
        verifier: V,
        catalog: Arc<ProductCatalog>,
        store: Arc<dyn TransactionStore>,
        users: Arc<dyn UserDirectory>,
    ) -> Self {
        let (events, _) = create_event_channel();
        Self {
            verifier,
            guard: IdempotencyGuard::new(Arc::clone(&store)),
            ledger: CreditLedger::new(catalog, store, users),
            events,
        }
    }

    /// Subscribe to purchase events.
    #[must_use]
    pub fn subscribe_events(&self) -> PurchaseEventsChannel {
        self.events.subscribe()
    }

    /// Process one purchase for `user_id`.
    ///
    /// Every decline after platform validation is also written as a failure
    /// record. A failure to write that record is logged and does not change
    /// the result.
    ///
    /// # Errors
    ///
    /// Returns the [`PurchaseError`] that declined the purchase.
    pub async fn purchase(
        &self,
        user_id: &UserId,
        request: &PurchaseRequest,
    ) -> Result<CreditBalance, PurchaseError> {
        let platform = match request.platform.parse::<Platform>() {
            Ok(platform) => platform,
            Err(UnknownPlatform(platform)) => {
                let error = PurchaseError::InvalidPlatform { platform };
                self.declined(user_id, &error);
                return Err(error);
            }
        };

        match self.process(user_id, platform, request).await {
            Ok(credited) => {
                let _ = self.events.send(PurchaseEvent::Credited {
                    user_id: user_id.to_string(),
                    product_id: credited.transaction.product_id.clone(),
                    credit_amount: credited.transaction.credit_amount,
                    balance: credited.balance,
                });
                Ok(CreditBalance {
                    generate_credits: credited.balance,
                })
            }
            Err(error) => {
                self.audit(user_id, request, &error).await;
                self.declined(user_id, &error);
                Err(error)
            }
        }
    }

    /// Process one purchase and render the outcome as a response envelope.
    pub async fn handle(
        &self,
        user_id: &UserId,
        request: &PurchaseRequest,
    ) -> ApiResponse<CreditBalance> {
        match self.purchase(user_id, request).await {
            Ok(balance) => ApiResponse::success("Credits purchased successfully.", balance, 200),
            Err(error) => ApiResponse::failure(error.to_string(), error.status_code()),
        }
    }

    async fn process(
        &self,
        user_id: &UserId,
        platform: Platform,
        request: &PurchaseRequest,
    ) -> Result<Credited, PurchaseError> {
        let token = request.purchase_token.as_str();
        let product_id = request.product_id.as_str();
        let fingerprint = token_fingerprint(token);

        self.ledger.resolve(product_id)?;

        if let TokenStatus::Consumed(existing) = self.guard.check(token).await? {
            info!(
                %user_id,
                token = %fingerprint,
                credited_user = %existing.user_id,
                "Purchase token has already been used"
            );
            return Err(PurchaseError::DuplicatePurchase);
        }

        match self.verifier.verify(platform, token, product_id).await? {
            Verdict::Valid => {
                info!(%user_id, %platform, product_id, token = %fingerprint, "Purchase verified");
            }
            Verdict::Invalid { reason } => {
                info!(
                    %user_id,
                    %platform,
                    product_id,
                    token = %fingerprint,
                    %reason,
                    "Purchase not valid"
                );
                return Err(PurchaseError::InvalidPurchase { reason });
            }
        }

        self.ledger
            .credit(user_id, platform, token, product_id)
            .await
    }

    async fn audit(&self, user_id: &UserId, request: &PurchaseRequest, error: &PurchaseError) {
        if let Err(audit_error) = self
            .ledger
            .record_failure(user_id, &request.purchase_token, error)
            .await
        {
            warn!(
                %user_id,
                token = %token_fingerprint(&request.purchase_token),
                decline = error.code(),
                "Failed to record failed transaction: {audit_error}"
            );
            let _ = self.events.send(PurchaseEvent::AuditWriteFailed {
                user_id: user_id.to_string(),
                message: audit_error.to_string(),
            });
        }
    }

    fn declined(&self, user_id: &UserId, error: &PurchaseError) {
        info!(%user_id, decline = error.code(), "Purchase declined: {error}");
        let _ = self.events.send(PurchaseEvent::Declined {
            user_id: user_id.to_string(),
            code: error.code(),
            message: error.to_string(),
        });
    }
}
