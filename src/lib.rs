//! # purchase-credits
//!
//! Verifies in-app purchases with the store that issued them and turns each
//! verified purchase into a one-time credit on the purchasing user's balance.
//!
//! ## Flow
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    PurchaseOrchestrator                      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ProductCatalog   product id ──► credit amount               │
//! │  IdempotencyGuard token already credited?                    │
//! │  StoreVerifier    Google Play publisher API | verifyReceipt  │
//! │  CreditLedger     balance + SuccessfulTransaction, atomic    │
//! ├──────────────────────────────────────────────────────────────┤
//! │  TransactionStore / UserDirectory (MemoryStore reference)    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A purchase token is credited at most once. The idempotency guard avoids
//! store round trips for known tokens; the transaction store's uniqueness
//! constraint on the token is what actually prevents double crediting when
//! duplicate submissions race.
//!
//! ## Example
//!
//! ```no_run
//! use purchase_credits::{
//!     MemoryStore, ProductCatalog, PurchaseOrchestrator, PurchaseRequest, ServiceConfig,
//!     StoreVerifier, User, UserId,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> purchase_credits::Result<()> {
//! let config = ServiceConfig::from_file(std::path::Path::new("config.toml"))?;
//! let catalog = Arc::new(ProductCatalog::from_config(&config.products)?);
//! let store = MemoryStore::new();
//! store.insert_user(User::new("64f0c2", 0));
//!
//! let orchestrator = PurchaseOrchestrator::new(
//!     StoreVerifier::from_config(&config)?,
//!     catalog,
//!     Arc::new(store.clone()),
//!     Arc::new(store),
//! );
//! let response = orchestrator
//!     .handle(
//!         &UserId::new("64f0c2"),
//!         &PurchaseRequest::new("opaque-token", "credits_100", "android"),
//!     )
//!     .await;
//! println!("{}", response.message);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod event;
pub mod ledger;
pub mod purchase;
pub mod response;
pub mod verify;

pub use catalog::ProductCatalog;
pub use config::{AndroidConfig, IosConfig, ServiceConfig};
pub use error::{Error, PurchaseError, Result, StoreError, VerificationError};
pub use event::{create_event_channel, PurchaseEvent, PurchaseEventsChannel};
pub use ledger::{
    CreditLedger, FailedTransaction, IdempotencyGuard, MemoryStore, SuccessfulTransaction,
    TransactionStore, User, UserDirectory, UserId,
};
pub use purchase::{CreditBalance, PurchaseOrchestrator, PurchaseRequest};
pub use response::ApiResponse;
pub use verify::{Platform, PurchaseVerifier, StoreVerifier, Verdict};
