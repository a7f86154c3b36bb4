//! Error types for purchase-credits.

use thiserror::Error;

/// Result type alias for crate-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-level error for construction and configuration failures.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be parsed or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// Product catalog failed validation.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// HTTP client could not be built.
    #[error("http client error: {0}")]
    Http(#[from] reqwest::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure while talking to a store's verification or token endpoint.
///
/// Distinct from a negative verdict: these mean the purchase could not be
/// verified at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    /// Network transport failed before a response arrived.
    #[error("store transport failed: {message}")]
    Transport {
        /// Transport error description.
        message: String,
    },

    /// The upstream call exceeded its timeout.
    #[error("store request timed out: {message}")]
    Timeout {
        /// Timeout description.
        message: String,
    },

    /// The store answered but could not service the request.
    #[error("store returned status {status}: {message}")]
    Upstream {
        /// HTTP status or store status code.
        status: u32,
        /// Upstream message.
        message: String,
    },

    /// The store response could not be decoded.
    #[error("store response decode failed: {message}")]
    Decode {
        /// Decoding error description.
        message: String,
    },

    /// A bearer credential could not be obtained.
    #[error("credential acquisition failed: {message}")]
    Credential {
        /// Credential error description.
        message: String,
    },

    /// The verifier is missing a required setting.
    #[error("verifier misconfigured: {message}")]
    Configuration {
        /// Missing or invalid setting.
        message: String,
    },
}

impl VerificationError {
    /// Map a reqwest failure, keeping timeouts distinguishable.
    #[must_use]
    pub fn from_transport(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout {
                message: error.to_string(),
            }
        } else if error.is_decode() {
            Self::Decode {
                message: error.to_string(),
            }
        } else {
            Self::Transport {
                message: error.to_string(),
            }
        }
    }

    /// Return whether resubmitting the purchase later may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout { .. } | Self::Upstream { .. }
        )
    }
}

/// Failure reported by a transaction or user store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A successful transaction already exists for this purchase token.
    #[error("purchase token already recorded")]
    DuplicateToken,

    /// The crediting user does not exist.
    #[error("user {0} not found")]
    UserNotFound(String),

    /// The backing store failed.
    #[error("store failure: {0}")]
    Backend(String),
}

/// Reason a purchase request was declined.
///
/// Every variant is a normal business outcome returned to the caller; none
/// is fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PurchaseError {
    /// Platform is neither `android` nor `ios`.
    #[error("Invalid platform specified: {platform}")]
    InvalidPlatform {
        /// Platform value as submitted.
        platform: String,
    },

    /// The store could not be asked, or answered unintelligibly.
    #[error("Purchase could not be verified: {0}")]
    Verification(#[from] VerificationError),

    /// The store says this purchase is not valid.
    #[error("Invalid purchase token: {reason}")]
    InvalidPurchase {
        /// Why the store rejected the purchase.
        reason: String,
    },

    /// No credit mapping exists for the product.
    #[error("Invalid product ID: {product_id}")]
    UnknownProduct {
        /// Product identifier as submitted.
        product_id: String,
    },

    /// The purchase token has already been consumed.
    #[error("Purchase token has already been used.")]
    DuplicatePurchase,

    /// Credit could not be applied or recorded.
    #[error("Crediting failed: {0}")]
    CreditingFailed(StoreError),
}

impl PurchaseError {
    /// Stable machine-readable code for this decline.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidPlatform { .. } => "invalid_platform",
            Self::Verification(_) => "verification_error",
            Self::InvalidPurchase { .. } => "invalid_purchase",
            Self::UnknownProduct { .. } => "unknown_product",
            Self::DuplicatePurchase => "duplicate_purchase",
            Self::CreditingFailed(_) => "crediting_failed",
        }
    }

    /// HTTP status used when this decline is rendered as a response.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        400
    }
}

impl From<StoreError> for PurchaseError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::DuplicateToken => Self::DuplicatePurchase,
            other => Self::CreditingFailed(other),
        }
    }
}
