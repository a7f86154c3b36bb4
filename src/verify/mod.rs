//! Store-side purchase verification.
//!
//! A purchase is verified by asking the store that issued it:
//!
//! ```text
//! verify(platform, token, product)
//!        │
//!   ┌────┴─────┐
//!   │          │
//! android     ios
//!   │          │
//!   ▼          ▼
//! OAuth token  POST verifyReceipt (production)
//!   │          │
//!   ▼          ├── status 21007 ──► POST verifyReceipt (sandbox)
//! GET purchase │
//!   │          ▼
//!   ▼        status 0 + in_app contains product?
//! purchaseState == 0?
//! ```
//!
//! A negative answer from the store is a [`Verdict::Invalid`]; failing to get
//! an answer at all is a [`VerificationError`].

mod android;
mod ios;
mod token;

pub use android::AndroidVerifier;
pub use ios::IosVerifier;
pub use token::{AccessTokenSource, ServiceAccountTokenSource};

#[cfg(test)]
pub use token::MockAccessTokenSource;

use crate::config::ServiceConfig;
use crate::error::VerificationError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Store platform a purchase was made on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    /// Google Play.
    Android,
    /// Apple App Store.
    Ios,
}

impl Platform {
    /// Lowercase wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Android => "android",
            Self::Ios => "ios",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Platform string that is neither `android` nor `ios`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "android" => Ok(Self::Android),
            "ios" => Ok(Self::Ios),
            other => Err(UnknownPlatform(other.to_string())),
        }
    }
}

/// The store's answer about a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// The store confirms the purchase.
    Valid,
    /// The store does not confirm the purchase.
    Invalid {
        /// Why the purchase was not confirmed.
        reason: String,
    },
}

impl Verdict {
    /// Negative verdict with a reason.
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::Invalid {
            reason: reason.into(),
        }
    }

    /// Whether the store confirmed the purchase.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }
}

/// Capability to confirm a purchase with its store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PurchaseVerifier: Send + Sync {
    /// Ask the platform's store whether `purchase_token` is a completed
    /// purchase of `product_id`.
    ///
    /// # Errors
    ///
    /// Returns an error when the store cannot be reached or its response
    /// cannot be interpreted.
    async fn verify(
        &self,
        platform: Platform,
        purchase_token: &str,
        product_id: &str,
    ) -> Result<Verdict, VerificationError>;
}

/// Verifier that dispatches to the Android or iOS store by platform.
pub struct StoreVerifier {
    android: AndroidVerifier,
    ios: IosVerifier,
}

impl StoreVerifier {
    /// Combine the two platform verifiers.
    #[must_use]
    pub fn new(android: AndroidVerifier, ios: IosVerifier) -> Self {
        Self { android, ios }
    }

    /// Build both verifiers from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint URL is invalid or an HTTP client
    /// cannot be built.
    pub fn from_config(config: &ServiceConfig) -> crate::Result<Self> {
        Ok(Self {
            android: AndroidVerifier::from_config(&config.android)?,
            ios: IosVerifier::from_config(&config.ios)?,
        })
    }
}

#[async_trait]
impl PurchaseVerifier for StoreVerifier {
    async fn verify(
        &self,
        platform: Platform,
        purchase_token: &str,
        product_id: &str,
    ) -> Result<Verdict, VerificationError> {
        match platform {
            Platform::Android => self.android.verify(product_id, purchase_token).await,
            Platform::Ios => self.ios.verify(purchase_token, product_id).await,
        }
    }
}

/// Short, stable identifier for a purchase token or receipt in logs.
#[must_use]
pub fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}
