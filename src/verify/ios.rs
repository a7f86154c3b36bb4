//! App Store receipt verification.

use crate::config::IosConfig;
use crate::error::{Error, Result, VerificationError};
use crate::verify::{token_fingerprint, Verdict};
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Receipt verified successfully.
const STATUS_OK: i64 = 0;
/// Sandbox receipt sent to the production endpoint.
const STATUS_SANDBOX_RECEIPT: i64 = 21007;
/// Receipt server temporarily unavailable.
const STATUS_SERVER_UNAVAILABLE: i64 = 21005;
/// Internal data access errors.
const STATUS_INTERNAL_ERRORS: std::ops::RangeInclusive<i64> = 21100..=21199;

#[derive(Debug, Serialize)]
struct VerifyReceiptRequest<'a> {
    #[serde(rename = "receipt-data")]
    receipt_data: &'a str,
    password: &'a str,
    #[serde(rename = "exclude-old-transactions")]
    exclude_old_transactions: bool,
}

#[derive(Debug, Deserialize)]
struct VerifyReceiptResponse {
    status: i64,
    #[serde(default)]
    environment: Option<String>,
    #[serde(default, rename = "is-retryable")]
    is_retryable: Option<bool>,
    #[serde(default)]
    receipt: Option<ReceiptDto>,
}

#[derive(Debug, Deserialize)]
struct ReceiptDto {
    #[serde(default)]
    in_app: Vec<InAppPurchaseDto>,
}

#[derive(Debug, Deserialize)]
struct InAppPurchaseDto {
    product_id: String,
}

/// Verifies App Store receipts with the `verifyReceipt` endpoints.
pub struct IosVerifier {
    client: Client,
    production_url: Url,
    sandbox_url: Url,
    shared_secret: SecretString,
    exclude_old_transactions: bool,
}

impl IosVerifier {
    /// Create a verifier from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if an endpoint is not a valid URL or the HTTP client
    /// cannot be built.
    pub fn from_config(config: &IosConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            production_url: parse_endpoint(&config.production_url)?,
            sandbox_url: parse_endpoint(&config.sandbox_url)?,
            shared_secret: SecretString::from(config.shared_secret.clone()),
            exclude_old_transactions: config.exclude_old_transactions,
        })
    }

    /// Verify `receipt` with Apple and check it contains `product_id`.
    ///
    /// The production endpoint is tried first; a sandbox receipt is retried
    /// once against the sandbox endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if a request fails or times out, the response cannot
    /// be decoded, or Apple reports a transient failure.
    pub async fn verify(
        &self,
        receipt: &str,
        product_id: &str,
    ) -> std::result::Result<Verdict, VerificationError> {
        if self.shared_secret.expose_secret().is_empty() {
            return Err(VerificationError::Configuration {
                message: "apple shared secret is not set".to_string(),
            });
        }

        let fingerprint = token_fingerprint(receipt);
        let request = VerifyReceiptRequest {
            receipt_data: receipt,
            password: self.shared_secret.expose_secret(),
            exclude_old_transactions: self.exclude_old_transactions,
        };

        debug!(product_id, receipt = %fingerprint, "Verifying App Store receipt");
        let mut response = self.submit(&self.production_url, &request).await?;

        if response.status == STATUS_SANDBOX_RECEIPT {
            info!(receipt = %fingerprint, "Sandbox receipt, retrying against sandbox");
            response = self.submit(&self.sandbox_url, &request).await?;
        }

        let verdict = evaluate_receipt(&response, product_id)?;
        info!(
            product_id,
            receipt = %fingerprint,
            status = response.status,
            environment = response.environment.as_deref().unwrap_or("unknown"),
            valid = verdict.is_valid(),
            "App Store verification complete"
        );
        Ok(verdict)
    }

    async fn submit(
        &self,
        url: &Url,
        request: &VerifyReceiptRequest<'_>,
    ) -> std::result::Result<VerifyReceiptResponse, VerificationError> {
        let response = self
            .client
            .post(url.clone())
            .json(request)
            .send()
            .await
            .map_err(|e| VerificationError::from_transport(&e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| VerificationError::from_transport(&e))?;

        if !status.is_success() {
            warn!(%status, %url, "verifyReceipt returned HTTP error");
            return Err(VerificationError::Upstream {
                status: u32::from(status.as_u16()),
                message: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        serde_json::from_slice(&body).map_err(|e| VerificationError::Decode {
            message: format!("invalid verifyReceipt payload: {e}"),
        })
    }
}

fn parse_endpoint(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| Error::Config(format!("invalid verifyReceipt URL {raw}: {e}")))
}

/// Turn a decoded `verifyReceipt` response into a verdict.
fn evaluate_receipt(
    response: &VerifyReceiptResponse,
    product_id: &str,
) -> std::result::Result<Verdict, VerificationError> {
    match response.status {
        STATUS_OK => {
            let receipt = response
                .receipt
                .as_ref()
                .ok_or_else(|| VerificationError::Decode {
                    message: "status 0 response carries no receipt".to_string(),
                })?;

            if receipt.in_app.iter().any(|item| item.product_id == product_id) {
                Ok(Verdict::Valid)
            } else {
                Ok(Verdict::invalid(format!(
                    "receipt does not contain product {product_id}"
                )))
            }
        }
        status
            if status == STATUS_SERVER_UNAVAILABLE
                || STATUS_INTERNAL_ERRORS.contains(&status)
                || response.is_retryable == Some(true) =>
        {
            Err(VerificationError::Upstream {
                status: u32::try_from(status).unwrap_or_default(),
                message: "App Store could not verify the receipt".to_string(),
            })
        }
        status => Ok(Verdict::invalid(format!(
            "receipt verification failed with status {status}"
        ))),
    }
}
