//! Google Play purchase verification.

use crate::config::AndroidConfig;
use crate::error::{Error, Result, VerificationError};
use crate::verify::token::{AccessTokenSource, ServiceAccountTokenSource};
use crate::verify::{token_fingerprint, Verdict};
use reqwest::{Client, StatusCode, Url};
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// `purchaseState` value for a completed purchase.
const PURCHASE_STATE_PURCHASED: i64 = 0;
const PURCHASE_STATE_CANCELED: i64 = 1;
const PURCHASE_STATE_PENDING: i64 = 2;

/// Subset of the publisher API `ProductPurchase` resource.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductPurchaseDto {
    #[serde(default)]
    purchase_state: Option<i64>,
    #[serde(default)]
    order_id: Option<String>,
}

/// Verifies one-time product purchases with the Google Play publisher API.
pub struct AndroidVerifier {
    client: Client,
    api_base: Url,
    package_name: String,
    tokens: Arc<dyn AccessTokenSource>,
}

impl AndroidVerifier {
    /// Create a verifier with an explicit token source.
    ///
    /// # Errors
    ///
    /// Returns an error if the publisher API base is not a valid URL or the
    /// HTTP client cannot be built.
    pub fn new(config: &AndroidConfig, tokens: Arc<dyn AccessTokenSource>) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Self::with_client(config, client, tokens)
    }

    /// Create a verifier that acquires tokens from the configured
    /// service-account key.
    ///
    /// # Errors
    ///
    /// Returns an error if the publisher API base is not a valid URL or the
    /// HTTP client cannot be built.
    pub fn from_config(config: &AndroidConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        let tokens = Arc::new(ServiceAccountTokenSource::new(
            config.service_account_key.clone(),
            config.scope.clone(),
            client.clone(),
        ));
        Self::with_client(config, client, tokens)
    }

    fn with_client(
        config: &AndroidConfig,
        client: Client,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Result<Self> {
        let api_base = Url::parse(&config.publisher_api_base).map_err(|e| {
            Error::Config(format!(
                "invalid publisher API base {}: {e}",
                config.publisher_api_base
            ))
        })?;
        if api_base.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "publisher API base {api_base} cannot carry a path"
            )));
        }

        Ok(Self {
            client,
            api_base,
            package_name: config.package_name.clone(),
            tokens,
        })
    }

    /// Purchase resource URL for `(product_id, purchase_token)`.
    fn purchase_url(&self, product_id: &str, purchase_token: &str) -> Url {
        let mut url = self.api_base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend([
                "applications",
                self.package_name.as_str(),
                "purchases",
                "products",
                product_id,
                "tokens",
                purchase_token,
            ]);
        }
        url
    }

    /// Ask Google Play whether `purchase_token` is a completed purchase of
    /// `product_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the access token cannot be acquired, the request
    /// fails or times out, or the response cannot be decoded.
    pub async fn verify(
        &self,
        product_id: &str,
        purchase_token: &str,
    ) -> std::result::Result<Verdict, VerificationError> {
        if self.package_name.is_empty() {
            return Err(VerificationError::Configuration {
                message: "android package name is not set".to_string(),
            });
        }

        let fingerprint = token_fingerprint(purchase_token);
        if !is_path_segment(product_id) || !is_path_segment(purchase_token) {
            info!(product_id, token = %fingerprint, "Unaddressable Google Play purchase");
            return Ok(Verdict::invalid(
                "product id and purchase token must be non-empty and not a dot segment",
            ));
        }
        debug!(product_id, token = %fingerprint, "Verifying Google Play purchase");

        let access_token = self.tokens.access_token().await?;
        let response = self
            .client
            .get(self.purchase_url(product_id, purchase_token))
            .bearer_auth(access_token.expose_secret())
            .send()
            .await
            .map_err(|e| VerificationError::from_transport(&e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| VerificationError::from_transport(&e))?;

        if !status.is_success() {
            let verdict = classify_failure_status(status, &body)?;
            info!(product_id, token = %fingerprint, %status, "Google Play rejected purchase token");
            return Ok(verdict);
        }

        let verdict = interpret_purchase(&body)?;
        info!(
            product_id,
            token = %fingerprint,
            valid = verdict.is_valid(),
            "Google Play verification complete"
        );
        Ok(verdict)
    }
}

/// Whether `value` survives as its own URL path segment.
///
/// `PathSegmentsMut::extend` drops `.` and `..`, and an empty value would
/// address the parent collection.
fn is_path_segment(value: &str) -> bool {
    !matches!(value, "" | "." | "..")
}

/// Map a non-success HTTP status to a verdict or an error.
///
/// Authorization failures, throttling and server faults mean the store did
/// not answer; any other client error means the store refused the token.
fn classify_failure_status(
    status: StatusCode,
    body: &[u8],
) -> std::result::Result<Verdict, VerificationError> {
    let message = String::from_utf8_lossy(body).into_owned();
    let store_unavailable = status.is_server_error()
        || matches!(
            status,
            StatusCode::UNAUTHORIZED
                | StatusCode::FORBIDDEN
                | StatusCode::REQUEST_TIMEOUT
                | StatusCode::TOO_MANY_REQUESTS
        );

    if store_unavailable {
        warn!(%status, "Google Play verification unavailable");
        return Err(VerificationError::Upstream {
            status: u32::from(status.as_u16()),
            message,
        });
    }
    Ok(Verdict::invalid(format!(
        "Google Play rejected the purchase token with HTTP {}",
        status.as_u16()
    )))
}

/// Interpret a `ProductPurchase` body.
fn interpret_purchase(body: &[u8]) -> std::result::Result<Verdict, VerificationError> {
    let purchase: ProductPurchaseDto =
        serde_json::from_slice(body).map_err(|e| VerificationError::Decode {
            message: format!("invalid ProductPurchase payload: {e}"),
        })?;

    let verdict = match purchase.purchase_state {
        Some(PURCHASE_STATE_PURCHASED) => {
            debug!(order_id = ?purchase.order_id, "Purchase state is purchased");
            Verdict::Valid
        }
        Some(PURCHASE_STATE_CANCELED) => Verdict::invalid("purchase was canceled"),
        Some(PURCHASE_STATE_PENDING) => Verdict::invalid("purchase is pending"),
        Some(other) => Verdict::invalid(format!("unexpected purchase state {other}")),
        None => Verdict::invalid("purchase state missing from store response"),
    };
    Ok(verdict)
}
