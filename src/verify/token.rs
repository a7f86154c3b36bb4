//! Bearer token acquisition for the Google Play publisher API.
//!
//! Tokens are obtained with the OAuth2 JWT-bearer grant from a
//! service-account key. A fresh token is requested for every verification;
//! nothing is cached between calls.

use crate::error::VerificationError;
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Source of bearer tokens for the publisher API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccessTokenSource: Send + Sync {
    /// Obtain a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`VerificationError::Credential`] when the credential is
    /// unusable or the token endpoint refuses it.
    async fn access_token(&self) -> Result<SecretString, VerificationError>;
}

/// Fields of a Google service-account key file used for token exchange.
#[derive(Debug, Deserialize)]
struct RawServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    token_uri: String,
}

#[derive(Debug)]
struct ServiceAccountKey {
    client_email: String,
    private_key: SecretString,
    private_key_id: Option<String>,
    token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Token source backed by a service-account key file.
///
/// The key file is re-read on every call so a rotated or revoked key takes
/// effect without a restart.
pub struct ServiceAccountTokenSource {
    key_path: PathBuf,
    scope: String,
    client: reqwest::Client,
}

impl ServiceAccountTokenSource {
    /// Create a token source for `scope` using the key at `key_path`.
    #[must_use]
    pub fn new(
        key_path: impl Into<PathBuf>,
        scope: impl Into<String>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            key_path: key_path.into(),
            scope: scope.into(),
            client,
        }
    }

    /// Path of the service-account key file.
    #[must_use]
    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    async fn load_key(&self) -> Result<ServiceAccountKey, VerificationError> {
        let raw = tokio::fs::read_to_string(&self.key_path)
            .await
            .map_err(|e| VerificationError::Credential {
                message: format!(
                    "cannot read service account key {}: {e}",
                    self.key_path.display()
                ),
            })?;
        parse_key(&raw)
    }
}

fn parse_key(raw: &str) -> Result<ServiceAccountKey, VerificationError> {
    let key: RawServiceAccountKey =
        serde_json::from_str(raw).map_err(|e| VerificationError::Credential {
            message: format!("malformed service account key: {e}"),
        })?;
    Ok(ServiceAccountKey {
        client_email: key.client_email,
        private_key: SecretString::from(key.private_key),
        private_key_id: key.private_key_id,
        token_uri: key.token_uri,
    })
}

fn sign_assertion(
    key: &ServiceAccountKey,
    scope: &str,
    now: i64,
) -> Result<String, VerificationError> {
    let claims = AssertionClaims {
        iss: key.client_email.clone(),
        scope: scope.to_string(),
        aud: key.token_uri.clone(),
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    };
    let mut header = Header::new(Algorithm::RS256);
    header.kid.clone_from(&key.private_key_id);

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.expose_secret().as_bytes())
        .map_err(|e| VerificationError::Credential {
            message: format!("invalid service account private key: {e}"),
        })?;

    jsonwebtoken::encode(&header, &claims, &encoding_key).map_err(|e| {
        VerificationError::Credential {
            message: format!("failed to sign token assertion: {e}"),
        }
    })
}

#[async_trait]
impl AccessTokenSource for ServiceAccountTokenSource {
    async fn access_token(&self) -> Result<SecretString, VerificationError> {
        let key = self.load_key().await?;
        let assertion = sign_assertion(&key, &self.scope, chrono::Utc::now().timestamp())?;

        debug!(
            token_uri = %key.token_uri,
            client_email = %key.client_email,
            "Requesting publisher API access token"
        );

        let response = self
            .client
            .post(&key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| VerificationError::from_transport(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VerificationError::Credential {
                message: format!("token endpoint returned {status}: {body}"),
            });
        }

        let token: TokenResponse =
            response
                .json()
                .await
                .map_err(|e| VerificationError::Credential {
                    message: format!("unreadable token response: {e}"),
                })?;

        if token.access_token.is_empty() {
            return Err(VerificationError::Credential {
                message: "token endpoint returned an empty access token".to_string(),
            });
        }

        debug!(expires_in = ?token.expires_in, "Publisher API access token acquired");
        Ok(SecretString::from(token.access_token))
    }
}
