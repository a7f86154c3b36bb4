//! Shared setup for the end-to-end tests.
//!
//! `StoreHarness` runs one stub server that plays the OAuth token endpoint,
//! the Google Play publisher API and both App Store receipt endpoints, and
//! builds verifier configuration pointing at it.

use super::stub_server::{StubResponse, StubServer};
use purchase_credits::{AndroidConfig, IosConfig, ServiceConfig};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tempfile::TempDir;

/// Package name the stub publisher API serves.
pub const PACKAGE_NAME: &str = "com.example.credits";

/// Bearer token the stub token endpoint hands out.
pub const ACCESS_TOKEN: &str = "stub-access-token";

/// Service account the fixture key belongs to.
pub const CLIENT_EMAIL: &str = "verifier@example-project.iam.gserviceaccount.com";

/// Shared secret configured for receipt verification.
pub const SHARED_SECRET: &str = "apple-shared-secret";

/// Token endpoint path.
pub const TOKEN_PATH: &str = "/token";

/// Production receipt endpoint path.
pub const PRODUCTION_PATH: &str = "/production/verifyReceipt";

/// Sandbox receipt endpoint path.
pub const SANDBOX_PATH: &str = "/sandbox/verifyReceipt";

const PUBLISHER_BASE_PATH: &str = "/androidpublisher/v3";

/// Fixture RSA key used to sign token assertions.
pub const PRIVATE_KEY_PEM: &str = include_str!("fixtures/service_account_key.pem");

/// Public half of [`PRIVATE_KEY_PEM`].
pub const PUBLIC_KEY_PEM: &str = include_str!("fixtures/service_account_pub.pem");

/// Stub store endpoints plus a temporary service-account key file.
pub struct StoreHarness {
    /// The stub server.
    pub server: StubServer,
    key_dir: TempDir,
}

impl StoreHarness {
    /// Start the stub server and write a service-account key that targets
    /// its token endpoint.
    pub async fn start() -> Self {
        let server = StubServer::start().await;
        let key_dir = tempfile::tempdir().expect("key dir");
        let harness = Self { server, key_dir };

        let key = serde_json::json!({
            "type": "service_account",
            "project_id": "example-project",
            "private_key_id": "fixture-key-1",
            "private_key": PRIVATE_KEY_PEM,
            "client_email": CLIENT_EMAIL,
            "token_uri": harness.token_uri(),
        });
        std::fs::write(harness.key_path(), key.to_string()).expect("write key");

        harness.server.respond(
            TOKEN_PATH,
            StubResponse::json(
                200,
                serde_json::json!({
                    "access_token": ACCESS_TOKEN,
                    "expires_in": 3599,
                    "token_type": "Bearer",
                }),
            ),
        );
        harness
    }

    /// Location of the service-account key file.
    pub fn key_path(&self) -> PathBuf {
        self.key_dir.path().join("service_account.json")
    }

    /// Token endpoint URL written into the key file.
    pub fn token_uri(&self) -> String {
        self.server.url(TOKEN_PATH)
    }

    /// Publisher API path for a product purchase.
    pub fn purchase_path(product_id: &str, token: &str) -> String {
        format!(
            "{PUBLISHER_BASE_PATH}/applications/{PACKAGE_NAME}/purchases/products/{product_id}/tokens/{token}"
        )
    }

    /// Script the publisher API answer for `(product_id, token)`.
    pub fn google_purchase(&self, product_id: &str, token: &str, response: StubResponse) {
        self.server
            .respond(&Self::purchase_path(product_id, token), response);
    }

    /// Android settings pointing at the stub.
    pub fn android_config(&self) -> AndroidConfig {
        AndroidConfig {
            package_name: PACKAGE_NAME.to_string(),
            service_account_key: self.key_path(),
            publisher_api_base: self.server.url(PUBLISHER_BASE_PATH),
            timeout_secs: 2,
            ..AndroidConfig::default()
        }
    }

    /// iOS settings pointing at the stub.
    pub fn ios_config(&self) -> IosConfig {
        IosConfig {
            shared_secret: SHARED_SECRET.to_string(),
            production_url: self.server.url(PRODUCTION_PATH),
            sandbox_url: self.server.url(SANDBOX_PATH),
            timeout_secs: 1,
            ..IosConfig::default()
        }
    }

    /// Full service configuration with a two-product catalog.
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            android: self.android_config(),
            ios: self.ios_config(),
            products: BTreeMap::from([
                ("credits_100".to_string(), 100),
                ("credits_500".to_string(), 500),
            ]),
            ..ServiceConfig::default()
        }
    }
}

/// App Store response listing `product_ids` in the receipt.
pub fn receipt_response(status: i64, environment: &str, product_ids: &[&str]) -> StubResponse {
    let in_app: Vec<_> = product_ids
        .iter()
        .map(|id| serde_json::json!({ "product_id": id, "quantity": "1" }))
        .collect();
    StubResponse::json(
        200,
        serde_json::json!({
            "status": status,
            "environment": environment,
            "receipt": { "bundle_id": PACKAGE_NAME, "in_app": in_app },
        }),
    )
}

/// App Store response carrying only a status.
pub fn status_response(status: i64) -> StubResponse {
    StubResponse::json(200, serde_json::json!({ "status": status }))
}
