//! App Store receipt verification over HTTP.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use super::harness::{
    receipt_response, status_response, StoreHarness, PRODUCTION_PATH, SANDBOX_PATH, SHARED_SECRET,
};
use purchase_credits::verify::IosVerifier;
use purchase_credits::{VerificationError, Verdict};
use std::time::Duration;

fn verifier(harness: &StoreHarness) -> IosVerifier {
    IosVerifier::from_config(&harness.ios_config()).expect("ios verifier")
}

#[tokio::test]
async fn test_production_receipt_is_valid() {
    let harness = StoreHarness::start().await;
    harness.server.respond(
        PRODUCTION_PATH,
        receipt_response(0, "Production", &["credits_100"]),
    );

    let verdict = verifier(&harness)
        .verify("base64-receipt", "credits_100")
        .await
        .expect("verification");
    assert_eq!(verdict, Verdict::Valid);

    let requests = harness.server.requests_to(PRODUCTION_PATH);
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].json(),
        serde_json::json!({
            "receipt-data": "base64-receipt",
            "password": SHARED_SECRET,
            "exclude-old-transactions": true,
        })
    );
    assert!(harness.server.requests_to(SANDBOX_PATH).is_empty());
}

#[tokio::test]
async fn test_sandbox_receipt_is_retried_once() {
    let harness = StoreHarness::start().await;
    harness
        .server
        .respond(PRODUCTION_PATH, status_response(21007));
    harness.server.respond(
        SANDBOX_PATH,
        receipt_response(0, "Sandbox", &["credits_100"]),
    );

    let verdict = verifier(&harness)
        .verify("sandbox-receipt", "credits_100")
        .await
        .expect("verification");
    assert_eq!(verdict, Verdict::Valid);

    assert_eq!(harness.server.requests_to(PRODUCTION_PATH).len(), 1);
    let retries = harness.server.requests_to(SANDBOX_PATH);
    assert_eq!(retries.len(), 1);
    assert_eq!(retries[0].json()["receipt-data"], "sandbox-receipt");
}

#[tokio::test]
async fn test_sandbox_answer_is_final() {
    let harness = StoreHarness::start().await;
    harness
        .server
        .respond(PRODUCTION_PATH, status_response(21007));
    harness
        .server
        .respond(SANDBOX_PATH, status_response(21007));

    let verdict = verifier(&harness)
        .verify("odd-receipt", "credits_100")
        .await
        .expect("verification");
    assert!(!verdict.is_valid());
    assert_eq!(harness.server.requests().len(), 2);
}

#[tokio::test]
async fn test_receipt_without_product_is_invalid() {
    let harness = StoreHarness::start().await;
    harness.server.respond(
        PRODUCTION_PATH,
        receipt_response(0, "Production", &["credits_50", "remove_ads"]),
    );

    let verdict = verifier(&harness)
        .verify("base64-receipt", "credits_100")
        .await
        .expect("verification");
    assert!(!verdict.is_valid());
}

#[tokio::test]
async fn test_malformed_receipt_is_invalid() {
    let harness = StoreHarness::start().await;
    harness
        .server
        .respond(PRODUCTION_PATH, status_response(21002));

    let verdict = verifier(&harness)
        .verify("not-a-receipt", "credits_100")
        .await
        .expect("verification");
    match verdict {
        Verdict::Invalid { reason } => assert!(reason.contains("21002")),
        Verdict::Valid => unreachable!("status 21002 must not be valid"),
    }
}

#[tokio::test]
async fn test_receipt_server_unavailable_is_error() {
    let harness = StoreHarness::start().await;
    harness
        .server
        .respond(PRODUCTION_PATH, status_response(21005));

    let err = verifier(&harness)
        .verify("base64-receipt", "credits_100")
        .await
        .expect_err("unavailable");
    assert!(matches!(err, VerificationError::Upstream { status: 21005, .. }));
}

#[tokio::test]
async fn test_slow_receipt_endpoint_times_out() {
    let harness = StoreHarness::start().await;
    harness.server.respond(
        PRODUCTION_PATH,
        receipt_response(0, "Production", &["credits_100"]).delayed(Duration::from_secs(4)),
    );

    let err = verifier(&harness)
        .verify("base64-receipt", "credits_100")
        .await
        .expect_err("timeout");
    assert!(matches!(err, VerificationError::Timeout { .. }));
}
