//! End-to-end tests for purchase-credits.
//!
//! The real reqwest-based verifiers talk to a local stub server that plays
//! the Google OAuth token endpoint, the Google Play publisher API and the
//! App Store receipt endpoints.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod harness;
mod stub_server;

mod ios;
