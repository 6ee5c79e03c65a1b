//! Common test utilities for Pact contract tests
//!
//! Provides rustls initialisation and a client pointed at a Pact mock server.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use doppler_manager::config::ConnectionSettings;
use doppler_manager::DopplerClient;
use std::sync::Once;
use std::time::Duration;

pub const TEST_TOKEN: &str = "test-token";
pub const BEARER: &str = "Bearer test-token";

static RUSTLS_INIT: Once = Once::new();

/// Install the ring provider once per test binary
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // The Pact mock server may already have installed one
        if rustls::crypto::CryptoProvider::get_default().is_none() {
            let _ = rustls::crypto::ring::default_provider().install_default();
        }
    });
}

/// Base URL of the mock server without its trailing slash
pub fn base_url(mock_server_url: &str) -> String {
    mock_server_url.trim_end_matches('/').to_string()
}

/// Client talking to the mock server with the test token
pub fn client_for(mock_server_url: &str) -> DopplerClient {
    let settings = ConnectionSettings::new(base_url(mock_server_url), TEST_TOKEN)
        .with_timeout(Duration::from_secs(5));
    DopplerClient::new(&settings).expect("Failed to build Doppler client")
}
