//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout carries nothing but the JSON result.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

/// Default filter for a given number of `-v` flags
#[must_use]
pub fn default_filter(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    format!("dopplerctl={level},doppler_manager={level}")
}

/// Install the global subscriber. `RUST_LOG` takes precedence over `verbosity`.
///
/// # Errors
/// Fails if a global subscriber is already installed.
pub fn init_tracing(verbosity: u8) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter(verbosity).into()),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing subscriber: {e}"))
}
