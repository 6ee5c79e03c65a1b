//! # dopplerctl
//!
//! Converges one Doppler resource per invocation and prints the result as
//! JSON on stdout. Logs go to stderr.
//!
//! Exit status is 0 on success (changed or not) and 1 on any failure, in
//! which case stdout carries `{"failed": true, "msg": ..., "request": ...}`.

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use doppler_manager::cli::{self, Cli, Outcome};
use doppler_manager::config::ConfigResolver;
use doppler_manager::observability::{logging, metrics};
use doppler_manager::report;
use std::process::ExitCode;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init(cli.verbose) {
        eprintln!("dopplerctl: {e:#}");
        return ExitCode::FAILURE;
    }

    let resolver = ConfigResolver::from_env();
    let (document, status) = match cli::execute(&cli, &resolver).await {
        Ok(Outcome::Json(value)) => (pretty(&value), ExitCode::SUCCESS),
        Ok(Outcome::Text(text)) => (text, ExitCode::SUCCESS),
        Err(e) => {
            error!("{}", report::log_line(&e));
            (pretty(&report::failure(&e)), ExitCode::FAILURE)
        }
    };
    println!("{document}");

    if let Some(path) = &cli.metrics_file {
        match metrics::write_to_file(path) {
            Ok(()) => info!("Metrics written to {}", path.display()),
            Err(e) => warn!("Failed to write metrics file: {e:#}"),
        }
    }

    status
}

fn init(verbosity: u8) -> Result<()> {
    // rustls 0.23 needs a process-wide provider before the first TLS connection
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_existing| anyhow!("a rustls crypto provider is already installed"))
        .context("Failed to install rustls crypto provider")?;

    logging::init_tracing(verbosity).context("Failed to initialize tracing")?;
    metrics::register_metrics().context("Failed to register metrics")?;
    Ok(())
}

fn pretty(value: &serde_json::Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
