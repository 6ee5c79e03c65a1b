//! # Metrics
//!
//! Prometheus metrics for Doppler API traffic and reconciliations.
//!
//! ## Metrics Exposed
//!
//! - `doppler_http_requests_total` - Requests by method and status (or `timeout`/`error`)
//! - `doppler_http_request_duration_seconds` - Request duration by method
//! - `doppler_reconciliations_total` - Reconciliations by resource kind and action
//! - `doppler_reconciliation_errors_total` - Failed reconciliations by resource kind
//!
//! dopplerctl is a one-shot process, so there is no scrape endpoint; the text
//! exposition can be written to a file for a node-exporter textfile collector.

use anyhow::{Context, Result};
use prometheus::{Encoder, HistogramVec, IntCounterVec, Registry, TextEncoder};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

// Metrics
pub(crate) static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

static HTTP_REQUESTS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "doppler_http_requests_total",
            "Total number of Doppler API requests by method and status",
        ),
        &["method", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric - this should never happen")
});

static HTTP_REQUEST_DURATION: LazyLock<HistogramVec> = LazyLock::new(|| {
    HistogramVec::new(
        prometheus::HistogramOpts::new(
            "doppler_http_request_duration_seconds",
            "Duration of Doppler API requests in seconds",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.0, 5.0]),
        &["method"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION metric - this should never happen")
});

static RECONCILIATIONS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "doppler_reconciliations_total",
            "Total number of reconciliations by resource kind and action",
        ),
        &["kind", "action"],
    )
    .expect("Failed to create RECONCILIATIONS_TOTAL metric - this should never happen")
});

static RECONCILIATION_ERRORS_TOTAL: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        prometheus::Opts::new(
            "doppler_reconciliation_errors_total",
            "Total number of failed reconciliations by resource kind",
        ),
        &["kind"],
    )
    .expect("Failed to create RECONCILIATION_ERRORS_TOTAL metric - this should never happen")
});

/// Register all metrics with the crate registry. Call once per process.
///
/// # Errors
/// Fails if a metric is already registered.
pub fn register_metrics() -> Result<()> {
    REGISTRY.register(Box::new(HTTP_REQUESTS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(HTTP_REQUEST_DURATION.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATIONS_TOTAL.clone()))?;
    REGISTRY.register(Box::new(RECONCILIATION_ERRORS_TOTAL.clone()))?;
    Ok(())
}

pub fn record_request(method: &str, status: &str, duration: Duration) {
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, status])
        .inc();
    HTTP_REQUEST_DURATION
        .with_label_values(&[method])
        .observe(duration.as_secs_f64());
}

pub fn record_reconciliation(kind: &str, action: &str) {
    RECONCILIATIONS_TOTAL
        .with_label_values(&[kind, action])
        .inc();
}

pub fn increment_reconciliation_errors(kind: &str) {
    RECONCILIATION_ERRORS_TOTAL.with_label_values(&[kind]).inc();
}

/// Render the registry in the Prometheus text format
///
/// # Errors
/// Fails if encoding fails or produces invalid UTF-8.
pub fn gather_text() -> Result<String> {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    encoder
        .encode(&REGISTRY.gather(), &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output is not valid UTF-8")
}

/// Write the text exposition to `path`, replacing any previous content
///
/// # Errors
/// Fails if the metrics cannot be rendered or the file cannot be written.
pub fn write_to_file(path: &Path) -> Result<()> {
    let text = gather_text()?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write metrics to {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let before = RECONCILIATIONS_TOTAL
            .with_label_values(&["project", "unit-test"])
            .get();
        record_reconciliation("project", "unit-test");
        record_reconciliation("project", "unit-test");
        let after = RECONCILIATIONS_TOTAL
            .with_label_values(&["project", "unit-test"])
            .get();
        assert_eq!(after - before, 2);
    }

    #[test]
    fn test_register_and_write_file() {
        // A second registration in the same process must fail, never panic
        let _ = register_metrics();
        register_metrics().unwrap_err();

        record_request("GET", "200", Duration::from_millis(12));
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dopplerctl.prom");
        write_to_file(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("doppler_http_requests_total"), "got: {text}");
    }
}
