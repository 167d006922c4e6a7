//! Prometheus Metrics Module
//!
//! Exposes gateway metrics in Prometheus format at `/metrics`.
//!
//! # Metrics
//!
//! - **Lookups**: reference data fetches by outcome, rows returned, duration
//! - **Sessions**: failures to reach the terminal, by stage
//! - **HTTP**: API requests by status code

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::application::services::OutcomeKind;

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics setup errors.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    /// The global recorder could not be installed.
    #[error("failed to install Prometheus recorder: {0}")]
    Install(String),
}

/// Initialize the Prometheus metrics recorder.
///
/// Calling this again after a successful install returns the same handle.
///
/// # Errors
///
/// Returns an error if another global recorder is already installed.
pub fn init_metrics() -> Result<PrometheusHandle, MetricsError> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle.clone());
    }

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder).map_err(|e| MetricsError::Install(e.to_string()))?;

    register_metrics();
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle).clone())
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "refdata_gateway_fetches_total",
        "Reference data lookups by outcome"
    );
    describe_counter!(
        "refdata_gateway_session_failures_total",
        "Sessions that failed before a request was sent, by stage"
    );
    describe_counter!(
        "refdata_gateway_rows_returned_total",
        "Result rows returned to callers"
    );
    describe_histogram!(
        "refdata_gateway_fetch_duration_seconds",
        "Wall time of one reference data lookup"
    );
    describe_counter!(
        "refdata_gateway_http_requests_total",
        "Reference data API requests by status code"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record one finished lookup.
pub fn record_fetch(kind: OutcomeKind, duration: Duration, rows: usize) {
    counter!(
        "refdata_gateway_fetches_total",
        "outcome" => kind.as_str()
    )
    .increment(1);

    let stage = match kind {
        OutcomeKind::SessionStartFailure => Some("start"),
        OutcomeKind::ServiceOpenFailure => Some("open_service"),
        _ => None,
    };
    if let Some(stage) = stage {
        counter!(
            "refdata_gateway_session_failures_total",
            "stage" => stage
        )
        .increment(1);
    }

    counter!("refdata_gateway_rows_returned_total")
        .increment(u64::try_from(rows).unwrap_or(u64::MAX));

    histogram!(
        "refdata_gateway_fetch_duration_seconds",
        "outcome" => kind.as_str()
    )
    .record(duration.as_secs_f64());
}

/// Record an API response status.
pub fn record_http_request(status: u16) {
    counter!(
        "refdata_gateway_http_requests_total",
        "status" => status.to_string()
    )
    .increment(1);
}

// =============================================================================
// Tests
// =============================================================================
