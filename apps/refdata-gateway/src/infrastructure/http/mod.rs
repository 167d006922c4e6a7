//! HTTP API
//!
//! Reference data endpoint plus health and metrics routes.
//!
//! # Endpoints
//!
//! - `GET /api/reference_data?ticker=7203,MSFT&fields=PX_LAST` - Batched lookup
//! - `GET /health` - JSON health status
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /metrics` - Prometheus metrics in text format
//!
//! # Status Codes
//!
//! `/api/reference_data` answers 400 when no ticker is given, 200 with a JSON
//! array of rows when the lookup produced any, and 500 with `{"error": ..}`
//! otherwise.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::application::ports::SessionFactory;
use crate::application::services::{OutcomeKind, ReferenceDataService};
use crate::domain::reference_data::RequestSpec;
use crate::domain::ticker::{parse_field_list, parse_ticker_list};
use crate::infrastructure::metrics;

const TICKER_REQUIRED: &str = "ticker parameter is required";

// =============================================================================
// Request / Response Types
// =============================================================================

/// Query string of `/api/reference_data`.
#[derive(Debug, Default, Deserialize)]
pub struct ReferenceDataQuery {
    /// Comma-separated ticker tokens, as typed by the caller.
    pub ticker: Option<String>,
    /// Comma-separated field mnemonics.
    pub fields: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// "healthy", or "degraded" after a lookup could not reach the terminal.
    pub status: HealthStatus,
    /// Gateway version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Configured market data endpoint.
    pub market_data: MarketDataInfo,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// The last lookup reached the terminal.
    Healthy,
    /// The last lookup failed to start a session or open the service.
    Degraded,
}

/// Market data endpoint in the health response.
#[derive(Debug, Clone, Serialize)]
pub struct MarketDataInfo {
    /// Terminal host.
    pub host: String,
    /// Terminal port.
    pub port: u16,
}

// =============================================================================
// Server State
// =============================================================================

/// Shared state for the HTTP handlers.
pub struct AppState<F> {
    service: ReferenceDataService<F>,
    default_fields: String,
    version: String,
    started_at: Instant,
    connect_failures: AtomicU64,
}

impl<F: SessionFactory> AppState<F> {
    /// Create handler state around a lookup service.
    #[must_use]
    pub fn new(service: ReferenceDataService<F>, default_fields: impl Into<String>) -> Self {
        Self {
            service,
            default_fields: default_fields.into(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: Instant::now(),
            connect_failures: AtomicU64::new(0),
        }
    }

    fn track(&self, kind: OutcomeKind) {
        match kind {
            OutcomeKind::SessionStartFailure | OutcomeKind::ServiceOpenFailure => {
                self.connect_failures.fetch_add(1, Ordering::Relaxed);
            }
            _ => self.connect_failures.store(0, Ordering::Relaxed),
        }
    }

    fn health(&self) -> HealthResponse {
        let config = self.service.config();
        let status = if self.connect_failures.load(Ordering::Relaxed) == 0 {
            HealthStatus::Healthy
        } else {
            HealthStatus::Degraded
        };

        HealthResponse {
            status,
            version: self.version.clone(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            current_time: Utc::now(),
            market_data: MarketDataInfo {
                host: config.service_host.clone(),
                port: config.service_port,
            },
        }
    }
}

/// Build the gateway router.
pub fn router<F>(state: Arc<AppState<F>>) -> Router
where
    F: SessionFactory + 'static,
{
    Router::new()
        .route("/api/reference_data", get(reference_data_handler::<F>))
        .route("/health", get(health_handler::<F>))
        .route("/healthz", get(liveness_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// =============================================================================
// HTTP Server
// =============================================================================

/// Gateway HTTP server.
pub struct HttpServer {
    port: u16,
    router: Router,
    cancel: CancellationToken,
}

impl HttpServer {
    /// Create a new server.
    #[must_use]
    pub const fn new(port: u16, router: Router, cancel: CancellationToken) -> Self {
        Self {
            port,
            router,
            cancel,
        }
    }

    /// Run the server on all interfaces until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HttpServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HttpServerError> {
        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HttpServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "HTTP server listening");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HttpServerError::ServerFailed(e.to_string()))?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn reference_data_handler<F>(
    State(state): State<Arc<AppState<F>>>,
    Query(query): Query<ReferenceDataQuery>,
) -> Response
where
    F: SessionFactory + 'static,
{
    let response = reference_data_response(&state, query).await;
    metrics::record_http_request(response.status().as_u16());
    response
}

/// Resolve one lookup into a response.
///
/// Tickers go through the numeric-code rule, which accepts ASCII digits only.
/// An absent or blank `fields` value requests the configured default fields;
/// a request with no fields is never sent.
async fn reference_data_response<F: SessionFactory>(
    state: &AppState<F>,
    query: ReferenceDataQuery,
) -> Response {
    let raw_ticker = query.ticker.unwrap_or_default();
    let securities = parse_ticker_list(&raw_ticker);
    if securities.is_empty() {
        return error_response(StatusCode::BAD_REQUEST, TICKER_REQUIRED.to_string());
    }

    let mut fields = query
        .fields
        .as_deref()
        .map(parse_field_list)
        .unwrap_or_default();
    if fields.is_empty() {
        fields = parse_field_list(&state.default_fields);
    }

    let started = Instant::now();
    let outcome = state
        .service
        .fetch_reference_data(&RequestSpec::new(securities, fields))
        .await;
    metrics::record_fetch(outcome.kind, started.elapsed(), outcome.row_count());
    state.track(outcome.kind);

    match outcome.rows {
        Some(rows) if !rows.is_empty() => (StatusCode::OK, Json(rows)).into_response(),
        _ => {
            let message = outcome.error.unwrap_or_else(|| {
                format!("Could not retrieve reference data for ticker(s) {raw_ticker}")
            });
            tracing::warn!(
                ticker = %raw_ticker,
                error = %message,
                "Reference data lookup returned no rows"
            );
            error_response(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorBody { error })).into_response()
}

async fn health_handler<F>(State(state): State<Arc<AppState<F>>>) -> impl IntoResponse
where
    F: SessionFactory + 'static,
{
    (StatusCode::OK, Json(state.health()))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn metrics_handler() -> impl IntoResponse {
    metrics::get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                handle.render(),
            )
        },
    )
}

// =============================================================================
// Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, thiserror::Error)]
pub enum HttpServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================
