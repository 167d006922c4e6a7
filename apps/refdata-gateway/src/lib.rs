#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements
    )
)]

//! Reference Data Gateway
//!
//! An HTTP service that answers batched reference data lookups (e.g. last
//! price and VWAP for a list of tickers) against a market data terminal.
//! Each lookup opens a fresh session, sends one request, collects the
//! streamed response and returns it as a flat JSON table.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Core types with no I/O
//!   - `ticker`: Ticker normalization and query list parsing
//!   - `reference_data`: Response payloads, result rows, response decoding
//!
//! - **Application**: Use cases and port definitions
//!   - `ports`: Market data session interface
//!   - `services`: Session driver for one batched lookup
//!
//! - **Infrastructure**: Adapters and external integrations
//!   - `bridge`: TCP session adapter for the terminal bridge
//!   - `http`: Reference data, health and metrics routes
//!   - `config`: Environment configuration
//!   - `metrics`, `telemetry`: Observability
//!
//! # Data Flow
//!
//! ```text
//! GET /api/reference_data?ticker=7203,MSFT
//!   -> normalize tickers -> session driver -> bridge session -> terminal
//!   <- JSON rows         <- response decoder <- PARTIAL_RESPONSE.. RESPONSE
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Ticker and reference data types with no I/O.
pub mod domain;

/// Application layer - Use cases and port definitions.
pub mod application;

/// Infrastructure layer - Adapters and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::reference_data::{FieldValue, RequestSpec, ResultRow};
pub use domain::ticker::{normalize_ticker, parse_field_list, parse_ticker_list};

// Application
pub use application::ports::{
    Event, EventKind, MarketDataSession, Request, SessionConfig, SessionError, SessionFactory,
};
pub use application::services::{FetchOutcome, OutcomeKind, ReferenceDataService};

// Infrastructure config
pub use infrastructure::config::{ConfigError, GatewayConfig};

// HTTP server
pub use infrastructure::http::{AppState, HttpServer, HttpServerError};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
