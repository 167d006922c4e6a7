//! Reference Data Gateway Binary
//!
//! Starts the HTTP reference data gateway.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin refdata-gateway
//! ```
//!
//! # Environment Variables
//!
//! - `BLPAPI_SERVER_HOST`: Terminal bridge host (default: localhost)
//! - `BLPAPI_SERVER_PORT`: Terminal bridge port (default: 8194)
//! - `REFDATA_HTTP_PORT`: HTTP port (default: 5001)
//! - `REFDATA_POLL_TIMEOUT_MS`: Per-poll event timeout (default: 5000)
//! - `REFDATA_CONNECT_TIMEOUT_MS`: Session connect timeout (default: 5000)
//! - `REFDATA_DEFAULT_FIELDS`: Fields used when a query names none (default: PX_LAST,ALL_DAY_VWAP)
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: refdata-gateway)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;
use std::time::Duration;

use refdata_gateway::infrastructure::bridge::BridgeSessionFactory;
use refdata_gateway::infrastructure::http::{AppState, HttpServer, router};
use refdata_gateway::infrastructure::telemetry;
use refdata_gateway::{GatewayConfig, ReferenceDataService, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;

/// Graceful shutdown timeout.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();

    let _telemetry_guard = telemetry::init()?;

    tracing::info!("Starting reference data gateway");

    let _metrics_handle = init_metrics()?;

    let config = GatewayConfig::from_env()?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();

    let service = ReferenceDataService::new(BridgeSessionFactory::new(), Arc::new(config.session))
        .with_poll_timeout(config.driver.poll_timeout);
    let state = Arc::new(AppState::new(service, config.driver.default_fields));

    let server = HttpServer::new(
        config.server.http_port,
        router(state),
        shutdown_token.clone(),
    );
    let mut server_task = tokio::spawn(server.run());

    tracing::info!("Reference data gateway ready");

    tokio::select! {
        () = await_shutdown(shutdown_token.clone()) => {}
        result = &mut server_task => {
            result??;
            tracing::info!("Reference data gateway stopped");
            return Ok(());
        }
    }

    match tokio::time::timeout(SHUTDOWN_TIMEOUT, server_task).await {
        Ok(result) => result??,
        Err(_) => tracing::warn!(
            timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
            "HTTP server did not drain before shutdown timeout"
        ),
    }

    tracing::info!("Reference data gateway stopped");
    Ok(())
}

/// Load .env file from current or ancestor directories.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &GatewayConfig) {
    tracing::info!(
        market_data = %config.session.address(),
        http_port = config.server.http_port,
        poll_timeout_ms = config.driver.poll_timeout.as_millis(),
        "Configuration loaded"
    );
    tracing::debug!(
        connect_timeout_ms = config.session.connect_timeout.as_millis(),
        default_fields = %config.driver.default_fields,
        "Session settings"
    );
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();

    tracing::info!(
        timeout_secs = SHUTDOWN_TIMEOUT.as_secs(),
        "Graceful shutdown started"
    );
}
