//! Gateway Configuration Settings
//!
//! Configuration types for the gateway, loaded from environment variables
//! once at startup and shared read-only afterwards.

use std::time::Duration;

use crate::application::ports::SessionConfig;
use crate::application::services::DEFAULT_POLL_TIMEOUT;

/// Default market data host.
pub const DEFAULT_SERVICE_HOST: &str = "localhost";

/// Default market data port.
pub const DEFAULT_SERVICE_PORT: u16 = 8194;

/// Fields requested when the query names none.
pub const DEFAULT_FIELDS: &str = "PX_LAST,ALL_DAY_VWAP";

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    /// HTTP port, bound on all interfaces.
    pub http_port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { http_port: 5001 }
    }
}

/// Session driver settings.
#[derive(Debug, Clone)]
pub struct DriverSettings {
    /// Timeout of a single event poll.
    pub poll_timeout: Duration,
    /// Comma-separated fields used when a query omits `fields`.
    pub default_fields: String,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            poll_timeout: DEFAULT_POLL_TIMEOUT,
            default_fields: DEFAULT_FIELDS.to_string(),
        }
    }
}

/// Complete gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Market data session settings.
    pub session: SessionConfig,
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Session driver settings.
    pub driver: DriverSettings,
}

impl GatewayConfig {
    /// Create configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the market data host is empty or either port is
    /// not a valid port number.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// See [`GatewayConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let service_host =
            lookup("BLPAPI_SERVER_HOST").unwrap_or_else(|| DEFAULT_SERVICE_HOST.to_string());
        if service_host.trim().is_empty() {
            return Err(ConfigError::EmptyValue("BLPAPI_SERVER_HOST".to_string()));
        }

        let service_port = parse_port(&lookup, "BLPAPI_SERVER_PORT", DEFAULT_SERVICE_PORT)?;

        let session = SessionConfig {
            service_host,
            service_port,
            connect_timeout: parse_duration_millis(
                &lookup,
                "REFDATA_CONNECT_TIMEOUT_MS",
                SessionConfig::default().connect_timeout,
            ),
        };

        let server = ServerSettings {
            http_port: parse_port(
                &lookup,
                "REFDATA_HTTP_PORT",
                ServerSettings::default().http_port,
            )?,
        };

        let driver = DriverSettings {
            poll_timeout: parse_duration_millis(
                &lookup,
                "REFDATA_POLL_TIMEOUT_MS",
                DriverSettings::default().poll_timeout,
            ),
            default_fields: lookup("REFDATA_DEFAULT_FIELDS")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_FIELDS.to_string()),
        };

        Ok(Self {
            session,
            server,
            driver,
        })
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Environment variable has empty value.
    #[error("environment variable {0} cannot be empty")]
    EmptyValue(String),
    /// Environment variable could not be parsed.
    #[error("environment variable {key} has invalid value {value:?}")]
    InvalidValue {
        /// Variable name.
        key: String,
        /// Raw value.
        value: String,
    },
}

fn parse_port<F>(lookup: &F, key: &str, default: u16) -> Result<u16, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw.clone(),
            })
    })
}

fn parse_duration_millis<F>(lookup: &F, key: &str, default: Duration) -> Duration
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|ms| *ms > 0)
        .map_or(default, Duration::from_millis)
}
