//! Configuration Module
//!
//! Configuration loading for the gateway.

mod settings;

pub use settings::{
    ConfigError, DEFAULT_FIELDS, DEFAULT_SERVICE_HOST, DEFAULT_SERVICE_PORT, DriverSettings,
    GatewayConfig, ServerSettings,
};
