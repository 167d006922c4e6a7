//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the concrete implementations of the port interfaces
//! defined in the application layer.

/// Terminal bridge session adapter (TCP, JSON lines).
pub mod bridge;

/// Configuration loading.
pub mod config;

/// Reference data, health and metrics HTTP routes.
pub mod http;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// OpenTelemetry tracing integration.
pub mod telemetry;
