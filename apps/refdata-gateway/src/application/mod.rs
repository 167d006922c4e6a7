//! Application Layer - Use cases and port definitions.
//!
//! This layer contains the application services and port interfaces
//! that define how the domain interacts with external systems.

/// Port interfaces for external systems (market data session).
pub mod ports;

/// Application services (reference data session driver).
pub mod services;
