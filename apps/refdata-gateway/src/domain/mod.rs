//! Domain Layer - Core reference data types and pure transforms.
//!
//! This layer has no I/O. Everything here is deterministic and is
//! exercised directly by unit tests.

/// Symbol normalization into terminal security identifiers.
pub mod ticker;

/// Response payload tree, result rows and the response decoder.
pub mod reference_data;
