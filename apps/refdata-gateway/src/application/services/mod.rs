//! Application Services
//!
//! Services that orchestrate domain logic and coordinate between ports.
//!
//! - `ReferenceDataService`: Drives one market data session per lookup

mod reference_data;

pub use reference_data::{
    DEFAULT_POLL_TIMEOUT, FetchError, FetchOutcome, OutcomeKind, ReferenceDataService,
};
