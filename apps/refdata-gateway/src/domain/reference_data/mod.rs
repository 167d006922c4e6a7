//! Reference Data Types
//!
//! Request, response payload and result row types for reference data
//! lookups, plus the decoder that flattens a response into rows.
//!
//! # Decoding
//!
//! Each `securityData` record becomes one [`ResultRow`]:
//!
//! ```text
//! {security, fieldExceptions[], securityError?, fieldData{..}}
//!     -> {"security": .., "<FIELD>": number | string | null, "securityError"?: ..}
//! ```
//!
//! Field values decode numeric first, then text, then null.

mod decoder;
mod element;
mod row;

pub use decoder::{MessageOutcome, RESPONSE_ERROR_PREFIX, decode_message, decode_security_data};
pub use element::{Element, Message};
pub use row::{
    FIELD_ERROR_PREFIX, FieldValue, ResultRow, SECURITY_ERROR_KEY, SECURITY_ERROR_PREFIX,
    SECURITY_KEY,
};

/// Securities and fields of one reference data lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RequestSpec {
    /// Normalized security identifiers, in request order.
    pub securities: Vec<String>,
    /// Field mnemonics, in request order.
    pub fields: Vec<String>,
}

impl RequestSpec {
    /// Create a request spec.
    #[must_use]
    pub const fn new(securities: Vec<String>, fields: Vec<String>) -> Self {
        Self { securities, fields }
    }
}
