//! Response decoding.
//!
//! Turns `ReferenceDataResponse` messages into flat rows. Per-field and
//! per-security failures are written inline; only a `responseError` is
//! reported to the caller as fatal.

use std::collections::HashSet;

use super::element::{Element, Message};
use super::row::{
    FIELD_ERROR_PREFIX, FieldValue, ResultRow, SECURITY_ERROR_KEY, SECURITY_ERROR_PREFIX,
};

/// Prefix of the fatal response-level error message.
pub const RESPONSE_ERROR_PREFIX: &str = "Response Error: ";

const RESPONSE_ERROR: &str = "responseError";
const SECURITY_DATA: &str = "securityData";
const SECURITY: &str = "security";
const FIELD_EXCEPTIONS: &str = "fieldExceptions";
const FIELD_ID: &str = "fieldId";
const ERROR_INFO: &str = "errorInfo";
const SECURITY_ERROR: &str = "securityError";
const FIELD_DATA: &str = "fieldData";
const MESSAGE: &str = "message";

/// What a single response message contributes to the result.
#[derive(Debug, Clone, PartialEq)]
pub enum MessageOutcome {
    /// The whole response failed; carries the formatted error message.
    ResponseError(String),
    /// Decoded rows, one per security record, in response order.
    SecurityData(Vec<ResultRow>),
    /// Neither an error nor security data (status and admin messages).
    Ignored,
}

/// Classify and decode one message against the requested field list.
#[must_use]
pub fn decode_message(message: &Message, fields: &[String]) -> MessageOutcome {
    if let Some(error) = message.element(RESPONSE_ERROR) {
        let text = error
            .child_text(MESSAGE)
            .unwrap_or_else(|| "unknown error".to_string());
        return MessageOutcome::ResponseError(format!("{RESPONSE_ERROR_PREFIX}{text}"));
    }

    match message.element(SECURITY_DATA) {
        Some(records) => MessageOutcome::SecurityData(
            records
                .values()
                .iter()
                .map(|record| decode_security_data(record, fields))
                .collect(),
        ),
        None => MessageOutcome::Ignored,
    }
}

/// Decode one `securityData` record into a row.
///
/// The row always holds the security key and every requested field. A field
/// reported in `fieldExceptions` keeps its error marker instead of a value.
#[must_use]
pub fn decode_security_data(record: &Element, fields: &[String]) -> ResultRow {
    let mut row = ResultRow::new(record.child_text(SECURITY).unwrap_or_default());

    let mut failed_fields = HashSet::new();
    if let Some(exceptions) = record.child(FIELD_EXCEPTIONS) {
        for exception in exceptions.values() {
            let Some(field_id) = exception.child_text(FIELD_ID) else {
                continue;
            };
            let text = exception
                .child(ERROR_INFO)
                .and_then(|info| info.child_text(MESSAGE))
                .unwrap_or_default();
            row.set(
                field_id.clone(),
                FieldValue::Text(format!("{FIELD_ERROR_PREFIX}{text}")),
            );
            failed_fields.insert(field_id);
        }
    }

    if let Some(error) = record.child(SECURITY_ERROR) {
        let text = error.child_text(MESSAGE).unwrap_or_default();
        row.set(
            SECURITY_ERROR_KEY,
            FieldValue::Text(format!("{SECURITY_ERROR_PREFIX}{text}")),
        );
    }

    let field_data = record.child(FIELD_DATA);
    for field in fields {
        if failed_fields.contains(field) {
            continue;
        }
        let value = field_data
            .and_then(|data| data.child(field))
            .map_or(FieldValue::Null, FieldValue::decode);
        row.set(field.as_str(), value);
    }

    row
}
