//! Bridge Frame Codec
//!
//! JSON-lines framing for the terminal bridge. Every frame is one JSON object
//! on a single line.
//!
//! Client frames are tagged by `op`:
//!
//! ```json
//! {"op":"openService","service":"//blp/refdata"}
//! {"op":"sendRequest","correlationId":1,"service":"//blp/refdata","operation":"ReferenceDataRequest","elements":{"securities":["IBM US EQUITY"],"fields":["PX_LAST"]}}
//! {"op":"stop"}
//! ```
//!
//! Bridge frames are events:
//!
//! ```json
//! {"eventType":"RESPONSE","messages":[{"messageType":"ReferenceDataResponse","correlationId":1,"elements":{}}]}
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::application::ports::{Event, Request, SessionError};

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame is not a JSON object.
    #[error("invalid frame format: {0}")]
    InvalidFormat(String),
}

impl From<CodecError> for SessionError {
    fn from(err: CodecError) -> Self {
        Self::Codec(err.to_string())
    }
}

/// Frame sent from the gateway to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum ClientFrame {
    /// Open a service by name.
    OpenService {
        /// Service name.
        service: String,
    },
    /// Submit a request.
    SendRequest {
        /// Id echoed back on every response message.
        #[serde(rename = "correlationId")]
        correlation_id: u64,
        /// Target service.
        service: String,
        /// Operation name.
        operation: String,
        /// Repeated request elements by name.
        elements: BTreeMap<String, Vec<String>>,
    },
    /// End the session.
    Stop,
}

impl ClientFrame {
    /// Build a `sendRequest` frame from a request.
    #[must_use]
    pub fn send_request(correlation_id: u64, request: &Request) -> Self {
        let elements = request
            .element_names()
            .into_iter()
            .map(|name| {
                let values = request
                    .values(name)
                    .into_iter()
                    .map(ToString::to_string)
                    .collect();
                (name.to_string(), values)
            })
            .collect();

        Self::SendRequest {
            correlation_id,
            service: request.service().to_string(),
            operation: request.operation().to_string(),
            elements,
        }
    }
}

/// JSON-lines codec for the bridge connection.
#[derive(Debug, Default, Clone, Copy)]
pub struct BridgeCodec;

impl BridgeCodec {
    /// Create a new codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Encode a frame as one line, newline included.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode(&self, frame: &ClientFrame) -> Result<String, CodecError> {
        let mut line = serde_json::to_string(frame)?;
        line.push('\n');
        Ok(line)
    }

    /// Decode one line into an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the line is not a JSON object or does not match
    /// the event shape.
    pub fn decode(&self, line: &str) -> Result<Event, CodecError> {
        let trimmed = line.trim();
        if !trimmed.starts_with('{') {
            return Err(CodecError::InvalidFormat(format!(
                "expected JSON object, got: {}",
                trimmed.chars().take(50).collect::<String>()
            )));
        }
        Ok(serde_json::from_str(trimmed)?)
    }
}
