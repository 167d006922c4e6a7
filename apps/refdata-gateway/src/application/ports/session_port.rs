//! Market Data Session Port (Driven Port)
//!
//! Interface for a stateful request/response session against the market
//! data terminal. One session serves exactly one lookup and is stopped on
//! every exit path.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::reference_data::Message;

/// Well-known name of the reference data service.
pub const REFDATA_SERVICE: &str = "//blp/refdata";

/// Operation name of a batched reference data request.
pub const REFERENCE_DATA_REQUEST: &str = "ReferenceDataRequest";

/// Connection settings shared read-only by every session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Terminal (or bridge) host.
    pub service_host: String,
    /// Terminal (or bridge) port.
    pub service_port: u16,
    /// Upper bound for establishing the connection on `start`.
    pub connect_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            service_host: "localhost".to_string(),
            service_port: 8194,
            connect_timeout: Duration::from_secs(5),
        }
    }
}

impl SessionConfig {
    /// `host:port` of the terminal.
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.service_host, self.service_port)
    }
}

/// Kind of a session event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// No event arrived within the poll timeout.
    Timeout,
    /// Part of a response; more events follow.
    PartialResponse,
    /// Final part of a response.
    Response,
    /// Session lifecycle notification.
    SessionStatus,
    /// Service open/close notification.
    ServiceStatus,
    /// Request-level status notification.
    RequestStatus,
    /// Administrative notification.
    Admin,
    /// Anything else.
    #[serde(other)]
    Other,
}

impl EventKind {
    /// Whether this event completes a response.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Response)
    }
}

/// One polled event with its messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event kind.
    #[serde(rename = "eventType")]
    pub kind: EventKind,
    /// Messages carried by the event.
    #[serde(default)]
    pub messages: Vec<Message>,
}

impl Event {
    /// Create an event.
    #[must_use]
    pub const fn new(kind: EventKind, messages: Vec<Message>) -> Self {
        Self { kind, messages }
    }

    /// The event produced when a poll times out.
    #[must_use]
    pub const fn timeout() -> Self {
        Self::new(EventKind::Timeout, Vec::new())
    }
}

/// A request built against an open service.
///
/// Repeated entries are appended under the same name and keep their order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    service: String,
    operation: String,
    entries: Vec<(String, String)>,
}

impl Request {
    /// Create an empty request for an operation of a service.
    #[must_use]
    pub fn new(service: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            operation: operation.into(),
            entries: Vec::new(),
        }
    }

    /// Append a value to a repeated element.
    pub fn append(&mut self, name: &str, value: impl Into<String>) {
        self.entries.push((name.to_string(), value.into()));
    }

    /// Service the request targets.
    #[must_use]
    pub fn service(&self) -> &str {
        &self.service
    }

    /// Operation name.
    #[must_use]
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Values appended under `name`, in order.
    #[must_use]
    pub fn values(&self, name: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Distinct element names, in first-append order.
    #[must_use]
    pub fn element_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for (name, _) in &self.entries {
            if !names.contains(&name.as_str()) {
                names.push(name);
            }
        }
        names
    }
}

/// Session-level failure.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Could not reach the terminal.
    #[error("could not connect to {address}: {message}")]
    Connect {
        /// Target address.
        address: String,
        /// Error details.
        message: String,
    },

    /// The terminal closed the connection.
    #[error("connection closed by market data service")]
    Disconnected,

    /// Socket failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed frame.
    #[error("malformed frame: {0}")]
    Codec(String),

    /// The named service refused to open.
    #[error("service {service} unavailable: {reason}")]
    ServiceUnavailable {
        /// Service name.
        service: String,
        /// Reason reported by the terminal.
        reason: String,
    },

    /// Operation not valid in the current session state.
    #[error("invalid session state: {0}")]
    InvalidState(String),
}

/// Port for a stateful market data session.
///
/// This is a driven (secondary/outbound) port. Implementations own a single
/// connection; `stop` must be safe to call more than once.
#[async_trait]
pub trait MarketDataSession: Send {
    /// Establish the session.
    async fn start(&mut self) -> Result<(), SessionError>;

    /// Open a service by name.
    async fn open_service(&mut self, service: &str) -> Result<(), SessionError>;

    /// Create an empty request for an operation of an opened service.
    fn create_request(&self, service: &str, operation: &str) -> Result<Request, SessionError> {
        Ok(Request::new(service, operation))
    }

    /// Submit a request; returns its correlation id.
    async fn send_request(&mut self, request: &Request) -> Result<u64, SessionError>;

    /// Wait up to `timeout` for the next event.
    ///
    /// A poll that sees nothing returns an event of kind
    /// [`EventKind::Timeout`] rather than an error.
    async fn next_event(&mut self, timeout: Duration) -> Result<Event, SessionError>;

    /// Tear the session down. Idempotent.
    async fn stop(&mut self);
}

/// Creates one fresh session per lookup.
pub trait SessionFactory: Send + Sync {
    /// Session type produced by this factory.
    type Session: MarketDataSession;

    /// Create a session that has not been started yet.
    fn create(&self, config: &SessionConfig) -> Self::Session;
}
