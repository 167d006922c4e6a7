//! Reference Data Session Driver
//!
//! Runs one batched reference data lookup against a fresh market data
//! session:
//!
//! ```text
//! create -> start -> open //blp/refdata -> send -> poll ... RESPONSE -> stop
//!                                                     \-> TIMEOUT / responseError
//! ```
//!
//! Every failure is resolved here and reported as a message string; the
//! session is stopped exactly once whichever way the lookup ends.

use std::sync::Arc;
use std::time::Duration;

use tracing::Instrument;
use uuid::Uuid;

use crate::application::ports::{
    EventKind, MarketDataSession, REFDATA_SERVICE, REFERENCE_DATA_REQUEST, SessionConfig,
    SessionError, SessionFactory,
};
use crate::domain::reference_data::{MessageOutcome, RequestSpec, ResultRow, decode_message};

/// Per-poll timeout used when none is configured.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_millis(5000);

/// Fatal lookup failure.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// The session could not be started.
    #[error("Failed to start market data session: {0}")]
    SessionStart(#[source] SessionError),

    /// The reference data service could not be opened.
    #[error("Failed to open {service} service: {source}")]
    ServiceOpen {
        /// Service name.
        service: String,
        /// Underlying session error.
        source: SessionError,
    },

    /// No event arrived within the poll timeout.
    #[error("Market data request timed out after {0} ms")]
    RequestTimeout(u128),

    /// The terminal rejected the whole response. Carries the formatted message.
    #[error("{0}")]
    ResponseError(String),

    /// Any other session failure while the request was in flight.
    #[error("Exception while getting data: {0}")]
    Unexpected(#[source] SessionError),
}

impl FetchError {
    /// Outcome classification of this error.
    #[must_use]
    pub const fn kind(&self) -> OutcomeKind {
        match self {
            Self::SessionStart(_) => OutcomeKind::SessionStartFailure,
            Self::ServiceOpen { .. } => OutcomeKind::ServiceOpenFailure,
            Self::RequestTimeout(_) => OutcomeKind::RequestTimeout,
            Self::ResponseError(_) => OutcomeKind::ResponseError,
            Self::Unexpected(_) => OutcomeKind::UnexpectedFault,
        }
    }

    /// Whether rows decoded before this error are returned to the caller.
    ///
    /// A response-level error or a fault while the request is in flight keeps
    /// them; a timeout discards partial data.
    #[must_use]
    pub const fn keeps_partial_rows(&self) -> bool {
        matches!(self, Self::ResponseError(_) | Self::Unexpected(_))
    }
}

/// How a lookup ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    /// A terminal event was observed without a fatal error.
    Success,
    /// Session start failed.
    SessionStartFailure,
    /// Service open failed.
    ServiceOpenFailure,
    /// Poll timed out.
    RequestTimeout,
    /// Response-level error.
    ResponseError,
    /// Any other fault.
    UnexpectedFault,
}

impl OutcomeKind {
    /// Label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::SessionStartFailure => "session_start_failure",
            Self::ServiceOpenFailure => "service_open_failure",
            Self::RequestTimeout => "request_timeout",
            Self::ResponseError => "response_error",
            Self::UnexpectedFault => "unexpected_fault",
        }
    }
}

/// Result of one lookup: the rows and the first fatal error, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    /// Decoded rows; `None` when the lookup produced no usable data.
    pub rows: Option<Vec<ResultRow>>,
    /// First fatal error message.
    pub error: Option<String>,
    /// Outcome classification.
    pub kind: OutcomeKind,
}

impl FetchOutcome {
    fn success(rows: Vec<ResultRow>) -> Self {
        Self {
            rows: Some(rows),
            error: None,
            kind: OutcomeKind::Success,
        }
    }

    fn failure(error: &FetchError, rows: Option<Vec<ResultRow>>) -> Self {
        Self {
            rows,
            error: Some(error.to_string()),
            kind: error.kind(),
        }
    }

    /// Whether at least one row was returned.
    #[must_use]
    pub fn has_rows(&self) -> bool {
        self.rows.as_ref().is_some_and(|rows| !rows.is_empty())
    }

    /// Number of rows returned.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.as_ref().map_or(0, Vec::len)
    }
}

/// Drives reference data lookups, one fresh session per call.
pub struct ReferenceDataService<F> {
    factory: F,
    config: Arc<SessionConfig>,
    poll_timeout: Duration,
}

impl<F: SessionFactory> ReferenceDataService<F> {
    /// Create a service with the default poll timeout.
    #[must_use]
    pub const fn new(factory: F, config: Arc<SessionConfig>) -> Self {
        Self {
            factory,
            config,
            poll_timeout: DEFAULT_POLL_TIMEOUT,
        }
    }

    /// Override the per-poll timeout.
    #[must_use]
    pub fn with_poll_timeout(mut self, poll_timeout: Duration) -> Self {
        self.poll_timeout = poll_timeout;
        self
    }

    /// Shared session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Fetch `spec.fields` for `spec.securities` in a single batched request.
    ///
    /// Never fails: every fault is converted into `FetchOutcome::error`.
    pub async fn fetch_reference_data(&self, spec: &RequestSpec) -> FetchOutcome {
        let span = tracing::info_span!(
            "fetch_reference_data",
            request_id = %Uuid::new_v4(),
            securities = spec.securities.len(),
            fields = spec.fields.len()
        );
        self.run(spec).instrument(span).await
    }

    async fn run(&self, spec: &RequestSpec) -> FetchOutcome {
        let mut session = self.factory.create(&self.config);
        let mut rows = Vec::new();

        let result = self.drive(&mut session, spec, &mut rows).await;
        session.stop().await;

        match result {
            Ok(()) => {
                tracing::info!(rows = rows.len(), "Reference data request complete");
                FetchOutcome::success(rows)
            }
            Err(e) => {
                tracing::error!(error = %e, kind = e.kind().as_str(), "Reference data request failed");
                let kept = e.keeps_partial_rows().then_some(rows);
                FetchOutcome::failure(&e, kept)
            }
        }
    }

    async fn drive<S: MarketDataSession>(
        &self,
        session: &mut S,
        spec: &RequestSpec,
        rows: &mut Vec<ResultRow>,
    ) -> Result<(), FetchError> {
        session.start().await.map_err(FetchError::SessionStart)?;

        session
            .open_service(REFDATA_SERVICE)
            .await
            .map_err(|source| FetchError::ServiceOpen {
                service: REFDATA_SERVICE.to_string(),
                source,
            })?;

        let mut request = session
            .create_request(REFDATA_SERVICE, REFERENCE_DATA_REQUEST)
            .map_err(FetchError::Unexpected)?;
        for security in &spec.securities {
            request.append("securities", security.as_str());
        }
        for field in &spec.fields {
            request.append("fields", field.as_str());
        }

        tracing::info!(
            securities = ?spec.securities,
            fields = ?spec.fields,
            "Sending reference data request"
        );
        let correlation_id = session
            .send_request(&request)
            .await
            .map_err(FetchError::Unexpected)?;

        loop {
            let event = session
                .next_event(self.poll_timeout)
                .await
                .map_err(FetchError::Unexpected)?;

            if event.kind == EventKind::Timeout {
                return Err(FetchError::RequestTimeout(self.poll_timeout.as_millis()));
            }

            for message in &event.messages {
                tracing::debug!(
                    correlation_id,
                    message_type = %message.message_type,
                    "Market data message"
                );
                match decode_message(message, &spec.fields) {
                    MessageOutcome::ResponseError(text) => {
                        return Err(FetchError::ResponseError(text));
                    }
                    MessageOutcome::SecurityData(decoded) => rows.extend(decoded),
                    MessageOutcome::Ignored => {}
                }
            }

            if event.kind.is_terminal() {
                return Ok(());
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
