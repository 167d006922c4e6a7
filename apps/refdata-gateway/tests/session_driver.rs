//! Session Driver Integration Tests
//!
//! Drives `ReferenceDataService` against a scripted session that replays a
//! fixed event sequence and counts teardown calls.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use test_case::test_case;

use refdata_gateway::{
    Event, EventKind, FieldValue, MarketDataSession, OutcomeKind, ReferenceDataService, Request,
    RequestSpec, SessionConfig, SessionError, SessionFactory,
};

// =============================================================================
// Scripted Session
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fail {
    Nowhere,
    Start,
    Open,
    Send,
}

#[derive(Clone)]
struct ScriptedFactory {
    events: Vec<Result<Event, String>>,
    fail: Fail,
    stops: Arc<AtomicUsize>,
}

impl ScriptedFactory {
    fn new(events: Vec<Result<Event, String>>) -> Self {
        Self {
            events,
            fail: Fail::Nowhere,
            stops: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn failing(fail: Fail) -> Self {
        Self {
            fail,
            ..Self::new(Vec::new())
        }
    }

    fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

struct ScriptedSession {
    events: VecDeque<Result<Event, String>>,
    fail: Fail,
    stops: Arc<AtomicUsize>,
}

#[async_trait]
impl MarketDataSession for ScriptedSession {
    async fn start(&mut self) -> Result<(), SessionError> {
        if self.fail == Fail::Start {
            return Err(SessionError::Connect {
                address: "localhost:8194".to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }

    async fn open_service(&mut self, service: &str) -> Result<(), SessionError> {
        if self.fail == Fail::Open {
            return Err(SessionError::ServiceUnavailable {
                service: service.to_string(),
                reason: "not entitled".to_string(),
            });
        }
        Ok(())
    }

    async fn send_request(&mut self, _request: &Request) -> Result<u64, SessionError> {
        if self.fail == Fail::Send {
            return Err(SessionError::Disconnected);
        }
        Ok(1)
    }

    async fn next_event(&mut self, _timeout: Duration) -> Result<Event, SessionError> {
        match self.events.pop_front() {
            Some(Ok(event)) => Ok(event),
            Some(Err(message)) => Err(SessionError::Codec(message)),
            None => Ok(Event::timeout()),
        }
    }

    async fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

impl SessionFactory for ScriptedFactory {
    type Session = ScriptedSession;

    fn create(&self, _config: &SessionConfig) -> Self::Session {
        ScriptedSession {
            events: self.events.iter().cloned().collect(),
            fail: self.fail,
            stops: Arc::clone(&self.stops),
        }
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn event(json: &str) -> Result<Event, String> {
    Ok(serde_json::from_str(json).unwrap())
}

fn spec(securities: &[&str], fields: &[&str]) -> RequestSpec {
    RequestSpec::new(
        securities.iter().map(ToString::to_string).collect(),
        fields.iter().map(ToString::to_string).collect(),
    )
}

fn service(factory: ScriptedFactory) -> ReferenceDataService<ScriptedFactory> {
    ReferenceDataService::new(factory, Arc::new(SessionConfig::default()))
}

const TWO_SECURITIES: &str = r#"{"eventType":"RESPONSE","messages":[{"messageType":"ReferenceDataResponse","elements":{"securityData":[
    {"security":"7203 JT EQUITY","fieldData":{"PX_LAST":2841.5,"ALL_DAY_VWAP":2838.25}},
    {"security":"ZZZZ US EQUITY","securityError":{"category":"BAD_SEC","message":"Unknown/Invalid security"},"fieldData":{}}
]}}]}"#;

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn batch_rows_carry_exactly_the_requested_fields() {
    let factory = ScriptedFactory::new(vec![event(TWO_SECURITIES)]);
    let outcome = service(factory.clone())
        .fetch_reference_data(&spec(
            &["7203 JT EQUITY", "ZZZZ US EQUITY"],
            &["PX_LAST", "ALL_DAY_VWAP"],
        ))
        .await;

    assert_eq!(outcome.kind, OutcomeKind::Success);
    assert!(outcome.error.is_none());
    let rows = outcome.rows.unwrap();
    assert_eq!(rows.len(), 2);

    let first: Vec<&str> = rows[0].keys().collect();
    assert_eq!(first, vec!["security", "PX_LAST", "ALL_DAY_VWAP"]);
    assert_eq!(rows[0].get("PX_LAST"), Some(&FieldValue::Float(2841.5)));

    let second: Vec<&str> = rows[1].keys().collect();
    assert_eq!(
        second,
        vec!["security", "securityError", "PX_LAST", "ALL_DAY_VWAP"]
    );
    assert!(rows[1].get("PX_LAST").unwrap().is_null());
    assert!(!rows[0].contains_key("securityError"));
    assert_eq!(factory.stops(), 1);
}

#[tokio::test]
async fn field_exception_is_an_error_string() {
    let factory = ScriptedFactory::new(vec![event(
        r#"{"eventType":"RESPONSE","messages":[{"messageType":"ReferenceDataResponse","elements":{"securityData":[
            {"security":"MSFT US EQUITY",
             "fieldExceptions":[{"fieldId":"ALL_DAY_VWAP","errorInfo":{"message":"Field not applicable to security"}}],
             "fieldData":{"PX_LAST":410.0}}
        ]}}]}"#,
    )]);
    let outcome = service(factory)
        .fetch_reference_data(&spec(&["MSFT US EQUITY"], &["PX_LAST", "ALL_DAY_VWAP"]))
        .await;

    let rows = outcome.rows.unwrap();
    let vwap = rows[0].get("ALL_DAY_VWAP").unwrap();
    assert!(vwap.as_str().unwrap().starts_with("Field Error: "));
    assert_eq!(rows[0].security(), "MSFT US EQUITY");
}

#[tokio::test]
async fn status_events_before_the_response_are_skipped() {
    let factory = ScriptedFactory::new(vec![
        event(r#"{"eventType":"SESSION_STATUS","messages":[{"messageType":"SessionStarted"}]}"#),
        event(r#"{"eventType":"REQUEST_STATUS","messages":[]}"#),
        event(TWO_SECURITIES),
    ]);
    let outcome = service(factory)
        .fetch_reference_data(&spec(&["7203 JT EQUITY"], &["PX_LAST"]))
        .await;

    assert_eq!(outcome.kind, OutcomeKind::Success);
    assert_eq!(outcome.row_count(), 2);
}

#[tokio::test]
async fn timeout_before_any_message_reports_error() {
    let factory = ScriptedFactory::new(Vec::new());
    let outcome = service(factory.clone())
        .with_poll_timeout(Duration::from_millis(250))
        .fetch_reference_data(&spec(&["7203 JT EQUITY"], &["PX_LAST"]))
        .await;

    assert!(!outcome.has_rows());
    assert!(outcome.error.unwrap().contains("timed out"));
    assert_eq!(outcome.kind, OutcomeKind::RequestTimeout);
    assert_eq!(factory.stops(), 1);
}

#[tokio::test]
async fn timeout_after_partial_data_discards_it() {
    let factory = ScriptedFactory::new(vec![event(
        r#"{"eventType":"PARTIAL_RESPONSE","messages":[{"messageType":"ReferenceDataResponse","elements":{"securityData":[
            {"security":"7203 JT EQUITY","fieldData":{"PX_LAST":2841.5}}
        ]}}]}"#,
    )]);
    let outcome = service(factory)
        .fetch_reference_data(&spec(&["7203 JT EQUITY", "MSFT US EQUITY"], &["PX_LAST"]))
        .await;

    assert!(outcome.rows.is_none());
    assert_eq!(
        outcome.error.as_deref(),
        Some("Market data request timed out after 5000 ms")
    );
}

#[tokio::test]
async fn response_error_after_data_in_same_poll_keeps_the_row() {
    let factory = ScriptedFactory::new(vec![event(
        r#"{"eventType":"PARTIAL_RESPONSE","messages":[
            {"messageType":"ReferenceDataResponse","elements":{"securityData":[
                {"security":"7203 JT EQUITY","fieldData":{"PX_LAST":2841.5}}
            ]}},
            {"messageType":"ReferenceDataResponse","elements":{"responseError":{"category":"LIMIT","message":"Daily capacity reached"}}},
            {"messageType":"ReferenceDataResponse","elements":{"securityData":[
                {"security":"MSFT US EQUITY","fieldData":{"PX_LAST":410.0}}
            ]}}
        ]}"#,
    )]);
    let outcome = service(factory.clone())
        .fetch_reference_data(&spec(&["7203 JT EQUITY", "MSFT US EQUITY"], &["PX_LAST"]))
        .await;

    let rows = outcome.rows.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].security(), "7203 JT EQUITY");
    assert_eq!(
        outcome.error.as_deref(),
        Some("Response Error: Daily capacity reached")
    );
    assert_eq!(outcome.kind, OutcomeKind::ResponseError);
    assert_eq!(factory.stops(), 1);
}

#[test_case(Fail::Start, OutcomeKind::SessionStartFailure, "Failed to start market data session: could not connect to localhost:8194: connection refused" ; "start")]
#[test_case(Fail::Open, OutcomeKind::ServiceOpenFailure, "Failed to open //blp/refdata service: service //blp/refdata unavailable: not entitled" ; "open")]
#[test_case(Fail::Send, OutcomeKind::UnexpectedFault, "Exception while getting data: connection closed by market data service" ; "send")]
#[tokio::test]
async fn setup_failures_stop_once(fail: Fail, kind: OutcomeKind, message: &str) {
    let factory = ScriptedFactory::failing(fail);
    let outcome = service(factory.clone())
        .fetch_reference_data(&spec(&["7203 JT EQUITY"], &["PX_LAST"]))
        .await;

    assert!(!outcome.has_rows());
    assert_eq!(outcome.error.as_deref(), Some(message));
    assert_eq!(outcome.kind, kind);
    assert_eq!(factory.stops(), 1);
}

#[tokio::test]
async fn poll_fault_becomes_message_and_stops_once() {
    let factory = ScriptedFactory::new(vec![
        event(r#"{"eventType":"PARTIAL_RESPONSE","messages":[]}"#),
        Err("unexpected end of frame".to_string()),
    ]);
    let outcome = service(factory.clone())
        .fetch_reference_data(&spec(&["7203 JT EQUITY"], &["PX_LAST"]))
        .await;

    assert!(!outcome.has_rows());
    assert_eq!(
        outcome.error.as_deref(),
        Some("Exception while getting data: malformed frame: unexpected end of frame")
    );
    assert_eq!(factory.stops(), 1);
}

#[tokio::test]
async fn poll_fault_after_partial_data_keeps_the_row() {
    let factory = ScriptedFactory::new(vec![
        event(
            r#"{"eventType":"PARTIAL_RESPONSE","messages":[{"messageType":"ReferenceDataResponse","elements":{"securityData":[
                {"security":"7203 JT EQUITY","fieldData":{"PX_LAST":2841.5}}
            ]}}]}"#,
        ),
        Err("unexpected end of frame".to_string()),
    ]);
    let outcome = service(factory.clone())
        .fetch_reference_data(&spec(&["7203 JT EQUITY", "MSFT US EQUITY"], &["PX_LAST"]))
        .await;

    let rows = outcome.rows.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].security(), "7203 JT EQUITY");
    assert_eq!(rows[0].get("PX_LAST"), Some(&FieldValue::Float(2841.5)));
    assert_eq!(outcome.kind, OutcomeKind::UnexpectedFault);
    assert_eq!(
        outcome.error.as_deref(),
        Some("Exception while getting data: malformed frame: unexpected end of frame")
    );
    assert_eq!(factory.stops(), 1);
}

#[tokio::test]
async fn concurrent_lookups_use_independent_sessions() {
    let factory = ScriptedFactory::new(vec![event(TWO_SECURITIES)]);
    let service = Arc::new(service(factory.clone()));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                service
                    .fetch_reference_data(&spec(&["7203 JT EQUITY"], &["PX_LAST"]))
                    .await
            })
        })
        .collect();

    for handle in handles {
        let outcome = handle.await.unwrap();
        assert_eq!(outcome.row_count(), 2);
    }
    assert_eq!(factory.stops(), 4);
}

#[test]
fn event_kinds_from_script_are_classified() {
    let event = event(r#"{"eventType":"PARTIAL_RESPONSE"}"#).unwrap();
    assert_eq!(event.kind, EventKind::PartialResponse);
    assert!(!event.kind.is_terminal());
}
