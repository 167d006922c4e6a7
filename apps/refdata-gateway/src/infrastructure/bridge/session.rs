//! Bridge Session
//!
//! [`MarketDataSession`] over a TCP connection to a terminal bridge speaking
//! the JSON-lines protocol in [`super::codec`]. One connection per session.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use super::codec::{BridgeCodec, ClientFrame};
use crate::application::ports::{
    Event, EventKind, MarketDataSession, Request, SessionConfig, SessionError, SessionFactory,
};

const SERVICE_OPENED: &str = "ServiceOpened";
const SERVICE_OPEN_FAILURE: &str = "ServiceOpenFailure";

struct Connection {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

/// Session against a terminal bridge.
pub struct BridgeSession {
    config: SessionConfig,
    codec: BridgeCodec,
    connection: Option<Connection>,
    opened_services: HashSet<String>,
    next_correlation_id: u64,
}

impl std::fmt::Debug for BridgeSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeSession")
            .field("address", &self.config.address())
            .field("connected", &self.connection.is_some())
            .field("opened_services", &self.opened_services)
            .finish_non_exhaustive()
    }
}

impl BridgeSession {
    /// Create a session that is not connected yet.
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            codec: BridgeCodec::new(),
            connection: None,
            opened_services: HashSet::new(),
            next_correlation_id: 1,
        }
    }

    /// Whether the session holds a live connection.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    fn connection_mut(&mut self) -> Result<&mut Connection, SessionError> {
        self.connection
            .as_mut()
            .ok_or_else(|| SessionError::InvalidState("session not started".to_string()))
    }

    async fn write_frame(&mut self, frame: &ClientFrame) -> Result<(), SessionError> {
        let line = self.codec.encode(frame)?;
        let connection = self.connection_mut()?;
        connection.writer.write_all(line.as_bytes()).await?;
        connection.writer.flush().await?;
        Ok(())
    }

    async fn read_event(&mut self) -> Result<Event, SessionError> {
        let codec = self.codec;
        let connection = self.connection_mut()?;
        loop {
            match connection.lines.next_line().await? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => return Ok(codec.decode(&line)?),
                None => return Err(SessionError::Disconnected),
            }
        }
    }

    async fn await_service_status(&mut self, service: &str) -> Result<(), SessionError> {
        loop {
            let event = self.read_event().await?;
            if event.kind != EventKind::ServiceStatus {
                tracing::trace!(kind = ?event.kind, "Skipping event while opening service");
                continue;
            }
            for message in &event.messages {
                match message.message_type.as_str() {
                    SERVICE_OPENED => return Ok(()),
                    SERVICE_OPEN_FAILURE => {
                        let reason = message
                            .element("reason")
                            .and_then(|r| {
                                r.child_text("description")
                                    .or_else(|| r.child_text("message"))
                            })
                            .unwrap_or_else(|| "service open failure".to_string());
                        return Err(SessionError::ServiceUnavailable {
                            service: service.to_string(),
                            reason,
                        });
                    }
                    _ => {}
                }
            }
        }
    }
}

#[async_trait]
impl MarketDataSession for BridgeSession {
    async fn start(&mut self) -> Result<(), SessionError> {
        if self.connection.is_some() {
            return Err(SessionError::InvalidState(
                "session already started".to_string(),
            ));
        }

        let address = self.config.address();
        tracing::debug!(address = %address, "Connecting to market data bridge");

        let stream = match tokio::time::timeout(
            self.config.connect_timeout,
            TcpStream::connect(&address),
        )
        .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(SessionError::Connect {
                    address,
                    message: e.to_string(),
                });
            }
            Err(_) => {
                return Err(SessionError::Connect {
                    address,
                    message: format!(
                        "timed out after {} ms",
                        self.config.connect_timeout.as_millis()
                    ),
                });
            }
        };
        stream.set_nodelay(true)?;

        let (read_half, writer) = stream.into_split();
        self.connection = Some(Connection {
            lines: BufReader::new(read_half).lines(),
            writer,
        });

        tracing::debug!(address = %address, "Market data session started");
        Ok(())
    }

    async fn open_service(&mut self, service: &str) -> Result<(), SessionError> {
        self.write_frame(&ClientFrame::OpenService {
            service: service.to_string(),
        })
        .await?;

        let wait = self.config.connect_timeout;
        match tokio::time::timeout(wait, self.await_service_status(service)).await {
            Ok(Ok(())) => {
                self.opened_services.insert(service.to_string());
                tracing::debug!(service, "Service opened");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SessionError::ServiceUnavailable {
                service: service.to_string(),
                reason: format!("no service status within {} ms", wait.as_millis()),
            }),
        }
    }

    fn create_request(&self, service: &str, operation: &str) -> Result<Request, SessionError> {
        if !self.opened_services.contains(service) {
            return Err(SessionError::InvalidState(format!(
                "service {service} is not open"
            )));
        }
        Ok(Request::new(service, operation))
    }

    async fn send_request(&mut self, request: &Request) -> Result<u64, SessionError> {
        let correlation_id = self.next_correlation_id;
        self.write_frame(&ClientFrame::send_request(correlation_id, request))
            .await?;
        self.next_correlation_id += 1;

        tracing::debug!(
            correlation_id,
            operation = request.operation(),
            "Request sent"
        );
        Ok(correlation_id)
    }

    async fn next_event(&mut self, timeout: Duration) -> Result<Event, SessionError> {
        tokio::time::timeout(timeout, self.read_event())
            .await
            .unwrap_or_else(|_| Ok(Event::timeout()))
    }

    async fn stop(&mut self) {
        self.opened_services.clear();
        let Some(mut connection) = self.connection.take() else {
            return;
        };

        if let Ok(line) = self.codec.encode(&ClientFrame::Stop) {
            if let Err(e) = connection.writer.write_all(line.as_bytes()).await {
                tracing::debug!(error = %e, "Could not send stop frame");
            }
        }
        if let Err(e) = connection.writer.shutdown().await {
            tracing::debug!(error = %e, "Socket shutdown failed");
        }
        tracing::debug!("Market data session stopped");
    }
}

/// Creates a [`BridgeSession`] per lookup.
#[derive(Debug, Default, Clone, Copy)]
pub struct BridgeSessionFactory;

impl BridgeSessionFactory {
    /// Create a new factory.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl SessionFactory for BridgeSessionFactory {
    type Session = BridgeSession;

    fn create(&self, config: &SessionConfig) -> Self::Session {
        BridgeSession::new(config.clone())
    }
}

// =============================================================================
// Tests
// =============================================================================
