//! Port Interfaces
//!
//! Defines the interfaces (ports) for external systems following
//! the Hexagonal Architecture pattern. These are the contracts that
//! infrastructure adapters must implement.
//!
//! ## Driven Ports (Outbound)
//!
//! - `MarketDataSession`: Stateful request/response session to the terminal
//! - `SessionFactory`: Creates one session per lookup

mod session_port;

pub use session_port::{
    Event, EventKind, MarketDataSession, REFDATA_SERVICE, REFERENCE_DATA_REQUEST, Request,
    SessionConfig, SessionError, SessionFactory,
};
