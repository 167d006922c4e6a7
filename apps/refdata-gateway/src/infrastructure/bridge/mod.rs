//! Terminal Bridge Adapter
//!
//! Implements the market data session port against a bridge process that
//! fronts the terminal API and speaks JSON lines over TCP.

pub mod codec;
pub mod session;

pub use codec::{BridgeCodec, ClientFrame, CodecError};
pub use session::{BridgeSession, BridgeSessionFactory};
