//! Connection plumbing between the channel and the network.
//!
//! The channel never touches sockets itself. It drives a [`Transport`]
//! (`open`/`send`/`close`) and is fed back [`TransportEvent`]s. Every
//! connection attempt carries its own [`ConnectionId`] so events from a
//! connection the channel has already abandoned can be told apart and
//! ignored.

pub mod endpoint;
pub mod message;
pub mod websocket;

use std::fmt;

use url::Url;

use crate::utils::error::TransportError;

pub use endpoint::Endpoint;
pub use message::{Envelope, Inbound, Request};
pub use websocket::WsTransport;

/// Close code for an intentional, locally initiated close.
pub const NORMAL_CLOSURE: u16 = 1000;
/// Close frame carried no status code.
pub const NO_STATUS: u16 = 1005;
/// Connection dropped without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;
/// Forced close after an unanswered liveness probe.
pub const HEARTBEAT_TIMEOUT: u16 = 4000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportEvent {
    pub connection: ConnectionId,
    pub kind: TransportEventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEventKind {
    Opened,
    Frame(String),
    Closed { code: u16, reason: String },
    Error(String),
}

impl TransportEvent {
    pub fn new(connection: ConnectionId, kind: TransportEventKind) -> Self {
        Self { connection, kind }
    }
}

/// A message-oriented connection factory.
///
/// `open` and `close` only start work; their outcome is reported later as
/// events for the same `ConnectionId`.
pub trait Transport {
    fn open(&mut self, connection: ConnectionId, url: &Url);

    fn send(&mut self, connection: ConnectionId, frame: String) -> Result<(), TransportError>;

    fn close(&mut self, connection: ConnectionId, code: u16, reason: &str);
}

#[cfg(test)]
mod tests;
