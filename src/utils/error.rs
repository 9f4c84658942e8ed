//! Error types used across `hirebeat`.
//!
//! Construction problems (bad endpoint, unreadable configuration) surface as
//! [`ChannelError`]. The outcome of a connection attempt is a
//! [`ConnectError`], which is `Clone` because every caller of `connect`
//! during the same attempt observes the same settlement. Transport writes
//! report [`TransportError`].

use thiserror::Error;

/// Failure to build a channel or client.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("invalid endpoint origin: {0}")]
    InvalidOrigin(#[from] url::ParseError),
    #[error("unsupported endpoint scheme `{0}` (expected http, https, ws or wss)")]
    UnsupportedScheme(String),
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
}

/// How a connection attempt settled when it did not reach `Open`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("connection closed before opening (code {code}: {reason})")]
    Closed { code: u16, reason: String },
    #[error("connection attempt aborted by disconnect")]
    Aborted,
    #[error("connection attempt abandoned")]
    Abandoned,
    #[error("realtime client has shut down")]
    Shutdown,
}

/// A frame could not be handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("no open connection with that id")]
    NotConnected,
    #[error("connection task has exited")]
    Closed,
}
