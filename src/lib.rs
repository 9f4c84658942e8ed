//! # hirebeat
//!
//! `hirebeat` is the real-time notification channel for the careers site:
//! one websocket connection per process that survives network drops with
//! capped exponential backoff, detects silently dead connections with a
//! ping/pong heartbeat, and fans inbound messages out to subscribers by
//! topic.
//!
//! ## Modules
//!
//! - `channel`: the connection state machine, its reconnect and heartbeat
//!   policies, and the timer capability it is driven by.
//! - `dispatch`: topics and the ordered listener registry.
//! - `transport`: wire envelope, endpoint derivation and the websocket
//!   transport.
//! - `client`: the async, cloneable handle used by application code.
//! - `config`: layered settings loading.
//! - `utils`: error types and logging setup.

pub mod channel;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod transport;
pub mod utils;

pub use channel::{ConnectionState, RealtimeChannel};
pub use client::RealtimeClient;
pub use dispatch::{Listener, Topic, listener};
pub use transport::{Envelope, Request};
