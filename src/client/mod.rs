//! The async client used by application code.
//!
//! [`RealtimeClient`] is a cheap, cloneable handle; every clone drives the
//! same underlying channel.

pub mod realtime_client;

pub use realtime_client::RealtimeClient;
