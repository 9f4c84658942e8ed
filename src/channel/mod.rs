//! The realtime notification channel.
//!
//! [`RealtimeChannel`] is a sans-IO state machine: it is handed a
//! [`Transport`](crate::transport::Transport) and a [`Scheduler`] at
//! construction and is driven entirely by calls into it. The async
//! [`RealtimeClient`](crate::client::RealtimeClient) wires it to
//! tokio-tungstenite and tokio timers; tests drive it with fakes and a
//! virtual clock.

pub mod engine;
pub mod scheduler;
pub mod state;

pub use engine::{ConnectFuture, RealtimeChannel};
pub use scheduler::{FiredTimer, Scheduler, Timer, TimerHandle, TokioScheduler};
pub use state::{ChannelOptions, ConnectionState, HeartbeatPolicy, ReconnectPolicy};
