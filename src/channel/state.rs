use std::fmt;
use std::time::Duration;

use super::scheduler::TimerHandle;
use crate::config::Settings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
            ConnectionState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Capped exponential backoff: attempt `n` (1-based) waits
/// `base_delay * 2^(n-1)`; nothing is scheduled past `max_attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub base_delay: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        self.base_delay
            .saturating_mul(2u32.checked_pow(exponent).unwrap_or(u32::MAX))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatPolicy {
    pub interval: Duration,
    pub timeout: Duration,
}

impl Default for HeartbeatPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            timeout: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelOptions {
    pub reconnect: ReconnectPolicy,
    pub heartbeat: HeartbeatPolicy,
}

impl From<&Settings> for ChannelOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            reconnect: ReconnectPolicy {
                base_delay: Duration::from_millis(settings.reconnect.base_delay_ms),
                max_attempts: settings.reconnect.max_attempts,
            },
            heartbeat: HeartbeatPolicy {
                interval: Duration::from_millis(settings.heartbeat.interval_ms),
                timeout: Duration::from_millis(settings.heartbeat.timeout_ms),
            },
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct ReconnectState {
    pub attempts_made: u32,
    pub timer: Option<TimerHandle>,
}

/// `pending` is only set while a `ping` awaits its `pong`; there is never
/// more than one.
#[derive(Debug, Default)]
pub(crate) struct HeartbeatState {
    pub interval: Option<TimerHandle>,
    pub pending: Option<TimerHandle>,
}
