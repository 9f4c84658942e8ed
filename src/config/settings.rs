use serde::Deserialize;

/// Top-level configuration for the realtime client.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub endpoint: EndpointSettings,
    pub reconnect: ReconnectSettings,
    pub heartbeat: HeartbeatSettings,
    pub logging: LoggingSettings,
}

/// Where the realtime endpoint lives.
///
/// `origin` is the page/API origin (`http`, `https`, `ws` or `wss`); the
/// websocket scheme is derived from it.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EndpointSettings {
    pub origin: String,
    pub path: String,
}

/// Capped exponential backoff parameters.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ReconnectSettings {
    pub base_delay_ms: u64,
    pub max_attempts: u32,
}

/// Liveness probe timing.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct HeartbeatSettings {
    pub interval_ms: u64,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
}

/// Settings as read from files or the environment, any field may be absent.
#[derive(Debug, Deserialize, Default)]
pub struct PartialSettings {
    pub endpoint: Option<PartialEndpointSettings>,
    pub reconnect: Option<PartialReconnectSettings>,
    pub heartbeat: Option<PartialHeartbeatSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialEndpointSettings {
    pub origin: Option<String>,
    pub path: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialReconnectSettings {
    pub base_delay_ms: Option<u64>,
    pub max_attempts: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PartialHeartbeatSettings {
    pub interval_ms: Option<u64>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: EndpointSettings {
                origin: "http://127.0.0.1:8080".to_string(),
                path: "/ws".to_string(),
            },
            reconnect: ReconnectSettings {
                base_delay_ms: 1000,
                max_attempts: 5,
            },
            heartbeat: HeartbeatSettings {
                interval_ms: 30_000,
                timeout_ms: 5_000,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl PartialSettings {
    /// Fill every missing field from `defaults`.
    pub fn merge_over(self, defaults: Settings) -> Settings {
        let endpoint = self.endpoint;
        let reconnect = self.reconnect;
        let heartbeat = self.heartbeat;
        let logging = self.logging;

        Settings {
            endpoint: EndpointSettings {
                origin: endpoint
                    .as_ref()
                    .and_then(|e| e.origin.clone())
                    .unwrap_or(defaults.endpoint.origin),
                path: endpoint
                    .as_ref()
                    .and_then(|e| e.path.clone())
                    .unwrap_or(defaults.endpoint.path),
            },
            reconnect: ReconnectSettings {
                base_delay_ms: reconnect
                    .as_ref()
                    .and_then(|r| r.base_delay_ms)
                    .unwrap_or(defaults.reconnect.base_delay_ms),
                max_attempts: reconnect
                    .as_ref()
                    .and_then(|r| r.max_attempts)
                    .unwrap_or(defaults.reconnect.max_attempts),
            },
            heartbeat: HeartbeatSettings {
                interval_ms: heartbeat
                    .as_ref()
                    .and_then(|h| h.interval_ms)
                    .unwrap_or(defaults.heartbeat.interval_ms),
                timeout_ms: heartbeat
                    .as_ref()
                    .and_then(|h| h.timeout_ms)
                    .unwrap_or(defaults.heartbeat.timeout_ms),
            },
            logging: LoggingSettings {
                level: logging
                    .and_then(|l| l.level)
                    .unwrap_or(defaults.logging.level),
            },
        }
    }
}
