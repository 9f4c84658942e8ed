//! Wire format shared by both directions:
//! `{ "type": <string>, "data": <object>, "timestamp": <ms since epoch> }`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::dispatch::Topic;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default = "empty_object")]
    pub data: Value,
    #[serde(default)]
    pub timestamp: i64,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl Envelope {
    /// Build an outbound envelope. A `null` payload is sent as `{}`.
    pub fn new(kind: impl Into<String>, data: Value, timestamp: i64) -> Self {
        Self {
            kind: kind.into(),
            data: if data.is_null() { empty_object() } else { data },
            timestamp,
        }
    }

    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn classify(&self) -> Inbound {
        Inbound::from_type(&self.kind)
    }
}

/// What an inbound message means to the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// Re-emitted to subscribers of this topic.
    Event(Topic),
    /// Liveness reply, consumed by the heartbeat.
    Pong,
    /// Any type this client does not know; logged and dropped.
    Unrecognized(String),
}

impl Inbound {
    pub fn from_type(kind: &str) -> Self {
        match kind {
            "pong" => Inbound::Pong,
            other => Topic::from_wire(other)
                .map(Inbound::Event)
                .unwrap_or_else(|| Inbound::Unrecognized(other.to_string())),
        }
    }
}

pub const DEFAULT_ANALYTICS_PERIOD: &str = "7d";
pub const DEFAULT_NOTIFICATION_LIMIT: u32 = 10;

/// Typed outbound requests understood by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Ping,
    RequestAnalytics { period: String },
    RequestNotifications { limit: u32 },
    RequestSystemStatus,
    UpdateJob { job_id: String, updates: Value },
    UpdateContent { content_id: String, updates: Value },
    UserActivity { activity: String, details: Value },
}

impl Request {
    pub fn kind(&self) -> &'static str {
        match self {
            Request::Ping => "ping",
            Request::RequestAnalytics { .. } => "request_analytics",
            Request::RequestNotifications { .. } => "request_notifications",
            Request::RequestSystemStatus => "request_system_status",
            Request::UpdateJob { .. } => "update_job",
            Request::UpdateContent { .. } => "update_content",
            Request::UserActivity { .. } => "user_activity",
        }
    }

    /// Split into the envelope `type` and `data`.
    pub fn into_parts(self) -> (&'static str, Value) {
        let kind = self.kind();
        let data = match self {
            Request::Ping | Request::RequestSystemStatus => empty_object(),
            Request::RequestAnalytics { period } => json!({ "period": period }),
            Request::RequestNotifications { limit } => json!({ "limit": limit }),
            Request::UpdateJob { job_id, updates } => {
                json!({ "jobId": job_id, "updates": updates })
            }
            Request::UpdateContent {
                content_id,
                updates,
            } => json!({ "contentId": content_id, "updates": updates }),
            Request::UserActivity { activity, details } => {
                json!({ "activity": activity, "details": details })
            }
        };
        (kind, data)
    }
}
