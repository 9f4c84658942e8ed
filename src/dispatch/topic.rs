//! Topic names and per-topic listener lists.
//!
//! A `TopicListeners` keeps registrations in insertion order and does not
//! deduplicate: registering the same listener twice means it runs twice.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;

/// A callback invoked with the payload of a topic event.
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Wrap a closure as a [`Listener`]. Keep the returned handle to unsubscribe.
pub fn listener<F>(f: F) -> Listener
where
    F: Fn(&Value) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Every topic a subscriber can observe.
///
/// `Connected`, `Disconnected` and `Error` are raised locally by the channel
/// lifecycle; the remaining topics mirror inbound message types.
/// `Connected` is also raised when the server sends a `connected` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Connected,
    Disconnected,
    Error,
    Notification,
    AnalyticsUpdate,
    SystemAlert,
    UserActivity,
    JobUpdate,
    ContentUpdate,
}

impl Topic {
    pub const ALL: [Topic; 9] = [
        Topic::Connected,
        Topic::Disconnected,
        Topic::Error,
        Topic::Notification,
        Topic::AnalyticsUpdate,
        Topic::SystemAlert,
        Topic::UserActivity,
        Topic::JobUpdate,
        Topic::ContentUpdate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Topic::Connected => "connected",
            Topic::Disconnected => "disconnected",
            Topic::Error => "error",
            Topic::Notification => "notification",
            Topic::AnalyticsUpdate => "analytics_update",
            Topic::SystemAlert => "system_alert",
            Topic::UserActivity => "user_activity",
            Topic::JobUpdate => "job_update",
            Topic::ContentUpdate => "content_update",
        }
    }

    /// The topic a server message of type `name` is routed to, if the server
    /// is allowed to address it. Lifecycle-only topics are never returned.
    pub fn from_wire(name: &str) -> Option<Topic> {
        match name {
            "connected" => Some(Topic::Connected),
            "notification" => Some(Topic::Notification),
            "analytics_update" => Some(Topic::AnalyticsUpdate),
            "system_alert" => Some(Topic::SystemAlert),
            "user_activity" => Some(Topic::UserActivity),
            "job_update" => Some(Topic::JobUpdate),
            "content_update" => Some(Topic::ContentUpdate),
            _ => None,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownTopic(pub String);

impl fmt::Display for UnknownTopic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown topic `{}`", self.0)
    }
}

impl std::error::Error for UnknownTopic {}

impl FromStr for Topic {
    type Err = UnknownTopic;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Topic::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| UnknownTopic(s.to_string()))
    }
}

/// Ordered registrations for one topic.
#[derive(Default, Clone)]
pub struct TopicListeners {
    listeners: Vec<Listener>,
}

impl TopicListeners {
    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    /// Remove the first registration of `listener` (by identity).
    pub fn unsubscribe(&mut self, listener: &Listener) -> bool {
        match self
            .listeners
            .iter()
            .position(|l| std::ptr::addr_eq(Arc::as_ptr(l), Arc::as_ptr(listener)))
        {
            Some(index) => {
                self.listeners.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Listener> {
        self.listeners.iter()
    }
}

impl fmt::Debug for TopicListeners {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TopicListeners")
            .field("len", &self.listeners.len())
            .finish()
    }
}
