//! Local fan-out of channel events to subscribers.
//!
//! The registry maps each [`Topic`] to an ordered list of listeners.
//! Emitting a topic calls its listeners in registration order; a listener
//! that panics is logged and skipped without affecting the others.

pub mod topic;

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};

use serde_json::Value;
use tracing::{debug, error};

pub use topic::{Listener, Topic, TopicListeners, UnknownTopic, listener};

#[derive(Debug, Default)]
pub struct ListenerRegistry {
    topics: HashMap<Topic, TopicListeners>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `listener` to `topic`. Duplicate registrations are kept.
    pub fn subscribe(&mut self, topic: Topic, listener: Listener) {
        self.topics.entry(topic).or_default().subscribe(listener);
    }

    /// Remove the first registration of `listener` on `topic`.
    /// Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, topic: Topic, listener: &Listener) -> bool {
        let removed = self
            .topics
            .get_mut(&topic)
            .is_some_and(|listeners| listeners.unsubscribe(listener));

        if self.topics.get(&topic).is_some_and(TopicListeners::is_empty) {
            self.topics.remove(&topic);
        }
        removed
    }

    pub fn listener_count(&self, topic: Topic) -> usize {
        self.topics.get(&topic).map_or(0, TopicListeners::len)
    }

    /// Invoke every listener of `topic` with `payload`.
    ///
    /// Returns how many listeners completed without panicking.
    pub fn emit(&self, topic: Topic, payload: &Value) -> usize {
        let Some(listeners) = self.topics.get(&topic) else {
            debug!("no listeners for {topic}");
            return 0;
        };

        let mut delivered = 0;
        for (index, listener) in listeners.iter().enumerate() {
            match catch_unwind(AssertUnwindSafe(|| listener(payload))) {
                Ok(()) => delivered += 1,
                Err(panic) => {
                    let reason = panic
                        .downcast_ref::<&str>()
                        .map(|s| s.to_string())
                        .or_else(|| panic.downcast_ref::<String>().cloned())
                        .unwrap_or_else(|| "non-string panic".to_string());
                    error!("listener #{index} on {topic} panicked: {reason}");
                }
            }
        }
        delivered
    }
}
