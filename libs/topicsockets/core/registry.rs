use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Callback invoked with the decoded payload of each frame on a topic
pub type Listener = Arc<dyn Fn(Value) + Send + Sync>;

/// Opaque token identifying one registered listener
///
/// Removal goes through this token rather than callback identity, so two
/// registrations of the same closure stay independent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Topic interest of the channel: topic name to ordered listener list
///
/// The registry is the source of truth for what the connection should be
/// subscribed to. Listeners are kept in registration order and dispatch
/// walks them in that order.
#[derive(Default)]
pub struct TopicRegistry {
    topics: HashMap<String, Vec<(ListenerId, Listener)>>,
    next_id: u64,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for a topic
    ///
    /// Returns the removal token and whether this listener is the first
    /// one for the topic (i.e. the transport-level subscription is new).
    pub fn add(&mut self, topic: &str, listener: Listener) -> (ListenerId, bool) {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        let entries = self.topics.entry(topic.to_string()).or_default();
        let first = entries.is_empty();
        entries.push((id, listener));
        (id, first)
    }

    /// Remove one listener by token
    ///
    /// Returns `None` if the token is not registered (already removed or
    /// cleared), otherwise `Some(last)` where `last` says the topic has no
    /// listeners left and the transport-level subscription can be released.
    pub fn remove(&mut self, topic: &str, id: ListenerId) -> Option<bool> {
        let entries = self.topics.get_mut(topic)?;
        let before = entries.len();
        entries.retain(|(entry_id, _)| *entry_id != id);
        if entries.len() == before {
            return None;
        }
        let last = entries.is_empty();
        if last {
            self.topics.remove(topic);
        }
        Some(last)
    }

    /// Copy the listener list for a topic, in registration order
    ///
    /// Dispatch works from this snapshot so listeners run without the
    /// registry lock held; a removal that races an in-flight frame may
    /// therefore still see that frame delivered once.
    pub fn snapshot(&self, topic: &str) -> Vec<Listener> {
        self.topics
            .get(topic)
            .map(|entries| entries.iter().map(|(_, l)| Arc::clone(l)).collect())
            .unwrap_or_default()
    }

    /// Topics that currently have at least one listener
    pub fn topics(&self) -> Vec<String> {
        self.topics.keys().cloned().collect()
    }

    pub fn listener_count(&self, topic: &str) -> usize {
        self.topics.get(topic).map_or(0, |entries| entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    /// Drop every registration
    pub fn clear(&mut self) {
        self.topics.clear();
    }
}
