//! Serializable diagnostics view of a hub.

use serde::Serialize;

use crate::message::MessageId;
use crate::subscriber::{SubscriberId, SubscriberView};

/// Point-in-time copy of a hub's tables and stacks, suitable for logs and
/// test assertions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HubSnapshot {
    /// Topics ordered by name.
    pub topics: Vec<TopicSnapshot>,
    /// Subscribers ordered by id.
    pub subscribers: Vec<SubscriberView>,
    /// Ids in the global message table.
    pub messages: Vec<MessageId>,
    /// Undo stack, oldest first.
    pub undo: Vec<MessageId>,
    /// Redo stack, bottom first; the last entry is redone next.
    pub redo: Vec<MessageId>,
    /// Top of the undo stack.
    pub timeline_tip: Option<MessageId>,
}

/// Diagnostics view of one topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicSnapshot {
    /// Topic name.
    pub topic: String,
    /// `false` while the topic is deactivated.
    pub active: bool,
    /// Attached subscribers in dispatch order.
    pub subscribers: Vec<SubscriberId>,
    /// Retained message history, ascending.
    pub messages: Vec<MessageId>,
}

impl HubSnapshot {
    /// Look up a topic by name.
    #[must_use]
    pub fn topic(&self, topic: &str) -> Option<&TopicSnapshot> {
        self.topics.iter().find(|entry| entry.topic == topic)
    }
}
