//! Per-topic state: message history and attached subscribers.

use std::sync::Arc;

use serde_json::Value;

use crate::message::{Message, MessageId};
use crate::subscriber::SubscriberId;

pub(crate) struct Publisher {
    topic: Arc<str>,
    subscribers: Vec<SubscriberId>,
    messages: Vec<Arc<Message>>,
    active: bool,
}

impl Publisher {
    pub(crate) const fn new(topic: Arc<str>) -> Self {
        Self {
            topic,
            subscribers: Vec::new(),
            messages: Vec::new(),
            active: true,
        }
    }

    pub(crate) const fn topic(&self) -> &Arc<str> {
        &self.topic
    }

    pub(crate) const fn is_active(&self) -> bool {
        self.active
    }

    pub(crate) const fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub(crate) fn messages(&self) -> &[Arc<Message>] {
        &self.messages
    }

    pub(crate) fn last_message(&self) -> Option<&Arc<Message>> {
        self.messages.last()
    }

    /// Append a message; ids arrive in increasing order so history stays sorted.
    pub(crate) fn push_message(&mut self, message: Arc<Message>) {
        debug_assert!(
            self.last_message()
                .is_none_or(|last| last.id() < message.id()),
            "publisher history must stay sorted by id"
        );
        self.messages.push(message);
    }

    pub(crate) fn remove_message(&mut self, id: MessageId) -> bool {
        let before = self.messages.len();
        self.messages.retain(|message| message.id() != id);
        self.messages.len() != before
    }

    pub(crate) fn subscriber_ids(&self) -> &[SubscriberId] {
        &self.subscribers
    }

    pub(crate) fn attach(&mut self, id: SubscriberId) {
        self.subscribers.push(id);
    }

    pub(crate) fn detach(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|existing| *existing != id);
        self.subscribers.len() != before
    }

    pub(crate) fn view(&self) -> PublisherView {
        PublisherView {
            topic: self.topic.to_string(),
            active: self.active,
            subscriber_count: self.subscribers.len(),
            message_count: self.messages.len(),
            tip: self.messages.last().cloned(),
        }
    }
}

/// Read-only snapshot of a publisher.
#[derive(Debug, Clone)]
pub struct PublisherView {
    /// Topic name.
    pub topic: String,
    /// `false` while the topic is deactivated.
    pub active: bool,
    /// Number of attached subscribers, online or not.
    pub subscriber_count: usize,
    /// Number of retained messages in the topic history.
    pub message_count: usize,
    /// Most recent retained message.
    pub tip: Option<Arc<Message>>,
}

impl PublisherView {
    /// Content of the most recent retained message.
    #[must_use]
    pub fn tip_content(&self) -> Option<&[Value]> {
        self.tip.as_deref().map(Message::content)
    }
}
