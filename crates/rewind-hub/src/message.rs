//! Published messages and their identifiers.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Identifier assigned to each message created by a hub.
///
/// Identifiers are strictly increasing in creation order and never reused
/// within one hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MessageId(u64);

impl MessageId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for MessageId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "m{}", self.0)
    }
}

/// Immutable record of one published payload.
///
/// `previous` names the message published immediately before on the same
/// topic. It is an id rather than a reference, so a message never keeps its
/// predecessor alive; the hub resolves it against its own message table.
#[derive(Debug)]
pub struct Message {
    id: MessageId,
    topic: Arc<str>,
    content: Vec<Value>,
    previous: Option<MessageId>,
    temporary: bool,
    published_at: DateTime<Utc>,
}

impl Message {
    pub(crate) fn new(
        id: MessageId,
        topic: Arc<str>,
        content: Vec<Value>,
        previous: Option<MessageId>,
        temporary: bool,
    ) -> Self {
        Self {
            id,
            topic,
            content,
            previous,
            temporary,
            published_at: Utc::now(),
        }
    }

    /// Identifier of this message.
    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    /// Topic the message was published on.
    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub(crate) const fn topic_key(&self) -> &Arc<str> {
        &self.topic
    }

    /// Payload values in publication order.
    #[must_use]
    pub fn content(&self) -> &[Value] {
        &self.content
    }

    /// Identifier of the previous message on the same topic, even if it has
    /// since been purged.
    #[must_use]
    pub const fn previous_id(&self) -> Option<MessageId> {
        self.previous
    }

    /// Whether the message was published from inside a handler and therefore
    /// never entered the undo history.
    #[must_use]
    pub const fn is_temporary(&self) -> bool {
        self.temporary
    }

    /// Wall-clock time the message was created.
    #[must_use]
    pub const fn published_at(&self) -> DateTime<Utc> {
        self.published_at
    }
}
