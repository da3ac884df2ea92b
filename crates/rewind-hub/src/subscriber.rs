//! Subscriber registrations and the options used to create them.

use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use rewind_config::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::dispatch::Delivery;
use crate::message::MessageId;

/// Result returned by subscriber handlers.
pub type HandlerResult = anyhow::Result<()>;

/// Shared handler invoked with each delivery.
pub type Handler = Arc<dyn Fn(&Delivery<'_>) -> HandlerResult + Send + Sync>;

/// Identifier assigned to each subscriber registered with a hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(crate) const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for SubscriberId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "s{}", self.0)
    }
}

/// How much topic history a new or resumed subscriber catches up on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayMode {
    /// Every applied message the subscriber has not seen yet.
    #[default]
    Full,
    /// Only the most recent applied message.
    Tip,
    /// Nothing; the subscriber only sees future publishes.
    Off,
}

impl ReplayMode {
    /// Lowercase name used in configuration and logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Tip => "tip",
            Self::Off => "off",
        }
    }
}

impl FromStr for ReplayMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "full" => Ok(Self::Full),
            "tip" => Ok(Self::Tip),
            "off" | "none" | "false" => Ok(Self::Off),
            other => Err(ConfigError::UnknownVariant {
                kind: "replay mode",
                value: other.to_string(),
            }),
        }
    }
}

/// Optional settings for [`crate::Hub::subscribe`].
#[derive(Clone, Default)]
pub struct SubscribeOptions {
    /// Inverse handler run on undo. Without one, undo re-applies the previous
    /// message on the topic through the forward handler.
    pub backward: Option<Handler>,
    /// Value handed to both handlers with every delivery.
    pub context: Option<Value>,
    /// History replayed synchronously before `subscribe` returns.
    pub replay: ReplayMode,
}

impl SubscribeOptions {
    /// Attach an inverse handler.
    #[must_use]
    pub fn with_backward<F>(mut self, backward: F) -> Self
    where
        F: Fn(&Delivery<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        self.backward = Some(Arc::new(backward));
        self
    }

    /// Bind a context value.
    #[must_use]
    pub fn with_context(mut self, context: Value) -> Self {
        self.context = Some(context);
        self
    }

    /// Select the replay mode.
    #[must_use]
    pub fn with_replay(mut self, replay: ReplayMode) -> Self {
        self.replay = replay;
        self
    }
}

impl Debug for SubscribeOptions {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SubscribeOptions")
            .field("backward", &self.backward.is_some())
            .field("context", &self.context)
            .field("replay", &self.replay)
            .finish()
    }
}

/// Soft or hard removal of a subscriber.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Removal {
    /// Pause deliveries; the registration can be resumed.
    #[default]
    Soft,
    /// Delete the registration permanently.
    Hard,
}

pub(crate) struct Subscriber {
    id: SubscriberId,
    topic: Arc<str>,
    forward: Handler,
    backward: Option<Handler>,
    context: Option<Value>,
    online: bool,
    tip: Option<MessageId>,
}

impl Subscriber {
    pub(crate) fn new(
        id: SubscriberId,
        topic: Arc<str>,
        forward: Handler,
        options: SubscribeOptions,
    ) -> Self {
        Self {
            id,
            topic,
            forward,
            backward: options.backward,
            context: options.context,
            online: true,
            tip: None,
        }
    }

    pub(crate) const fn topic(&self) -> &Arc<str> {
        &self.topic
    }

    pub(crate) const fn is_online(&self) -> bool {
        self.online
    }

    pub(crate) const fn set_online(&mut self, online: bool) {
        self.online = online;
    }

    pub(crate) const fn tip(&self) -> Option<MessageId> {
        self.tip
    }

    pub(crate) const fn set_tip(&mut self, tip: Option<MessageId>) {
        self.tip = tip;
    }

    pub(crate) fn forward(&self) -> Handler {
        Arc::clone(&self.forward)
    }

    pub(crate) fn backward(&self) -> Option<Handler> {
        self.backward.clone()
    }

    pub(crate) fn context(&self) -> Option<Value> {
        self.context.clone()
    }

    pub(crate) fn view(&self) -> SubscriberView {
        SubscriberView {
            id: self.id,
            topic: self.topic.to_string(),
            online: self.online,
            tip: self.tip,
            has_backward: self.backward.is_some(),
        }
    }
}

/// Read-only snapshot of a subscriber.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriberView {
    /// Subscriber identifier; pass it to `unsubscribe`/`resubscribe`.
    pub id: SubscriberId,
    /// Topic the subscriber is attached to.
    pub topic: String,
    /// `false` while soft-unsubscribed.
    pub online: bool,
    /// Last message this subscriber was synchronised to.
    pub tip: Option<MessageId>,
    /// Whether an inverse handler was supplied.
    pub has_backward: bool,
}
