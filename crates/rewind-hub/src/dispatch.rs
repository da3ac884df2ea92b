//! Delivery payloads and the re-entrancy state machine.
//!
//! # Design
//! - Only the outermost delivery (depth 0 -> 1) owns bookkeeping: it updates
//!   the subscriber tip and surfaces handler errors.
//! - Nested deliveries, triggered by handlers that publish, still run their
//!   handlers but never touch tips or history.

use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use serde_json::Value;

use crate::hub::Hub;
use crate::message::MessageId;
use crate::subscriber::SubscriberId;

/// Direction a message is travelling along the timeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Publish, redo, and history replay.
    Forward,
    /// Undo.
    Backward,
}

impl Direction {
    /// Lowercase name used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
        }
    }
}

impl Display for Direction {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Whether a delivery is currently in flight on a hub.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DispatchState {
    /// No handler is running.
    #[default]
    Idle,
    /// At least one handler is running.
    Dispatching {
        /// Direction of the outermost delivery.
        direction: Direction,
        /// Number of nested deliveries, `1` for the outermost one.
        depth: usize,
    },
}

impl DispatchState {
    /// `true` when no delivery is in flight.
    #[must_use]
    pub const fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Direction of the outermost delivery in flight.
    #[must_use]
    pub const fn direction(self) -> Option<Direction> {
        match self {
            Self::Idle => None,
            Self::Dispatching { direction, .. } => Some(direction),
        }
    }

    /// Current nesting depth, `0` when idle.
    #[must_use]
    pub const fn depth(self) -> usize {
        match self {
            Self::Idle => 0,
            Self::Dispatching { depth, .. } => depth,
        }
    }

    /// Enter a delivery. Returns `true` when this is the outermost one.
    pub(crate) const fn enter(&mut self, direction: Direction) -> bool {
        match *self {
            Self::Idle => {
                *self = Self::Dispatching {
                    direction,
                    depth: 1,
                };
                true
            }
            Self::Dispatching {
                direction: outer,
                depth,
            } => {
                *self = Self::Dispatching {
                    direction: outer,
                    depth: depth + 1,
                };
                false
            }
        }
    }

    /// Leave a delivery previously entered with [`DispatchState::enter`].
    pub(crate) const fn exit(&mut self) {
        *self = match *self {
            Self::Idle | Self::Dispatching { depth: 0 | 1, .. } => Self::Idle,
            Self::Dispatching { direction, depth } => Self::Dispatching {
                direction,
                depth: depth - 1,
            },
        };
    }
}

/// Arguments handed to a subscriber handler.
pub struct Delivery<'a> {
    /// Hub performing the delivery; handlers may publish, undo, or redo on it.
    pub hub: &'a Hub,
    /// Topic of the subscriber.
    pub topic: &'a str,
    /// Subscriber being invoked.
    pub subscriber_id: SubscriberId,
    /// Message whose content is delivered; `None` when undo falls back to
    /// "nothing published yet".
    pub message_id: Option<MessageId>,
    /// Payload values.
    pub content: &'a [Value],
    /// Context bound at subscription time.
    pub context: Option<&'a Value>,
    /// Timeline direction of the operation that triggered the delivery.
    pub direction: Direction,
}

impl Delivery<'_> {
    /// Payload value at `index`.
    #[must_use]
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.content.get(index)
    }

    /// `true` when the delivery carries no payload values.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
