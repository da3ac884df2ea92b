//! Error types for hub operations.
//!
//! Unknown ids and inactive topics are not errors; those calls return `None`
//! or `false`. The only failure surfaced to callers is a handler error raised
//! during the outermost delivery.

use std::error::Error;

use thiserror::Error;

use crate::dispatch::Direction;
use crate::message::MessageId;
use crate::subscriber::SubscriberId;

/// Primary error type for hub operations.
#[derive(Debug, Error)]
pub enum HubError {
    /// A subscriber handler returned an error.
    #[error("{direction} handler of subscriber {subscriber_id} failed on topic '{topic}'")]
    Handler {
        /// Topic being dispatched.
        topic: String,
        /// Subscriber whose handler failed.
        subscriber_id: SubscriberId,
        /// Message being applied, when the delivery carried one.
        message_id: Option<MessageId>,
        /// Direction of the failed delivery.
        direction: Direction,
        /// Underlying failure.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
}

impl HubError {
    /// Subscriber whose handler failed.
    #[must_use]
    pub const fn subscriber_id(&self) -> SubscriberId {
        match self {
            Self::Handler { subscriber_id, .. } => *subscriber_id,
        }
    }

    /// Topic being dispatched when the failure occurred.
    #[must_use]
    pub fn topic(&self) -> &str {
        match self {
            Self::Handler { topic, .. } => topic,
        }
    }
}

/// Convenience alias for hub operation results.
pub type HubResult<T> = Result<T, HubError>;
