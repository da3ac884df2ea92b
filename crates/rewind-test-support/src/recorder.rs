//! Handlers that capture every delivery for later assertions.

use std::sync::Arc;

use parking_lot::Mutex;
use rewind_hub::{Delivery, Direction, HandlerResult, MessageId, SubscriberId};
use serde_json::Value;

/// Owned copy of one delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    /// Subscriber that received the delivery.
    pub subscriber_id: SubscriberId,
    /// Message whose content was delivered.
    pub message_id: Option<MessageId>,
    /// Payload values.
    pub content: Vec<Value>,
    /// Context bound at subscription time.
    pub context: Option<Value>,
    /// Timeline direction.
    pub direction: Direction,
}

impl From<&Delivery<'_>> for Recorded {
    fn from(delivery: &Delivery<'_>) -> Self {
        Self {
            subscriber_id: delivery.subscriber_id,
            message_id: delivery.message_id,
            content: delivery.content.to_vec(),
            context: delivery.context.cloned(),
            direction: delivery.direction,
        }
    }
}

/// Shared log of deliveries. Clones append to the same log.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    entries: Arc<Mutex<Vec<Recorded>>>,
}

impl Recorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler that records each delivery and succeeds.
    #[must_use]
    pub fn handler(&self) -> impl Fn(&Delivery<'_>) -> HandlerResult + Send + Sync + 'static {
        let recorder = self.clone();
        move |delivery: &Delivery<'_>| -> HandlerResult {
            recorder.record(delivery);
            Ok(())
        }
    }

    /// Append a delivery.
    pub fn record(&self, delivery: &Delivery<'_>) {
        self.entries.lock().push(Recorded::from(delivery));
    }

    /// Copy of every recorded delivery in arrival order.
    #[must_use]
    pub fn entries(&self) -> Vec<Recorded> {
        self.entries.lock().clone()
    }

    /// Payloads of every recorded delivery in arrival order.
    #[must_use]
    pub fn contents(&self) -> Vec<Vec<Value>> {
        self.entries
            .lock()
            .iter()
            .map(|entry| entry.content.clone())
            .collect()
    }

    /// Most recent delivery.
    #[must_use]
    pub fn last(&self) -> Option<Recorded> {
        self.entries.lock().last().cloned()
    }

    /// Number of recorded deliveries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// `true` when nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Forget every recorded delivery.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
