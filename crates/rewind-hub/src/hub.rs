//! The hub owns every publisher, subscriber, and message, plus the global
//! undo and redo stacks.
//!
//! # Design
//! - All state lives behind one re-entrant lock so a handler running on the
//!   dispatching thread can call back into the hub, while other threads wait
//!   for the outermost operation to finish.
//! - The inner `RefCell` is never borrowed across a handler call.
//! - Subscribers are looked up at delivery time, so a handler that unsubscribes
//!   a later subscriber suppresses its delivery for the rest of the loop.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt::{self, Debug, Formatter};
use std::num::NonZeroUsize;
use std::sync::Arc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use rewind_config::HubConfig;
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::dispatch::{Delivery, Direction, DispatchState};
use crate::error::{HubError, HubResult};
use crate::message::{Message, MessageId};
use crate::publisher::{Publisher, PublisherView};
use crate::snapshot::{HubSnapshot, TopicSnapshot};
use crate::subscriber::{
    Handler, HandlerResult, Removal, ReplayMode, SubscribeOptions, Subscriber, SubscriberId,
    SubscriberView,
};

type StateGuard<'a> = ReentrantMutexGuard<'a, RefCell<HubState>>;

/// In-process publish/subscribe hub with linear undo/redo.
///
/// Cloning a hub yields another handle to the same state.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<ReentrantMutex<RefCell<HubState>>>,
}

struct HubState {
    publishers: HashMap<Arc<str>, Publisher>,
    subscribers: BTreeMap<SubscriberId, Subscriber>,
    messages: BTreeMap<MessageId, Arc<Message>>,
    undos: VecDeque<Arc<Message>>,
    redos: Vec<Arc<Message>>,
    undo_capacity: Option<NonZeroUsize>,
    dispatch: DispatchState,
    next_message_id: u64,
    next_subscriber_id: u64,
}

/// Resolved target of a single delivery.
struct Plan {
    handler: Handler,
    source: Option<Arc<Message>>,
    context: Option<Value>,
    tip: Option<MessageId>,
    outermost: bool,
}

/// Bookkeeping for one in-flight delivery. Dropping it leaves the dispatch
/// state and, for the outermost delivery, moves the subscriber tip; both
/// therefore still happen when the handler unwinds.
struct DeliveryScope<'g, 'a> {
    guard: &'g StateGuard<'a>,
    subscriber_id: SubscriberId,
    tip: Option<MessageId>,
    outermost: bool,
}

impl Drop for DeliveryScope<'_, '_> {
    fn drop(&mut self) {
        let Ok(mut state) = self.guard.try_borrow_mut() else {
            return;
        };
        state.dispatch.exit();
        if self.outermost
            && let Some(subscriber) = state.subscribers.get_mut(&self.subscriber_id)
        {
            subscriber.set_tip(self.tip);
        }
    }
}

impl HubState {
    fn new(config: &HubConfig) -> Self {
        Self {
            publishers: HashMap::new(),
            subscribers: BTreeMap::new(),
            messages: BTreeMap::new(),
            undos: VecDeque::new(),
            redos: Vec::new(),
            undo_capacity: config.undo_capacity,
            dispatch: DispatchState::Idle,
            next_message_id: 1,
            next_subscriber_id: 1,
        }
    }

    const fn allocate_message_id(&mut self) -> MessageId {
        let id = MessageId::new(self.next_message_id);
        self.next_message_id += 1;
        id
    }

    const fn allocate_subscriber_id(&mut self) -> SubscriberId {
        let id = SubscriberId::new(self.next_subscriber_id);
        self.next_subscriber_id += 1;
        id
    }

    fn publisher_mut(&mut self, topic: &str) -> &mut Publisher {
        self.publishers
            .entry(Arc::from(topic))
            .or_insert_with_key(|key| {
                debug!(topic = %key, "created publisher");
                Publisher::new(Arc::clone(key))
            })
    }

    fn is_active(&self, topic: &str) -> bool {
        self.publishers.get(topic).is_none_or(Publisher::is_active)
    }

    fn timeline_tip(&self) -> Option<MessageId> {
        self.undos.back().map(|message| message.id())
    }

    fn targets(&self, topic: &str) -> Vec<SubscriberId> {
        self.publishers
            .get(topic)
            .map(|publisher| publisher.subscriber_ids().to_vec())
            .unwrap_or_default()
    }

    /// Create a message that enters history and the undo stack.
    fn record(&mut self, topic: &str, content: Vec<Value>) -> Arc<Message> {
        let id = self.allocate_message_id();
        let publisher = self.publisher_mut(topic);
        let message = Arc::new(Message::new(
            id,
            Arc::clone(publisher.topic()),
            content,
            publisher.last_message().map(|last| last.id()),
            false,
        ));
        publisher.push_message(Arc::clone(&message));
        self.messages.insert(id, Arc::clone(&message));
        self.prune();
        self.undos.push_back(Arc::clone(&message));
        debug!(message_id = %id, topic, "recorded message");
        message
    }

    /// Create a message published from inside a handler. It is delivered but
    /// never stored.
    fn temporary(&mut self, topic: &str, content: Vec<Value>) -> Arc<Message> {
        let id = self.allocate_message_id();
        let publisher = self.publisher_mut(topic);
        let message = Arc::new(Message::new(
            id,
            Arc::clone(publisher.topic()),
            content,
            publisher.last_message().map(|last| last.id()),
            true,
        ));
        trace!(message_id = %id, topic, "created temporary message");
        message
    }

    fn discard(&mut self, message: &Message) {
        if let Some(publisher) = self.publishers.get_mut(message.topic_key()) {
            publisher.remove_message(message.id());
        }
        self.messages.remove(&message.id());
    }

    /// Drop every redoable message of every topic; a fresh publish on any
    /// topic forks the whole timeline.
    fn flush(&mut self) {
        if self.redos.is_empty() {
            return;
        }
        let abandoned = std::mem::take(&mut self.redos);
        for message in &abandoned {
            self.discard(message);
        }
        debug!(count = abandoned.len(), "flushed redo history");
    }

    /// Evict the oldest undo entries until one more fits.
    fn prune(&mut self) {
        let Some(capacity) = self.undo_capacity else {
            return;
        };
        while self.undos.len() >= capacity.get() {
            let Some(oldest) = self.undos.pop_front() else {
                break;
            };
            self.discard(&oldest);
            debug!(
                message_id = %oldest.id(),
                topic = oldest.topic(),
                "pruned oldest undo entry"
            );
        }
    }

    /// Move one message between the stacks.
    fn traverse(&mut self, direction: Direction) -> Option<Arc<Message>> {
        match direction {
            Direction::Backward => {
                let message = self.undos.pop_back()?;
                self.redos.push(Arc::clone(&message));
                Some(message)
            }
            Direction::Forward => {
                let message = self.redos.pop()?;
                self.undos.push_back(Arc::clone(&message));
                Some(message)
            }
        }
    }

    /// Messages a subscriber should receive to catch up with the timeline.
    fn pending_replay(&self, id: SubscriberId, mode: ReplayMode) -> Vec<Arc<Message>> {
        let Some(subscriber) = self.subscribers.get(&id) else {
            return Vec::new();
        };
        let Some(publisher) = self.publishers.get(subscriber.topic()) else {
            return Vec::new();
        };
        if !publisher.is_active() {
            return Vec::new();
        }
        let Some(horizon) = self.timeline_tip() else {
            return Vec::new();
        };

        let seen = subscriber.tip();
        let unseen = |message: &&Arc<Message>| seen.is_none_or(|tip| message.id() > tip);
        let applied = publisher
            .messages()
            .iter()
            .take_while(|message| message.id() <= horizon);
        match mode {
            ReplayMode::Full => applied.filter(unseen).cloned().collect(),
            ReplayMode::Tip => applied.last().filter(unseen).cloned().into_iter().collect(),
            ReplayMode::Off => Vec::new(),
        }
    }

    /// Resolve the handler, payload, and resulting tip for one delivery and
    /// enter the dispatch state. `None` when the subscriber is gone or offline.
    fn plan(
        &mut self,
        id: SubscriberId,
        message: &Arc<Message>,
        direction: Direction,
    ) -> Option<Plan> {
        let subscriber = self.subscribers.get(&id).filter(|s| s.is_online())?;
        let (handler, source, tip) = match (direction, subscriber.backward()) {
            (Direction::Forward, _) => (
                subscriber.forward(),
                Some(Arc::clone(message)),
                Some(message.id()),
            ),
            (Direction::Backward, Some(backward)) => {
                (backward, Some(Arc::clone(message)), message.previous_id())
            }
            (Direction::Backward, None) => (
                subscriber.forward(),
                message
                    .previous_id()
                    .and_then(|previous| self.messages.get(&previous).cloned()),
                message.previous_id(),
            ),
        };
        let context = subscriber.context();
        let outermost = self.dispatch.enter(direction);
        Some(Plan {
            handler,
            source,
            context,
            tip,
            outermost,
        })
    }

    fn purge_topic(&mut self, topic: &str) -> bool {
        let Some(publisher) = self.publishers.remove(topic) else {
            return false;
        };
        for id in publisher.subscriber_ids() {
            self.subscribers.remove(id);
        }
        for message in publisher.messages() {
            self.messages.remove(&message.id());
        }
        self.undos.retain(|message| message.topic() != topic);
        self.redos.retain(|message| message.topic() != topic);
        true
    }

    fn snapshot(&self) -> HubSnapshot {
        let mut topics: Vec<TopicSnapshot> = self
            .publishers
            .values()
            .map(|publisher| TopicSnapshot {
                topic: publisher.topic().to_string(),
                active: publisher.is_active(),
                subscribers: publisher.subscriber_ids().to_vec(),
                messages: publisher.messages().iter().map(|m| m.id()).collect(),
            })
            .collect();
        topics.sort_by(|left, right| left.topic.cmp(&right.topic));

        HubSnapshot {
            topics,
            subscribers: self.subscribers.values().map(Subscriber::view).collect(),
            messages: self.messages.keys().copied().collect(),
            undo: self.undos.iter().map(|m| m.id()).collect(),
            redo: self.redos.iter().map(|m| m.id()).collect(),
            timeline_tip: self.timeline_tip(),
        }
    }
}

impl Hub {
    /// Create a hub with unbounded undo history.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&HubConfig::unbounded())
    }

    /// Create a hub that keeps at most `capacity` undo entries. `0` means
    /// unbounded.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_config(&HubConfig::with_undo_capacity(capacity))
    }

    /// Create a hub from a loaded configuration.
    #[must_use]
    pub fn with_config(config: &HubConfig) -> Self {
        debug!(undo_capacity = config.undo_capacity_or_zero(), "created hub");
        Self {
            inner: Arc::new(ReentrantMutex::new(RefCell::new(HubState::new(config)))),
        }
    }

    fn read<R>(&self, f: impl FnOnce(&HubState) -> R) -> R {
        let guard = self.inner.lock();
        let state = guard.borrow();
        f(&state)
    }

    /// Register `forward` on `topic`, creating the topic if needed, then
    /// replay history according to `options.replay` before returning.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Handler`] when the handler fails during replay. The
    /// subscriber stays registered with its tip at the failed message.
    pub fn subscribe<F>(
        &self,
        topic: &str,
        forward: F,
        options: SubscribeOptions,
    ) -> HubResult<SubscriberId>
    where
        F: Fn(&Delivery<'_>) -> HandlerResult + Send + Sync + 'static,
    {
        let guard = self.inner.lock();
        let replay = options.replay;
        let id = {
            let mut state = guard.borrow_mut();
            let id = state.allocate_subscriber_id();
            let publisher = state.publisher_mut(topic);
            publisher.attach(id);
            let key = Arc::clone(publisher.topic());
            state
                .subscribers
                .insert(id, Subscriber::new(id, key, Arc::new(forward), options));
            id
        };
        debug!(topic, subscriber_id = %id, replay = replay.as_str(), "subscribed");
        self.catch_up(&guard, id, replay)?;
        Ok(id)
    }

    /// Bring a soft-unsubscribed subscriber back online and replay what it
    /// missed. Returns `false` when the id is unknown.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Handler`] when the handler fails during replay.
    pub fn resubscribe(&self, id: SubscriberId, replay: ReplayMode) -> HubResult<bool> {
        let guard = self.inner.lock();
        let found = {
            let mut state = guard.borrow_mut();
            match state.subscribers.get_mut(&id) {
                Some(subscriber) => {
                    subscriber.set_online(true);
                    true
                }
                None => false,
            }
        };
        if !found {
            return Ok(false);
        }
        debug!(subscriber_id = %id, replay = replay.as_str(), "resubscribed");
        self.catch_up(&guard, id, replay)?;
        Ok(true)
    }

    /// Soft removal pauses the subscriber; hard removal deletes it. Returns
    /// `false` when the id is unknown.
    pub fn unsubscribe(&self, id: SubscriberId, removal: Removal) -> bool {
        let guard = self.inner.lock();
        let mut state = guard.borrow_mut();
        match removal {
            Removal::Soft => {
                let Some(subscriber) = state.subscribers.get_mut(&id) else {
                    return false;
                };
                subscriber.set_online(false);
            }
            Removal::Hard => {
                let Some(subscriber) = state.subscribers.remove(&id) else {
                    return false;
                };
                if let Some(publisher) = state.publishers.get_mut(subscriber.topic()) {
                    publisher.detach(id);
                }
            }
        }
        debug!(subscriber_id = %id, ?removal, "unsubscribed");
        true
    }

    /// Publish `content` on `topic` and deliver it to every online
    /// subscriber in registration order.
    ///
    /// From outside a handler the message is recorded in history and pushed
    /// on the undo stack after the redo stack is flushed. From inside a
    /// handler it is delivered but not recorded.
    ///
    /// Returns `None` without delivering anything when the topic is
    /// deactivated.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Handler`] when a handler fails during an outermost
    /// delivery. Remaining subscribers are skipped; the message stays
    /// recorded.
    pub fn publish(&self, topic: &str, content: Vec<Value>) -> HubResult<Option<PublisherView>> {
        let guard = self.inner.lock();
        let (message, targets) = {
            let mut state = guard.borrow_mut();
            if !state.is_active(topic) {
                debug!(topic, "publish ignored; topic inactive");
                return Ok(None);
            }
            let message = if state.dispatch.is_idle() {
                state.flush();
                state.record(topic, content)
            } else {
                state.temporary(topic, content)
            };
            (message, state.targets(topic))
        };
        self.dispatch(&guard, &message, &targets, Direction::Forward)?;
        Ok(guard.borrow().publishers.get(topic).map(Publisher::view))
    }

    /// Revert the most recent message on the timeline.
    ///
    /// Messages of deactivated topics move to the redo stack without being
    /// delivered, and the next message is tried. Returns `true` when at least
    /// one message moved between the stacks, and `false` when the undo stack
    /// was empty or the call came from inside a handler, where history is
    /// left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Handler`] when a handler fails.
    pub fn undo(&self) -> HubResult<bool> {
        self.step(Direction::Backward)
    }

    /// Re-apply the most recently undone message. Mirrors [`Hub::undo`].
    ///
    /// # Errors
    ///
    /// Returns [`HubError::Handler`] when a handler fails.
    pub fn redo(&self) -> HubResult<bool> {
        self.step(Direction::Forward)
    }

    fn step(&self, direction: Direction) -> HubResult<bool> {
        let guard = self.inner.lock();
        let (message, targets) = {
            let mut state = guard.borrow_mut();
            if !state.dispatch.is_idle() {
                warn!(%direction, "ignoring history traversal requested from inside a handler");
                return Ok(false);
            }
            let mut moved = false;
            loop {
                let Some(message) = state.traverse(direction) else {
                    trace!(%direction, "history stack empty");
                    return Ok(moved);
                };
                moved = true;
                match state.publishers.get(message.topic()) {
                    Some(publisher) if publisher.is_active() => {
                        break (message, publisher.subscriber_ids().to_vec());
                    }
                    _ => debug!(
                        message_id = %message.id(),
                        topic = message.topic(),
                        %direction,
                        "skipped message of inactive topic"
                    ),
                }
            }
        };
        debug!(message_id = %message.id(), topic = message.topic(), %direction, "stepping timeline");
        self.dispatch(&guard, &message, &targets, direction)?;
        Ok(true)
    }

    /// Suspend a topic: publishes are ignored, replay is skipped, and undo or
    /// redo step over its messages. Returns `false` for an unknown topic.
    pub fn deactivate(&self, topic: &str) -> bool {
        self.set_active(topic, false)
    }

    /// Resume a topic suspended with [`Hub::deactivate`].
    pub fn activate(&self, topic: &str) -> bool {
        self.set_active(topic, true)
    }

    fn set_active(&self, topic: &str, active: bool) -> bool {
        let guard = self.inner.lock();
        let mut state = guard.borrow_mut();
        let Some(publisher) = state.publishers.get_mut(topic) else {
            return false;
        };
        publisher.set_active(active);
        debug!(topic, active, "topic activity changed");
        true
    }

    /// Remove a topic together with its subscribers and its messages, purging
    /// them from both stacks. Returns `false` for an unknown topic.
    pub fn remove_topic(&self, topic: &str) -> bool {
        let guard = self.inner.lock();
        let removed = guard.borrow_mut().purge_topic(topic);
        if removed {
            debug!(topic, "removed topic");
        }
        removed
    }

    fn catch_up(&self, guard: &StateGuard<'_>, id: SubscriberId, mode: ReplayMode) -> HubResult<()> {
        let pending = guard.borrow().pending_replay(id, mode);
        if pending.is_empty() {
            return Ok(());
        }
        trace!(subscriber_id = %id, count = pending.len(), "replaying history");
        let mut caught_up = None;
        for message in &pending {
            if self.deliver(guard, id, message, Direction::Forward)? {
                caught_up = Some(message.id());
            }
        }
        // Nested replays skip per-delivery bookkeeping, so settle the tip here.
        if caught_up.is_some()
            && let Some(subscriber) = guard.borrow_mut().subscribers.get_mut(&id)
        {
            subscriber.set_tip(caught_up);
        }
        Ok(())
    }

    fn dispatch(
        &self,
        guard: &StateGuard<'_>,
        message: &Arc<Message>,
        targets: &[SubscriberId],
        direction: Direction,
    ) -> HubResult<()> {
        for id in targets {
            self.deliver(guard, *id, message, direction)?;
        }
        Ok(())
    }

    fn deliver(
        &self,
        guard: &StateGuard<'_>,
        id: SubscriberId,
        message: &Arc<Message>,
        direction: Direction,
    ) -> HubResult<bool> {
        let Some(plan) = guard.borrow_mut().plan(id, message, direction) else {
            return Ok(false);
        };
        let scope = DeliveryScope {
            guard,
            subscriber_id: id,
            tip: plan.tip,
            outermost: plan.outermost,
        };
        let message_id = plan.source.as_ref().map(|source| source.id());
        let delivery = Delivery {
            hub: self,
            topic: message.topic(),
            subscriber_id: id,
            message_id,
            content: plan.source.as_deref().map(Message::content).unwrap_or_default(),
            context: plan.context.as_ref(),
            direction,
        };
        trace!(
            subscriber_id = %id,
            topic = message.topic(),
            %direction,
            outermost = plan.outermost,
            "delivering"
        );
        let result = (plan.handler)(&delivery);
        drop(scope);

        if !plan.outermost {
            if let Err(err) = result {
                warn!(
                    subscriber_id = %id,
                    topic = message.topic(),
                    %direction,
                    error = %err,
                    "nested handler failed"
                );
            }
            return Ok(true);
        }
        result
            .map(|()| true)
            .map_err(|err| HubError::Handler {
                topic: message.topic().to_string(),
                subscriber_id: id,
                message_id,
                direction,
                source: err.into(),
            })
    }

    /// Topic view, or `None` for an unknown topic.
    #[must_use]
    pub fn publisher(&self, topic: &str) -> Option<PublisherView> {
        self.read(|state| state.publishers.get(topic).map(Publisher::view))
    }

    /// Subscriber view, or `None` for an unknown id.
    #[must_use]
    pub fn subscriber(&self, id: SubscriberId) -> Option<SubscriberView> {
        self.read(|state| state.subscribers.get(&id).map(Subscriber::view))
    }

    /// Retained message by id.
    #[must_use]
    pub fn message(&self, id: MessageId) -> Option<Arc<Message>> {
        self.read(|state| state.messages.get(&id).cloned())
    }

    /// Known topics, sorted.
    #[must_use]
    pub fn topics(&self) -> Vec<String> {
        self.read(|state| {
            let mut topics: Vec<String> =
                state.publishers.keys().map(ToString::to_string).collect();
            topics.sort();
            topics
        })
    }

    /// Subscriber ids on `topic` in dispatch order.
    #[must_use]
    pub fn subscriber_ids(&self, topic: &str) -> Vec<SubscriberId> {
        self.read(|state| state.targets(topic))
    }

    /// Ids in the global message table, ascending.
    #[must_use]
    pub fn message_ids(&self) -> Vec<MessageId> {
        self.read(|state| state.messages.keys().copied().collect())
    }

    /// Number of undoable messages.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.read(|state| state.undos.len())
    }

    /// Number of redoable messages.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.read(|state| state.redos.len())
    }

    /// The latest message still applied, i.e. the top of the undo stack.
    #[must_use]
    pub fn timeline_tip(&self) -> Option<MessageId> {
        self.read(HubState::timeline_tip)
    }

    /// Current re-entrancy state.
    #[must_use]
    pub fn dispatch_state(&self) -> DispatchState {
        self.read(|state| state.dispatch)
    }

    /// Configured undo capacity, `None` when unbounded.
    #[must_use]
    pub fn undo_capacity(&self) -> Option<NonZeroUsize> {
        self.read(|state| state.undo_capacity)
    }

    /// Serializable copy of every table and stack.
    #[must_use]
    pub fn snapshot(&self) -> HubSnapshot {
        self.read(HubState::snapshot)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Hub {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        self.read(|state| {
            formatter
                .debug_struct("Hub")
                .field("topics", &state.publishers.len())
                .field("subscribers", &state.subscribers.len())
                .field("messages", &state.messages.len())
                .field("undo", &state.undos.len())
                .field("redo", &state.redos.len())
                .field("dispatch", &state.dispatch)
                .finish()
        })
    }
}
