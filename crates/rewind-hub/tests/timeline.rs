use anyhow::{Context, anyhow};
use rewind_hub::{Delivery, Direction, HandlerResult, Hub, HubConfig, HubError, SubscribeOptions};
use rewind_test_support::{Counter, Recorder, init_test_logging};
use serde_json::{Value, json};

fn inverse_counter(hub: &Hub, topic: &str) -> anyhow::Result<Counter> {
    let counter = Counter::new();
    let undo = counter.clone();
    hub.subscribe(
        topic,
        counter.accumulator(),
        SubscribeOptions::default().with_backward(move |delivery: &Delivery<'_>| -> HandlerResult {
            let delta = delivery.arg(0).and_then(Value::as_i64).unwrap_or(0);
            undo.set(undo.get() - delta);
            Ok(())
        }),
    )?;
    Ok(counter)
}

#[test]
fn undo_redo_round_trip_with_inverse_handler() -> anyhow::Result<()> {
    init_test_logging();
    let hub = Hub::new();
    let counter = inverse_counter(&hub, "count")?;

    hub.publish("count", vec![json!(2)])?;
    hub.publish("count", vec![json!(3)])?;
    assert_eq!(counter.get(), 5);

    hub.undo()?;
    assert_eq!(counter.get(), 2);
    hub.redo()?;
    assert_eq!(counter.get(), 5);

    hub.undo()?;
    hub.undo()?;
    assert_eq!(counter.get(), 0);
    hub.redo()?;
    hub.redo()?;
    assert_eq!(counter.get(), 5);
    Ok(())
}

#[test]
fn undo_without_inverse_replays_previous_message() -> anyhow::Result<()> {
    let hub = Hub::new();
    let latest = Counter::new();
    let recorder = Recorder::new();
    hub.subscribe("value", latest.setter(), SubscribeOptions::default())?;
    let id = hub.subscribe("value", recorder.handler(), SubscribeOptions::default())?;

    hub.publish("value", vec![json!(1)])?;
    hub.publish("value", vec![json!(2)])?;
    let first = hub.message_ids()[0];
    assert_eq!(latest.get(), 2);

    hub.undo()?;
    assert_eq!(latest.get(), 1);
    let entry = recorder.last().context("undo delivered")?;
    assert_eq!(entry.direction, Direction::Backward);
    assert_eq!(entry.message_id, Some(first));
    assert_eq!(hub.subscriber(id).context("registered")?.tip, Some(first));

    hub.undo()?;
    assert_eq!(latest.get(), 0, "nothing published yet");
    let entry = recorder.last().context("undo delivered")?;
    assert!(entry.content.is_empty());
    assert_eq!(entry.message_id, None);
    assert_eq!(hub.subscriber(id).context("registered")?.tip, None);

    hub.redo()?;
    assert_eq!(latest.get(), 1);
    hub.redo()?;
    assert_eq!(latest.get(), 2);
    assert_eq!(hub.subscriber(id).context("registered")?.tip, hub.timeline_tip());
    Ok(())
}

#[test]
fn publishing_flushes_redo_history_of_every_topic() -> anyhow::Result<()> {
    let hub = Hub::new();
    let recorder = Recorder::new();
    hub.subscribe("foo", recorder.handler(), SubscribeOptions::default())?;
    hub.publish("foo", vec![json!(1)])?;
    hub.publish("bar", vec![json!(2)])?;
    hub.undo()?;
    hub.undo()?;
    assert_eq!(hub.redo_depth(), 2);

    // A publish on an unrelated topic abandons foo's and bar's redo entries.
    hub.publish("baz", vec![json!(3)])?;
    assert_eq!(hub.redo_depth(), 0);
    assert_eq!(hub.undo_depth(), 1);
    assert_eq!(hub.publisher("foo").context("foo")?.message_count, 0);
    assert_eq!(hub.publisher("bar").context("bar")?.message_count, 0);
    assert_eq!(hub.message_ids().len(), 1);

    let before = recorder.len();
    hub.redo()?;
    assert_eq!(recorder.len(), before);
    assert_eq!(hub.undo_depth(), 1);
    Ok(())
}

#[test]
fn empty_stacks_are_no_ops() -> anyhow::Result<()> {
    let hub = Hub::new();
    let before = hub.snapshot();
    assert!(!hub.undo()?);
    assert!(!hub.redo()?);
    assert_eq!(hub.snapshot(), before);

    hub.publish("foo", vec![json!(1)])?;
    assert!(!hub.redo()?);
    assert_eq!(hub.undo_depth(), 1);
    assert!(hub.undo()?);
    assert!(!hub.undo()?);
    assert_eq!(hub.redo_depth(), 1);
    assert_eq!(hub.undo_depth(), 0);
    Ok(())
}

#[test]
fn deactivated_topics_are_skipped_by_undo_and_redo() -> anyhow::Result<()> {
    let hub = Hub::new();
    let foo = Recorder::new();
    let bar = Recorder::new();
    hub.subscribe("foo", foo.handler(), SubscribeOptions::default())?;
    hub.subscribe("bar", bar.handler(), SubscribeOptions::default())?;
    hub.publish("foo", vec![json!(1)])?;
    hub.publish("bar", vec![json!(1)])?;

    assert!(hub.deactivate("bar"));
    assert!(hub.publish("bar", vec![json!(2)])?.is_none());
    assert_eq!(hub.publisher("bar").context("bar")?.message_count, 1);

    hub.undo()?;
    assert_eq!(hub.undo_depth(), 0, "bar's message moved without dispatch");
    assert_eq!(hub.redo_depth(), 2);
    assert_eq!(foo.len(), 2);
    assert_eq!(bar.len(), 1);

    hub.redo()?;
    hub.redo()?;
    assert_eq!(hub.undo_depth(), 2);
    assert_eq!(foo.len(), 3);
    assert_eq!(bar.len(), 1);
    Ok(())
}

#[test]
fn capacity_prunes_oldest_entries() -> anyhow::Result<()> {
    let hub = Hub::with_config(&HubConfig::from_json(&json!({ "undo_capacity": 2 }))?);
    let recorder = Recorder::new();
    hub.subscribe("foo", recorder.handler(), SubscribeOptions::default())?;
    for value in 1..=3 {
        hub.publish("foo", vec![json!(value)])?;
    }
    assert_eq!(hub.undo_capacity().map(std::num::NonZeroUsize::get), Some(2));
    assert_eq!(hub.undo_depth(), 2);
    assert_eq!(hub.publisher("foo").context("foo")?.message_count, 2);

    hub.undo()?;
    assert_eq!(recorder.last().context("undo")?.content, vec![json!(2)]);
    hub.undo()?;
    assert!(
        recorder.last().context("undo")?.content.is_empty(),
        "pruned predecessor falls back to empty content"
    );
    let before = recorder.len();
    hub.undo()?;
    assert_eq!(recorder.len(), before);
    Ok(())
}

#[test]
fn pruned_predecessor_is_gone_even_while_a_caller_holds_it() -> anyhow::Result<()> {
    let hub = Hub::with_capacity(1);
    let recorder = Recorder::new();
    hub.subscribe("foo", recorder.handler(), SubscribeOptions::default())?;

    let held = hub.publish("foo", vec![json!(1)])?.context("foo active")?;
    let first = held.tip.as_ref().map(|tip| tip.id()).context("first recorded")?;
    hub.publish("foo", vec![json!(2)])?;
    assert!(hub.message(first).is_none());

    assert!(hub.undo()?);
    let entry = recorder.last().context("undo delivered")?;
    assert!(entry.content.is_empty());
    assert_eq!(entry.message_id, None);
    assert_eq!(held.tip_content(), Some(&[json!(1)][..]));
    Ok(())
}

#[test]
fn outermost_handler_error_is_returned_after_recording() -> anyhow::Result<()> {
    let hub = Hub::new();
    let failing = hub.subscribe(
        "foo",
        |_: &Delivery<'_>| -> HandlerResult { Err(anyhow!("boom")) },
        SubscribeOptions::default(),
    )?;
    let after = Recorder::new();
    hub.subscribe("foo", after.handler(), SubscribeOptions::default())?;

    let err = hub
        .publish("foo", vec![json!(1)])
        .expect_err("handler failure surfaces");
    let HubError::Handler {
        subscriber_id,
        message_id,
        direction,
        ..
    } = &err;
    assert_eq!(*subscriber_id, failing);
    assert_eq!(*direction, Direction::Forward);
    assert_eq!(err.topic(), "foo");

    assert_eq!(hub.undo_depth(), 1, "message recorded before dispatch");
    assert_eq!(*message_id, hub.timeline_tip());
    assert_eq!(hub.subscriber(failing).context("failing")?.tip, hub.timeline_tip());
    assert!(after.is_empty(), "delivery stops at the failing subscriber");
    assert!(hub.dispatch_state().is_idle());

    assert!(hub.undo().is_err());
    assert_eq!(hub.redo_depth(), 1);
    Ok(())
}
