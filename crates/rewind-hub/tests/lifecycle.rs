use std::sync::{Arc, OnceLock};

use anyhow::Context;
use rewind_hub::{
    Delivery, HandlerResult, Hub, Removal, ReplayMode, SubscribeOptions, SubscriberId, VERSION,
};
use rewind_test_support::{Counter, Recorder, init_test_logging};
use serde_json::json;

#[test]
fn publisher_tracks_history_and_activity() -> anyhow::Result<()> {
    init_test_logging();
    let hub = Hub::new();
    hub.publish("foo", vec![json!(1)])?;
    hub.publish("foo", vec![json!(2)])?;
    let view = hub.publish("foo", vec![json!(3)])?.context("foo active")?;
    assert_eq!(view.message_count, 3);
    assert_eq!(view.tip_content(), Some(&[json!(3)][..]));
    assert!(view.tip.as_ref().is_some_and(|tip| tip.published_at() <= chrono::Utc::now()));

    assert!(hub.deactivate("foo"));
    assert!(hub.publish("foo", vec![json!("nope")])?.is_none());
    assert_eq!(hub.publisher("foo").context("foo")?.message_count, 3, "not recorded");
    assert!(hub.activate("foo"));
    assert!(hub.publish("foo", vec![json!("yep")])?.is_some());

    let bar = hub
        .publish("bar", vec![json!(1), json!(2), json!(3), json!(4)])?
        .context("bar active")?;
    assert_eq!(bar.message_count, 1);
    assert_eq!(bar.tip_content().map(<[_]>::len), Some(4));

    assert!(!hub.deactivate("missing"));
    assert!(!hub.activate("missing"));
    Ok(())
}

#[test]
fn soft_unsubscribe_resumes_where_it_left_off() -> anyhow::Result<()> {
    let hub = Hub::new();
    let output = Counter::new();
    let id = hub.subscribe("foo", output.incrementer(), SubscribeOptions::default())?;
    hub.publish("foo", vec![])?;
    hub.publish("foo", vec![])?;
    assert_eq!(output.get(), 2, "2 pubs");

    assert!(hub.unsubscribe(id, Removal::Soft));
    hub.publish("foo", vec![])?;
    hub.publish("foo", vec![])?;
    assert_eq!(output.get(), 2, "still 2 pubs");
    assert!(!hub.subscriber(id).context("kept")?.online);

    assert!(hub.resubscribe(id, ReplayMode::Full)?);
    assert_eq!(output.get(), 4, "resumed to 4 pubs");
    let view = hub.subscriber(id).context("kept")?;
    assert!(view.online);
    assert_eq!(view.tip, hub.timeline_tip());

    assert!(hub.resubscribe(id, ReplayMode::Full)?);
    assert_eq!(output.get(), 4, "nothing replayed twice");
    Ok(())
}

#[test]
fn resubscribe_without_replay_only_sees_new_messages() -> anyhow::Result<()> {
    let hub = Hub::new();
    let recorder = Recorder::new();
    let id = hub.subscribe("foo", recorder.handler(), SubscribeOptions::default())?;
    hub.publish("foo", vec![json!(1)])?;
    let tip = hub.subscriber(id).context("registered")?.tip;

    hub.unsubscribe(id, Removal::Soft);
    hub.publish("foo", vec![json!(2)])?;
    assert!(hub.resubscribe(id, ReplayMode::Off)?);
    assert_eq!(hub.subscriber(id).context("registered")?.tip, tip);

    hub.publish("foo", vec![json!(3)])?;
    assert_eq!(recorder.contents(), vec![vec![json!(1)], vec![json!(3)]]);

    hub.unsubscribe(id, Removal::Soft);
    hub.publish("foo", vec![json!(4)])?;
    hub.publish("foo", vec![json!(5)])?;
    assert!(hub.resubscribe(id, ReplayMode::Tip)?);
    assert_eq!(recorder.last().context("tip replayed")?.content, vec![json!(5)]);
    Ok(())
}

#[test]
fn hard_unsubscribe_removes_the_registration() -> anyhow::Result<()> {
    let hub = Hub::new();
    let recorder = Recorder::new();
    let id = hub.subscribe("foo", recorder.handler(), SubscribeOptions::default())?;

    assert!(hub.unsubscribe(id, Removal::Hard));
    assert!(hub.subscriber(id).is_none());
    assert!(hub.subscriber_ids("foo").is_empty());
    assert_eq!(hub.publisher("foo").context("topic kept")?.subscriber_count, 0);

    hub.publish("foo", vec![json!(1)])?;
    assert!(recorder.is_empty());
    assert!(!hub.resubscribe(id, ReplayMode::Full)?);
    assert!(!hub.unsubscribe(id, Removal::Hard));
    assert!(!hub.unsubscribe(id, Removal::Soft));
    Ok(())
}

#[test]
fn removing_a_topic_purges_its_history() -> anyhow::Result<()> {
    let hub = Hub::new();
    let id = hub.subscribe("foo", Recorder::new().handler(), SubscribeOptions::default())?;
    hub.publish("foo", vec![json!(1)])?;
    hub.publish("bar", vec![json!(2)])?;
    hub.publish("foo", vec![json!(3)])?;
    hub.undo()?;

    assert!(hub.remove_topic("foo"));
    assert!(!hub.remove_topic("foo"));
    assert!(hub.subscriber(id).is_none());
    assert_eq!(hub.topics(), vec!["bar".to_string()]);
    assert_eq!(hub.undo_depth(), 1);
    assert_eq!(hub.redo_depth(), 0);
    assert_eq!(hub.message_ids().len(), 1);
    Ok(())
}

#[test]
fn handler_can_unsubscribe_a_later_subscriber() -> anyhow::Result<()> {
    let hub = Hub::new();
    let victim: Arc<OnceLock<SubscriberId>> = Arc::new(OnceLock::new());
    let target = Arc::clone(&victim);
    hub.subscribe(
        "foo",
        move |delivery: &Delivery<'_>| -> HandlerResult {
            if let Some(id) = target.get() {
                delivery.hub.unsubscribe(*id, Removal::Hard);
            }
            Ok(())
        },
        SubscribeOptions::default(),
    )?;
    let recorder = Recorder::new();
    let id = hub.subscribe("foo", recorder.handler(), SubscribeOptions::default())?;
    victim.set(id).ok();

    hub.publish("foo", vec![json!(1)])?;
    assert!(recorder.is_empty());
    assert!(hub.subscriber(id).is_none());
    Ok(())
}

#[test]
fn snapshot_lists_tables_and_stacks() -> anyhow::Result<()> {
    let hub = Hub::new();
    let id = hub.subscribe(
        "foo",
        Recorder::new().handler(),
        SubscribeOptions::default().with_context(json!({ "owner": "tests" })),
    )?;
    hub.publish("foo", vec![json!(1)])?;
    hub.publish("bar", vec![json!(2)])?;
    hub.undo()?;

    let snapshot = hub.snapshot();
    assert_eq!(snapshot.undo.len(), 1);
    assert_eq!(snapshot.redo.len(), 1);
    assert_eq!(snapshot.timeline_tip, snapshot.undo.last().copied());
    let foo = snapshot.topic("foo").context("foo listed")?;
    assert_eq!(foo.subscribers, vec![id]);
    assert!(foo.active);

    let value = serde_json::to_value(&snapshot)?;
    assert_eq!(value["topics"][0]["topic"], json!("bar"));
    assert_eq!(value["subscribers"][0]["topic"], json!("foo"));
    assert_eq!(value["messages"].as_array().map(Vec::len), Some(2));
    assert!(!VERSION.is_empty());
    assert!(format!("{hub:?}").contains("redo: 1"));
    Ok(())
}
