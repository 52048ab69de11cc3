//! Session runtime coverage: live feed to cache, debounced auto-scroll,
//! backward pagination through the loader, read commits, and teardown.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;

use roomsync::core::state::viewport::{ScrollBehavior, ScrollMetrics};
use roomsync::core::state::SessionState;
use roomsync::domain::message::{
    ChannelId, ConversationId, EventTime, MemberId, Message, MessageBody, MessageId,
};
use roomsync::infrastructure::history::InMemoryHistory;
use roomsync::infrastructure::read_state::InMemoryReadState;
use roomsync::infrastructure::session::{SessionRuntime, ViewportSurface};
use roomsync::infrastructure::subscription::{InMemoryFeed, LiveEvent};

#[derive(Debug, Default)]
struct RecordingSurface {
    scrolls: Mutex<Vec<ScrollBehavior>>,
}

impl RecordingSurface {
    fn recorded(&self) -> Vec<ScrollBehavior> {
        self.scrolls.lock().expect("not poisoned").clone()
    }
}

impl ViewportSurface for RecordingSurface {
    fn scroll_to_newest(&self, behavior: ScrollBehavior) {
        self.scrolls.lock().expect("not poisoned").push(behavior);
    }
}

fn conversation() -> ConversationId {
    ConversationId::Channel(ChannelId::new("general"))
}

fn message(id: &str, secs: i64) -> Message {
    // Realistic epoch so the wire roundtrip stays exact.
    let at = Utc
        .timestamp_opt(1_700_000_000 + secs, 0)
        .single()
        .expect("valid timestamp");
    Message::channel(
        ChannelId::new("general"),
        MessageBody::new(
            MessageId::new(id),
            MemberId::new("bob"),
            format!("content {id}"),
            EventTime::new(at),
        ),
    )
}

fn added_event(id: &str, secs: i64) -> LiveEvent {
    LiveEvent::MessageAdded(serde_json::to_value(message(id, secs)).expect("serializable"))
}

fn archive(len: usize) -> Vec<Message> {
    // Oldest first for the in-memory loader.
    (0..len)
        .map(|i| message(&format!("h{i}"), 1_000 + i as i64))
        .collect()
}

/// Under paused time, sleeping yields to every ready task and then jumps
/// the clock, so this acts as a deterministic scheduling barrier.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(250)).await;
}

fn top_metrics() -> ScrollMetrics {
    ScrollMetrics {
        scroll_top: 0.0,
        scroll_height: 1500.0,
        client_height: 600.0,
    }
}

fn bottom_metrics() -> ScrollMetrics {
    ScrollMetrics {
        scroll_top: 900.0,
        scroll_height: 1500.0,
        client_height: 600.0,
    }
}

#[tokio::test(start_paused = true)]
async fn test_pushed_messages_flow_into_the_cache_in_order() {
    let feed = InMemoryFeed::new();
    let state = SessionState::new(MemberId::new("alice"), conversation());
    let (runtime, driver, _events) = SessionRuntime::new(
        state,
        &feed,
        Arc::new(InMemoryHistory::new(vec![])),
        Arc::new(InMemoryReadState::new()),
        Arc::new(RecordingSurface::default()),
    );
    let handle = tokio::spawn(runtime.run());

    for (id, secs) in [("a", 100), ("b", 200), ("c", 300)] {
        feed.publish(conversation(), added_event(id, secs));
    }
    // Duplicate delivery of the newest message.
    feed.publish(conversation(), added_event("c", 300));
    settle().await;

    driver.detach();
    let state = handle.await.expect("runtime finished");

    let ids: Vec<String> = state
        .cache
        .iter()
        .map(|m| m.id().as_str().to_string())
        .collect();
    assert_eq!(ids, vec!["c", "b", "a"]);
}

#[tokio::test(start_paused = true)]
async fn test_events_for_other_conversations_are_invisible() {
    let feed = InMemoryFeed::new();
    let state = SessionState::new(MemberId::new("alice"), conversation());
    let (runtime, driver, _events) = SessionRuntime::new(
        state,
        &feed,
        Arc::new(InMemoryHistory::new(vec![])),
        Arc::new(InMemoryReadState::new()),
        Arc::new(RecordingSurface::default()),
    );
    let handle = tokio::spawn(runtime.run());

    feed.publish(
        ConversationId::Channel(ChannelId::new("random")),
        added_event("elsewhere", 100),
    );
    feed.publish(conversation(), added_event("here", 200));
    settle().await;

    driver.detach();
    let state = handle.await.expect("runtime finished");
    assert_eq!(state.message_count(), 1);
    assert!(state.cache.contains(&MessageId::new("here")));
}

#[tokio::test(start_paused = true)]
async fn test_first_content_jumps_then_following_scrolls_smoothly() {
    let feed = InMemoryFeed::new();
    let surface = Arc::new(RecordingSurface::default());
    let state = SessionState::new(MemberId::new("alice"), conversation());
    let (runtime, driver, _events) = SessionRuntime::new(
        state,
        &feed,
        Arc::new(InMemoryHistory::new(vec![])),
        Arc::new(InMemoryReadState::new()),
        Arc::clone(&surface),
    );
    let handle = tokio::spawn(runtime.run());

    // First content: debounced immediate jump.
    feed.publish(conversation(), added_event("a", 100));
    settle().await;
    assert_eq!(surface.recorded(), vec![ScrollBehavior::Jump]);

    // Surface settles at the bottom, then a new message arrives.
    driver.scroll_moved(bottom_metrics());
    settle().await;
    feed.publish(conversation(), added_event("b", 200));
    settle().await;
    assert_eq!(
        surface.recorded(),
        vec![ScrollBehavior::Jump, ScrollBehavior::Smooth]
    );

    driver.detach();
    handle.await.expect("runtime finished");
}

#[tokio::test(start_paused = true)]
async fn test_manual_scroll_preempts_the_debounced_autoscroll() {
    let feed = InMemoryFeed::new();
    let surface = Arc::new(RecordingSurface::default());
    let state = SessionState::new(MemberId::new("alice"), conversation());
    let (runtime, driver, _events) = SessionRuntime::new(
        state,
        &feed,
        Arc::new(InMemoryHistory::new(vec![])),
        Arc::new(InMemoryReadState::new()),
        Arc::clone(&surface),
    );
    let handle = tokio::spawn(runtime.run());

    feed.publish(conversation(), added_event("a", 100));
    settle().await;
    driver.scroll_moved(bottom_metrics());
    settle().await;

    // New content queues a smooth follow, but the user scrolls up before
    // the debounce elapses: the queued scroll must never fire.
    feed.publish(conversation(), added_event("b", 200));
    driver.scroll_moved(ScrollMetrics {
        scroll_top: 100.0,
        ..bottom_metrics()
    });
    settle().await;

    assert_eq!(surface.recorded(), vec![ScrollBehavior::Jump]);

    driver.detach();
    handle.await.expect("runtime finished");
}

#[tokio::test(start_paused = true)]
async fn test_top_scroll_pages_backward_until_exhausted() {
    let feed = InMemoryFeed::new();
    let state = SessionState::new(MemberId::new("alice"), conversation());
    let (runtime, driver, _events) = SessionRuntime::new(
        state,
        &feed,
        Arc::new(InMemoryHistory::new(archive(120))),
        Arc::new(InMemoryReadState::new()),
        Arc::new(RecordingSurface::default()),
    );
    let handle = tokio::spawn(runtime.run());

    // Three top hits: 50 + 50 + 20, then the archive is exhausted.
    for _ in 0..3 {
        driver.scroll_moved(top_metrics());
        settle().await;
    }
    // A further top hit must not fetch anything.
    driver.scroll_moved(top_metrics());
    settle().await;

    driver.detach();
    let state = handle.await.expect("runtime finished");
    assert_eq!(state.message_count(), 120);
    assert_eq!(state.cache.oldest_id(), Some(&MessageId::new("h0")));
}

#[tokio::test(start_paused = true)]
async fn test_reaching_bottom_advances_the_stored_marker() {
    let feed = InMemoryFeed::new();
    let committer = Arc::new(InMemoryReadState::new());
    let state = SessionState::new(MemberId::new("alice"), conversation());
    let (runtime, driver, _events) = SessionRuntime::new(
        state,
        &feed,
        Arc::new(InMemoryHistory::new(vec![])),
        Arc::clone(&committer),
        Arc::new(RecordingSurface::default()),
    );
    let handle = tokio::spawn(runtime.run());

    feed.publish(conversation(), added_event("a", 100));
    feed.publish(conversation(), added_event("b", 200));
    settle().await;

    driver.scroll_moved(bottom_metrics());
    settle().await;

    let marker = committer
        .marker(&MemberId::new("alice"), &conversation())
        .expect("marker committed");
    assert_eq!(marker.last_message_id, Some(MessageId::new("b")));

    driver.detach();
    let state = handle.await.expect("runtime finished");
    // The collaborator's response refreshed the cached copy: nothing unread.
    assert!(!state.has_unread());
}

#[tokio::test(start_paused = true)]
async fn test_explicit_mark_read_is_idempotent() {
    let feed = InMemoryFeed::new();
    let committer = Arc::new(InMemoryReadState::new());
    let state = SessionState::new(MemberId::new("alice"), conversation());
    let (runtime, driver, _events) = SessionRuntime::new(
        state,
        &feed,
        Arc::new(InMemoryHistory::new(vec![])),
        Arc::clone(&committer),
        Arc::new(RecordingSurface::default()),
    );
    let handle = tokio::spawn(runtime.run());

    feed.publish(conversation(), added_event("a", 100));
    settle().await;

    driver.mark_read();
    settle().await;
    // Second commit targets the same newest message: rejected server-side,
    // still success here.
    driver.mark_read();
    settle().await;

    let marker = committer
        .marker(&MemberId::new("alice"), &conversation())
        .expect("marker committed");
    assert_eq!(marker.last_message_id, Some(MessageId::new("a")));

    driver.detach();
    handle.await.expect("runtime finished");
}

#[tokio::test(start_paused = true)]
async fn test_teardown_stops_stale_deliveries() {
    let feed = InMemoryFeed::new();
    let state = SessionState::new(MemberId::new("alice"), conversation());
    let (runtime, driver, _events) = SessionRuntime::new(
        state,
        &feed,
        Arc::new(InMemoryHistory::new(vec![])),
        Arc::new(InMemoryReadState::new()),
        Arc::new(RecordingSurface::default()),
    );
    let handle = tokio::spawn(runtime.run());

    feed.publish(conversation(), added_event("a", 100));
    settle().await;

    driver.detach();
    let state = handle.await.expect("runtime finished");
    assert_eq!(state.message_count(), 1);

    // Deliveries after teardown go nowhere; a fresh session for the next
    // conversation starts from its own empty cache.
    feed.publish(conversation(), added_event("ghost", 200));
    settle().await;
    assert_eq!(state.message_count(), 1);
}
