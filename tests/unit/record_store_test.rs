//! Unit tests for the SQLite record store and its change feed.

use std::sync::atomic::AtomicU64;
use std::sync::Arc;

use realtime_bookmarks::services::record_store::{ChangeFeed, DetachedFeed, EventSink, RecordStore};
use realtime_bookmarks::services::sqlite_store::{SqliteRecordStore, CHANNEL_NAME};
use realtime_bookmarks::types::bookmark::NewBookmark;
use realtime_bookmarks::types::errors::{StoreError, SubscriptionError};
use realtime_bookmarks::types::realtime::{
    ChangeEvent, DeletedRecord, Mutation, Signal, SignalOrigin, SubscriptionFilter,
};
use tokio::sync::mpsc::{self, UnboundedReceiver};

fn new_bookmark(owner: &str, title: &str) -> NewBookmark {
    NewBookmark {
        title: title.to_string(),
        url: "https://example.com".to_string(),
        owner_id: owner.to_string(),
    }
}

fn filter(owner: &str) -> SubscriptionFilter {
    SubscriptionFilter {
        table: "bookmarks".to_string(),
        owner_id: owner.to_string(),
    }
}

/// An open sink (generation 1 of 1) plus the receiving end of its queue.
fn open_sink() -> (EventSink, Arc<AtomicU64>, UnboundedReceiver<Signal>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let active = Arc::new(AtomicU64::new(1));
    (EventSink::new(tx, 1, active.clone()), active, rx)
}

#[tokio::test]
async fn test_query_returns_only_owner_rows_newest_first() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    let first = store.insert(&new_bookmark("u1", "First")).await.unwrap();
    store.insert(&new_bookmark("u2", "Other")).await.unwrap();
    let second = store.insert(&new_bookmark("u1", "Second")).await.unwrap();

    let rows = store.query_by_owner("u1").await.unwrap();
    let ids: Vec<&str> = rows.iter().map(|b| b.id.as_str()).collect();
    assert_eq!(ids, vec![second.id.as_str(), first.id.as_str()]);
    assert!(second.created_at > first.created_at);
}

#[tokio::test]
async fn test_query_empty_is_not_an_error() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    assert!(store.query_by_owner("nobody").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_injected_query_failure_is_distinguishable() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    store.fail_next_query();
    let err = store.query_by_owner("u1").await.unwrap_err();
    assert!(matches!(err, StoreError::Rejected { status: 503, .. }));
    assert!(store.query_by_owner("u1").await.is_ok());
}

#[tokio::test]
async fn test_delete_absent_id_succeeds() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    assert!(store.delete("missing").await.is_ok());
}

#[tokio::test]
async fn test_insert_and_delete_are_pushed_to_matching_owner() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    let (sink, _active, mut rx) = open_sink();
    let handle = store.subscribe(&filter("u1"), sink).unwrap();
    assert_eq!(handle.channel, CHANNEL_NAME);

    let record = store.insert(&new_bookmark("u1", "Mine")).await.unwrap();
    store.insert(&new_bookmark("u2", "Theirs")).await.unwrap();
    store.delete(&record.id).await.unwrap();

    let insert = rx.try_recv().unwrap();
    assert_eq!(insert.origin, SignalOrigin::Remote);
    assert_eq!(insert.mutation, Mutation::Insert(record.clone()));
    let delete = rx.try_recv().unwrap();
    assert_eq!(delete.mutation, Mutation::Delete(record.id.clone()));
    assert!(rx.try_recv().is_err(), "other owner's insert must not be delivered");
}

#[tokio::test]
async fn test_unsubscribe_stops_delivery() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    let (sink, _active, mut rx) = open_sink();
    let handle = store.subscribe(&filter("u1"), sink).unwrap();
    assert_eq!(store.subscriber_count(), 1);

    store.unsubscribe(&handle);
    assert_eq!(store.subscriber_count(), 0);

    store.insert(&new_bookmark("u1", "Late")).await.unwrap();
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_stale_sink_is_pruned_on_publish() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    let (sink, active, mut rx) = open_sink();
    store.subscribe(&filter("u1"), sink).unwrap();

    // A newer generation supersedes the sink without unsubscribing it.
    active.store(2, std::sync::atomic::Ordering::SeqCst);
    store.insert(&new_bookmark("u1", "Ghost")).await.unwrap();

    assert!(rx.try_recv().is_err());
    assert_eq!(store.subscriber_count(), 0);
}

#[test]
fn test_subscribe_unknown_table_fails() {
    let store = SqliteRecordStore::open_in_memory().unwrap();
    let (sink, _active, _rx) = open_sink();
    let mut f = filter("u1");
    f.table = "notes".to_string();
    assert!(matches!(
        store.subscribe(&f, sink),
        Err(SubscriptionError::Failed(_))
    ));
}

#[test]
fn test_detached_feed_is_unsupported() {
    let (sink, _active, _rx) = open_sink();
    assert!(matches!(
        DetachedFeed.subscribe(&filter("u1"), sink),
        Err(SubscriptionError::Unsupported(_))
    ));
}

#[test]
fn test_sink_drops_events_once_generation_moves_on() {
    let (sink, active, mut rx) = open_sink();
    let event = ChangeEvent::Delete(DeletedRecord { id: "a".to_string() });

    assert!(sink.deliver(event.clone()));
    active.store(0, std::sync::atomic::Ordering::SeqCst);
    assert!(!sink.is_open());
    assert!(!sink.deliver(event));

    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_change_event_wire_format() {
    let json = serde_json::json!({"operation": "DELETE", "record": {"id": "b-1"}});
    let event: ChangeEvent = serde_json::from_value(json).unwrap();
    assert_eq!(event, ChangeEvent::Delete(DeletedRecord { id: "b-1".to_string() }));
}
