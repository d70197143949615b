//! Unit tests for the SubscriptionManager: one live subscription per view,
//! no listener left behind after close, replace or drop.

use std::sync::{Arc, Mutex};

use realtime_bookmarks::managers::subscription_manager::{
    SubscriptionManager, SubscriptionManagerTrait,
};
use realtime_bookmarks::services::record_store::{ChangeFeed, EventSink};
use realtime_bookmarks::types::bookmark::Bookmark;
use realtime_bookmarks::types::errors::SubscriptionError;
use realtime_bookmarks::types::realtime::{
    ChangeEvent, Mutation, Signal, SubscriptionFilter, SubscriptionHandle,
};
use realtime_bookmarks::types::session::{SessionContext, User};
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Feed that records every subscribe/unsubscribe and keeps every sink it was
/// given, including ones whose subscription has been closed.
#[derive(Default)]
struct SpyFeed {
    sinks: Mutex<Vec<(SubscriptionHandle, SubscriptionFilter, EventSink)>>,
    unsubscribed: Mutex<Vec<u64>>,
    refuse: bool,
}

impl SpyFeed {
    fn refusing() -> Self {
        Self { refuse: true, ..Self::default() }
    }

    fn live(&self) -> usize {
        let unsubscribed = self.unsubscribed.lock().unwrap();
        self.sinks
            .lock()
            .unwrap()
            .iter()
            .filter(|(h, _, _)| !unsubscribed.contains(&h.id))
            .count()
    }

    /// Pushes `event` through every sink ever handed out. Returns how many accepted it.
    fn broadcast(&self, event: ChangeEvent) -> usize {
        self.sinks
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, _, sink)| sink.deliver(event.clone()))
            .count()
    }
}

impl ChangeFeed for SpyFeed {
    fn subscribe(
        &self,
        filter: &SubscriptionFilter,
        sink: EventSink,
    ) -> Result<SubscriptionHandle, SubscriptionError> {
        if self.refuse {
            return Err(SubscriptionError::Unsupported("spy".to_string()));
        }
        let mut sinks = self.sinks.lock().unwrap();
        let handle = SubscriptionHandle {
            id: sinks.len() as u64 + 1,
            channel: "spy".to_string(),
        };
        sinks.push((handle.clone(), filter.clone(), sink));
        Ok(handle)
    }

    fn unsubscribe(&self, handle: &SubscriptionHandle) {
        self.unsubscribed.lock().unwrap().push(handle.id);
    }
}

fn session(id: &str) -> SessionContext {
    SessionContext::new(User::new(id))
}

fn manager(feed: &Arc<SpyFeed>) -> (SubscriptionManager, UnboundedReceiver<Signal>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SubscriptionManager::new(feed.clone(), "bookmarks", tx), rx)
}

fn insert_event(id: &str) -> ChangeEvent {
    ChangeEvent::Insert(Bookmark {
        id: id.to_string(),
        title: "Pushed".to_string(),
        url: "https://example.com".to_string(),
        owner_id: "u1".to_string(),
        created_at: chrono::Utc::now(),
    })
}

#[test]
fn test_open_scopes_filter_to_owner() {
    let feed = Arc::new(SpyFeed::default());
    let (mut subs, _rx) = manager(&feed);

    subs.open(&session("u1")).unwrap();

    let sinks = feed.sinks.lock().unwrap();
    assert_eq!(sinks.len(), 1);
    assert_eq!(sinks[0].1.table, "bookmarks");
    assert_eq!(sinks[0].1.expression(), "user_id=eq.u1");
    drop(sinks);
    assert!(subs.is_open());
    assert!(subs.handle().is_some());
}

#[test]
fn test_events_are_forwarded_as_remote_signals() {
    let feed = Arc::new(SpyFeed::default());
    let (mut subs, mut rx) = manager(&feed);
    subs.open(&session("u1")).unwrap();

    assert_eq!(feed.broadcast(insert_event("a")), 1);

    let signal = rx.try_recv().unwrap();
    assert!(matches!(signal.mutation, Mutation::Insert(ref b) if b.id == "a"));
}

#[test]
fn test_reopen_closes_previous_subscription_first() {
    let feed = Arc::new(SpyFeed::default());
    let (mut subs, mut rx) = manager(&feed);

    subs.open(&session("u1")).unwrap();
    subs.open(&session("u2")).unwrap();

    assert_eq!(feed.live(), 1);
    assert_eq!(*feed.unsubscribed.lock().unwrap(), vec![1]);

    // Only the newest sink may deliver.
    assert_eq!(feed.broadcast(insert_event("a")), 1);
    assert!(rx.try_recv().is_ok());
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_close_leaves_no_dangling_listener() {
    let feed = Arc::new(SpyFeed::default());
    let (mut subs, mut rx) = manager(&feed);
    subs.open(&session("u1")).unwrap();

    subs.close();
    subs.close();

    assert!(!subs.is_open());
    assert_eq!(feed.live(), 0);
    assert_eq!(feed.unsubscribed.lock().unwrap().len(), 1);
    assert_eq!(feed.broadcast(insert_event("late")), 0);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_drop_unsubscribes() {
    let feed = Arc::new(SpyFeed::default());
    {
        let (mut subs, _rx) = manager(&feed);
        subs.open(&session("u1")).unwrap();
        assert_eq!(feed.live(), 1);
    }
    assert_eq!(feed.live(), 0);
    assert_eq!(feed.broadcast(insert_event("late")), 0);
}

#[test]
fn test_refused_subscription_is_reported_and_closed() {
    let feed = Arc::new(SpyFeed::refusing());
    let (mut subs, _rx) = manager(&feed);

    let result = subs.open(&session("u1"));
    assert!(matches!(result, Err(SubscriptionError::Unsupported(_))));
    assert!(!subs.is_open());
}
