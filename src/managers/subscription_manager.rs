//! Subscription Manager.
//!
//! Keeps at most one change subscription open per bookmark view, scoped to
//! the session owner's rows. Push events are forwarded into the view's signal
//! queue through an [`EventSink`]; closing the subscription invalidates the
//! sink before the feed is told to unsubscribe, so nothing can be delivered
//! into a view after it has been torn down.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::services::record_store::{ChangeFeed, EventSink};
use crate::types::errors::SubscriptionError;
use crate::types::realtime::{Signal, SubscriptionFilter, SubscriptionHandle};
use crate::types::session::SessionContext;

/// Generation value meaning "no subscription open".
const CLOSED: u64 = 0;

/// Trait defining subscription lifecycle operations.
pub trait SubscriptionManagerTrait {
    fn open(&mut self, session: &SessionContext) -> Result<(), SubscriptionError>;
    fn close(&mut self);
    fn is_open(&self) -> bool;
}

/// Owns the single live subscription of one bookmark view.
pub struct SubscriptionManager {
    feed: Arc<dyn ChangeFeed>,
    table: String,
    signals: UnboundedSender<Signal>,
    active: Arc<AtomicU64>,
    next_generation: u64,
    handle: Option<SubscriptionHandle>,
}

impl SubscriptionManager {
    pub fn new(feed: Arc<dyn ChangeFeed>, table: impl Into<String>, signals: UnboundedSender<Signal>) -> Self {
        Self {
            feed,
            table: table.into(),
            signals,
            active: Arc::new(AtomicU64::new(CLOSED)),
            next_generation: CLOSED,
            handle: None,
        }
    }

    pub fn handle(&self) -> Option<&SubscriptionHandle> {
        self.handle.as_ref()
    }
}

impl SubscriptionManagerTrait for SubscriptionManager {
    /// Opens a subscription for the session owner, closing any previous one first.
    fn open(&mut self, session: &SessionContext) -> Result<(), SubscriptionError> {
        self.close();

        self.next_generation += 1;
        let generation = self.next_generation;
        self.active.store(generation, Ordering::Release);

        let filter = SubscriptionFilter {
            table: self.table.clone(),
            owner_id: session.owner_id().to_string(),
        };
        let sink = EventSink::new(self.signals.clone(), generation, self.active.clone());

        match self.feed.subscribe(&filter, sink) {
            Ok(handle) => {
                info!(owner = %filter.owner_id, handle = handle.id, "Subscribed to bookmark changes");
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.active.store(CLOSED, Ordering::Release);
                warn!(owner = %filter.owner_id, error = %e, "Subscription unavailable, relying on refetch");
                Err(e)
            }
        }
    }

    /// Closes the open subscription, if any. Idempotent.
    fn close(&mut self) {
        self.active.store(CLOSED, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            self.feed.unsubscribe(&handle);
            info!(handle = handle.id, "Unsubscribed from bookmark changes");
        }
    }

    fn is_open(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.close();
    }
}
