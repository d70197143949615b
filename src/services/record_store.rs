//! Record store and change feed boundaries.
//!
//! The hosted service is reached through two seams: [`RecordStore`] for
//! request/response reads and writes, and [`ChangeFeed`] for row-level push
//! events. Push events are handed to an [`EventSink`], which forwards them into
//! the view's signal queue.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::errors::{StoreError, SubscriptionError};
use crate::types::realtime::{ChangeEvent, Signal, SubscriptionFilter, SubscriptionHandle};

/// Request/response access to the bookmark table.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// All records owned by `owner_id`, newest `created_at` first.
    async fn query_by_owner(&self, owner_id: &str) -> Result<Vec<Bookmark>, StoreError>;
    /// Creates a record; the store assigns `id` and `created_at`.
    async fn insert(&self, fields: &NewBookmark) -> Result<Bookmark, StoreError>;
    /// Deletes a record by id. Deleting an absent id succeeds.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Sets the user identity later requests run under; `None` drops it.
    /// Stores without per-user authorization ignore this.
    fn authorize(&self, _access_token: Option<&str>) {}
}

/// Subscribe/unsubscribe access to the store's row-level change events.
pub trait ChangeFeed: Send + Sync {
    fn subscribe(
        &self,
        filter: &SubscriptionFilter,
        sink: EventSink,
    ) -> Result<SubscriptionHandle, SubscriptionError>;
    fn unsubscribe(&self, handle: &SubscriptionHandle);
}

/// Delivery endpoint for one subscription.
///
/// A sink is tied to the subscription generation it was created for. Once the
/// owning subscription is closed (or replaced) the sink drops every event,
/// so a feed that keeps a stale sink can never reach a newer view.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: UnboundedSender<Signal>,
    generation: u64,
    active: Arc<AtomicU64>,
}

impl EventSink {
    pub fn new(tx: UnboundedSender<Signal>, generation: u64, active: Arc<AtomicU64>) -> Self {
        Self {
            tx,
            generation,
            active,
        }
    }

    /// Whether the subscription behind this sink is still the open one.
    pub fn is_open(&self) -> bool {
        self.active.load(Ordering::Acquire) == self.generation && !self.tx.is_closed()
    }

    /// Forwards a push event into the signal queue.
    ///
    /// Returns `false` when the event was dropped because the sink is stale.
    pub fn deliver(&self, event: ChangeEvent) -> bool {
        if !self.is_open() {
            debug!(generation = self.generation, "Dropping change event for closed subscription");
            return false;
        }
        self.tx.send(Signal::remote(event)).is_ok()
    }
}

/// Change feed for backends without a push channel.
///
/// Every subscription attempt fails; views fall back to refetching on
/// visibility changes.
#[derive(Debug, Default)]
pub struct DetachedFeed;

impl ChangeFeed for DetachedFeed {
    fn subscribe(
        &self,
        filter: &SubscriptionFilter,
        _sink: EventSink,
    ) -> Result<SubscriptionHandle, SubscriptionError> {
        Err(SubscriptionError::Unsupported(format!(
            "no push channel for table '{}'",
            filter.table
        )))
    }

    fn unsubscribe(&self, _handle: &SubscriptionHandle) {}
}
