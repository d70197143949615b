//! Bookmark Manager.
//!
//! One mounted bookmark view for one signed-in session. Implements
//! `BookmarkManagerTrait`, the command surface the presentation layer uses:
//! full reloads, validated adds and optimistic deletes.
//!
//! Every change to the list, whether from this client or from the change
//! feed, travels through a single signal queue and is applied by
//! [`BookmarkManager::pump`] in arrival order.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info, warn};

use crate::managers::reconciler::Reconciler;
use crate::managers::subscription_manager::{SubscriptionManager, SubscriptionManagerTrait};
use crate::services::record_store::{ChangeFeed, RecordStore};
use crate::services::validation;
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::errors::BookmarkError;
use crate::types::realtime::{Mutation, Signal, SignalOrigin};
use crate::types::session::SessionContext;

/// Trait defining bookmark view operations.
#[async_trait]
pub trait BookmarkManagerTrait {
    /// Replaces the list with the store's current rows for the session owner.
    async fn load_all(&mut self) -> Result<&[Bookmark], BookmarkError>;
    /// Validates, creates and optimistically shows a bookmark.
    async fn add_bookmark(&mut self, title: &str, url: &str) -> Result<Bookmark, BookmarkError>;
    /// Optimistically removes a bookmark, restoring it if the store refuses.
    async fn delete_bookmark(&mut self, id: &str) -> Result<(), BookmarkError>;
    fn bookmarks(&self) -> &[Bookmark];
}

/// Bookmark view bound to one session.
pub struct BookmarkManager {
    session: SessionContext,
    store: Arc<dyn RecordStore>,
    reconciler: Reconciler,
    subscriptions: SubscriptionManager,
    signals_tx: UnboundedSender<Signal>,
    signals_rx: UnboundedReceiver<Signal>,
}

impl BookmarkManager {
    /// Creates an unmounted view. Call [`mount`](Self::mount) to subscribe and load.
    pub fn new(
        session: SessionContext,
        store: Arc<dyn RecordStore>,
        feed: Arc<dyn ChangeFeed>,
        table: &str,
    ) -> Self {
        let (signals_tx, signals_rx) = mpsc::unbounded_channel();
        let reconciler = Reconciler::new(session.owner_id());
        let subscriptions = SubscriptionManager::new(feed, table, signals_tx.clone());
        Self {
            session,
            store,
            reconciler,
            subscriptions,
            signals_tx,
            signals_rx,
        }
    }

    /// Subscribes to the owner's changes, then performs the initial load.
    ///
    /// A subscription failure is logged and tolerated; a load failure is returned
    /// with the view still mounted (and empty) so a later refresh can recover.
    pub async fn mount(&mut self) -> Result<(), BookmarkError> {
        info!(owner = %self.session.owner_id(), "Mounting bookmark view");
        self.store.authorize(self.session.access_token());
        // Subscribe before querying so changes made in between are queued.
        if let Err(e) = self.subscriptions.open(&self.session) {
            debug!(error = %e, "Continuing without push updates");
        }
        self.load_all().await?;
        Ok(())
    }

    /// Closes the subscription and discards anything still queued.
    pub fn unmount(&mut self) {
        info!(owner = %self.session.owner_id(), "Unmounting bookmark view");
        self.subscriptions.close();
        self.store.authorize(None);
        while self.signals_rx.try_recv().is_ok() {}
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscriptions.is_open()
    }

    /// Queues a signal for the next [`pump`](Self::pump).
    pub fn enqueue(&self, signal: Signal) {
        // The receiver lives in `self`, so the channel cannot be closed here.
        let _ = self.signals_tx.send(signal);
    }

    /// Applies every queued signal in arrival order.
    ///
    /// Returns how many of them changed the list.
    pub fn pump(&mut self) -> usize {
        self.drain(None).0
    }

    /// Drains the queue like [`pump`](Self::pump), also reporting whether the
    /// last remote signal seen for `watched` was a delete.
    fn drain(&mut self, watched: Option<&str>) -> (usize, bool) {
        let mut changed = 0;
        let mut remote_deleted = false;
        while let Ok(signal) = self.signals_rx.try_recv() {
            debug!(origin = ?signal.origin, mutation = ?signal.mutation, "Applying signal");
            if signal.origin == SignalOrigin::Remote && watched.is_some() {
                match &signal.mutation {
                    Mutation::Delete(id) if Some(id.as_str()) == watched => remote_deleted = true,
                    Mutation::Insert(record) if Some(record.id.as_str()) == watched => {
                        remote_deleted = false
                    }
                    _ => {}
                }
            }
            if self.reconciler.apply(signal.mutation) {
                changed += 1;
            }
        }
        (changed, remote_deleted)
    }
}

#[async_trait]
impl BookmarkManagerTrait for BookmarkManager {
    /// On failure the current list is kept and the error returned; nothing is retried.
    async fn load_all(&mut self) -> Result<&[Bookmark], BookmarkError> {
        let owner_id = self.session.owner_id().to_string();
        let records = self.store.query_by_owner(&owner_id).await.map_err(|e| {
            warn!(owner = %owner_id, error = %e, "Bookmark load failed, keeping previous list");
            BookmarkError::LoadFailed(e)
        })?;

        self.reconciler.replace_all(records);
        // Events that raced the query are applied on top of the snapshot.
        self.pump();
        info!(owner = %owner_id, count = self.reconciler.len(), "Loaded bookmarks");
        Ok(self.reconciler.bookmarks())
    }

    async fn add_bookmark(&mut self, title: &str, url: &str) -> Result<Bookmark, BookmarkError> {
        validation::validate_bookmark(title, url)?;

        let fields = NewBookmark {
            title: title.to_string(),
            url: url.to_string(),
            owner_id: self.session.owner_id().to_string(),
        };
        let record = self.store.insert(&fields).await.map_err(|e| {
            warn!(error = %e, "Bookmark insert failed");
            BookmarkError::InsertFailed(e)
        })?;

        self.enqueue(Signal::local(Mutation::Insert(record.clone())));
        self.pump();
        info!(id = %record.id, "Added bookmark");
        Ok(record)
    }

    async fn delete_bookmark(&mut self, id: &str) -> Result<(), BookmarkError> {
        let record = self
            .reconciler
            .get(id)
            .cloned()
            .ok_or_else(|| BookmarkError::NotFound(id.to_string()))?;

        self.enqueue(Signal::local(Mutation::Delete(id.to_string())));
        self.pump();

        match self.store.delete(id).await {
            Ok(()) => {
                self.pump();
                info!(id, "Deleted bookmark");
                Ok(())
            }
            Err(e) => {
                // The store may have committed the delete before the request failed.
                let (_, remote_deleted) = self.drain(Some(id));
                if remote_deleted {
                    info!(id, error = %e, "Delete confirmed by change feed despite failed request");
                    return Ok(());
                }
                warn!(id, error = %e, "Bookmark delete failed, restoring");
                self.enqueue(Signal::local(Mutation::Restore(record)));
                self.pump();
                Err(BookmarkError::DeleteFailed(e))
            }
        }
    }

    fn bookmarks(&self) -> &[Bookmark] {
        self.reconciler.bookmarks()
    }
}
