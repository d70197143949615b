//! SQLite-backed stand-in for the hosted record store.
//!
//! Implements both [`RecordStore`] and [`ChangeFeed`] in-process: every
//! successful insert or delete is pushed to the subscriptions whose owner
//! filter matches the affected row. Used by the demo binary, the RPC bridge's
//! offline mode and the test suite.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::database::Database;
use crate::services::record_store::{ChangeFeed, EventSink, RecordStore};
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::errors::{StoreError, SubscriptionError};
use crate::types::realtime::{ChangeEvent, DeletedRecord, SubscriptionFilter, SubscriptionHandle};

/// Channel name reported on subscription handles.
pub const CHANNEL_NAME: &str = "realtime-bookmarks";

/// The only table this store serves; its schema lives in `database::migrations`.
pub const TABLE_NAME: &str = "bookmarks";

struct Subscriber {
    owner_id: String,
    sink: EventSink,
}

/// One-shot failures armed by tests and demos.
#[derive(Default)]
struct Faults {
    query: AtomicBool,
    insert: AtomicBool,
    delete: AtomicBool,
}

/// Record store and change feed backed by a local SQLite database.
pub struct SqliteRecordStore {
    db: Mutex<Database>,
    subscribers: Mutex<HashMap<u64, Subscriber>>,
    next_handle: AtomicU64,
    last_created_micros: Mutex<i64>,
    faults: Faults,
}

impl SqliteRecordStore {
    pub fn new(db: Database) -> Self {
        Self {
            db: Mutex::new(db),
            subscribers: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
            last_created_micros: Mutex::new(0),
            faults: Faults::default(),
        }
    }

    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Makes the next `query_by_owner` call fail with a rejection.
    pub fn fail_next_query(&self) {
        self.faults.query.store(true, Ordering::SeqCst);
    }

    /// Makes the next `insert` call fail with a rejection.
    pub fn fail_next_insert(&self) {
        self.faults.insert.store(true, Ordering::SeqCst);
    }

    /// Makes the next `delete` call fail with a rejection.
    pub fn fail_next_delete(&self) {
        self.faults.delete.store(true, Ordering::SeqCst);
    }

    /// Drops every subscription without notifying its view, as a lost push
    /// connection would.
    pub fn drop_subscriptions(&self) {
        let mut subscribers = self.lock_subscribers();
        warn!(count = subscribers.len(), "Dropping all change subscriptions");
        subscribers.clear();
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.lock_subscribers().len()
    }

    fn lock_db(&self) -> Result<MutexGuard<'_, Database>, StoreError> {
        self.db
            .lock()
            .map_err(|e| StoreError::Database(format!("connection lock poisoned: {}", e)))
    }

    fn lock_subscribers(&self) -> MutexGuard<'_, HashMap<u64, Subscriber>> {
        // A panic while holding the map cannot leave it half-updated.
        self.subscribers
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Assigns a strictly increasing creation timestamp.
    fn next_created_at(&self) -> Result<DateTime<Utc>, StoreError> {
        let mut last = self
            .last_created_micros
            .lock()
            .map_err(|e| StoreError::Database(format!("clock lock poisoned: {}", e)))?;
        let micros = Utc::now().timestamp_micros().max(*last + 1);
        *last = micros;
        micros_to_datetime(micros)
    }

    /// Pushes `event` to every open subscription for `owner_id`, pruning stale ones.
    fn publish(&self, owner_id: &str, event: ChangeEvent) {
        let mut subscribers = self.lock_subscribers();
        subscribers.retain(|handle, sub| {
            if sub.owner_id != owner_id {
                return true;
            }
            let delivered = sub.sink.deliver(event.clone());
            if !delivered {
                debug!(handle, "Pruning closed subscription");
            }
            delivered
        });
    }

    fn check_fault(flag: &AtomicBool, operation: &str) -> Result<(), StoreError> {
        if flag.swap(false, Ordering::SeqCst) {
            warn!(operation, "Injected record store failure");
            return Err(StoreError::Rejected {
                status: 503,
                message: format!("{} unavailable", operation),
            });
        }
        Ok(())
    }
}

fn micros_to_datetime(micros: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp_micros(micros)
        .ok_or_else(|| StoreError::Decode(format!("created_at out of range: {}", micros)))
}

/// Reads a `(id, title, url, user_id, created_at)` row.
fn row_to_parts(row: &rusqlite::Row) -> rusqlite::Result<(String, String, String, String, i64)> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?, row.get(4)?))
}

#[async_trait]
impl RecordStore for SqliteRecordStore {
    async fn query_by_owner(&self, owner_id: &str) -> Result<Vec<Bookmark>, StoreError> {
        Self::check_fault(&self.faults.query, "query")?;

        let db = self.lock_db()?;
        let mut stmt = db.connection().prepare(
            "SELECT id, title, url, user_id, created_at FROM bookmarks \
             WHERE user_id = ?1 ORDER BY created_at DESC, id DESC",
        )?;
        let rows = stmt.query_map(params![owner_id], row_to_parts)?;

        let mut results = Vec::new();
        for row in rows {
            let (id, title, url, owner_id, created_at) = row?;
            results.push(Bookmark {
                id,
                title,
                url,
                owner_id,
                created_at: micros_to_datetime(created_at)?,
            });
        }
        Ok(results)
    }

    async fn insert(&self, fields: &NewBookmark) -> Result<Bookmark, StoreError> {
        Self::check_fault(&self.faults.insert, "insert")?;

        let record = Bookmark {
            id: Uuid::new_v4().to_string(),
            title: fields.title.clone(),
            url: fields.url.clone(),
            owner_id: fields.owner_id.clone(),
            created_at: self.next_created_at()?,
        };

        {
            let db = self.lock_db()?;
            db.connection().execute(
                "INSERT INTO bookmarks (id, title, url, user_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    record.id,
                    record.title,
                    record.url,
                    record.owner_id,
                    record.created_at.timestamp_micros()
                ],
            )?;
        }

        debug!(id = %record.id, owner = %record.owner_id, "Inserted bookmark");
        self.publish(&record.owner_id, ChangeEvent::Insert(record.clone()));
        Ok(record)
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        Self::check_fault(&self.faults.delete, "delete")?;

        let owner: Option<String> = {
            let db = self.lock_db()?;
            let owner = db
                .connection()
                .query_row(
                    "SELECT user_id FROM bookmarks WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?;
            db.connection()
                .execute("DELETE FROM bookmarks WHERE id = ?1", params![id])?;
            owner
        };

        if let Some(owner_id) = owner {
            debug!(id, owner = %owner_id, "Deleted bookmark");
            self.publish(
                &owner_id,
                ChangeEvent::Delete(DeletedRecord { id: id.to_string() }),
            );
        }
        Ok(())
    }
}

impl ChangeFeed for SqliteRecordStore {
    fn subscribe(
        &self,
        filter: &SubscriptionFilter,
        sink: EventSink,
    ) -> Result<SubscriptionHandle, SubscriptionError> {
        if filter.table != TABLE_NAME {
            return Err(SubscriptionError::Failed(format!(
                "unknown table '{}'",
                filter.table
            )));
        }
        let id = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.lock_subscribers().insert(
            id,
            Subscriber {
                owner_id: filter.owner_id.clone(),
                sink,
            },
        );
        info!(handle = id, filter = %filter.expression(), "Opened change subscription");
        Ok(SubscriptionHandle {
            id,
            channel: CHANNEL_NAME.to_string(),
        })
    }

    fn unsubscribe(&self, handle: &SubscriptionHandle) {
        if self.lock_subscribers().remove(&handle.id).is_some() {
            info!(handle = handle.id, "Closed change subscription");
        }
    }
}
