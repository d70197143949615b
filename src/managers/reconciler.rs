//! Bookmark collection reconciler.
//!
//! Owns the authoritative list shown to the user and applies every inbound
//! change to it. Insert and delete are idempotent and keyed by `id`, so a
//! local optimistic action and the matching push event converge to the same
//! state in either arrival order.
//!
//! Invariants held after every operation:
//! - at most one entry per `id`;
//! - entries sorted by [`Bookmark::newest_first`];
//! - every entry belongs to the reconciler's owner.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::types::bookmark::Bookmark;
use crate::types::realtime::Mutation;

/// Ordered, de-duplicated bookmark list for one owner.
#[derive(Debug, Clone)]
pub struct Reconciler {
    owner_id: String,
    bookmarks: Vec<Bookmark>,
}

impl Reconciler {
    pub fn new(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: owner_id.into(),
            bookmarks: Vec::new(),
        }
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    pub fn len(&self) -> usize {
        self.bookmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    pub fn get(&self, id: &str) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|b| b.id == id)
    }

    fn index_of(&self, id: &str) -> Option<usize> {
        self.bookmarks.iter().position(|b| b.id == id)
    }

    fn owns(&self, record: &Bookmark) -> bool {
        if record.owner_id == self.owner_id {
            return true;
        }
        warn!(
            id = %record.id,
            owner = %record.owner_id,
            expected = %self.owner_id,
            "Ignoring bookmark owned by another user"
        );
        false
    }

    /// Replaces the whole collection with a fresh query result.
    ///
    /// Foreign-owned rows and repeated ids are dropped; the result is re-sorted
    /// so the ordering invariant holds whatever order the store used.
    pub fn replace_all(&mut self, records: Vec<Bookmark>) {
        let mut records: Vec<Bookmark> = records.into_iter().filter(|r| self.owns(r)).collect();
        records.sort_by(Bookmark::newest_first);
        let mut seen = HashSet::new();
        records.retain(|r| seen.insert(r.id.clone()));
        debug!(owner = %self.owner_id, count = records.len(), "Replaced bookmark collection");
        self.bookmarks = records;
    }

    /// Inserts `record` at its ordered position unless its id is already present.
    ///
    /// Returns `true` when the collection changed.
    pub fn apply_insert(&mut self, record: Bookmark) -> bool {
        if self.contains(&record.id) || !self.owns(&record) {
            return false;
        }
        let at = self
            .bookmarks
            .partition_point(|b| Bookmark::newest_first(b, &record).is_lt());
        self.bookmarks.insert(at, record);
        true
    }

    /// Removes the record with `id`, returning it if it was present.
    pub fn apply_delete(&mut self, id: &str) -> Option<Bookmark> {
        let index = self.index_of(id)?;
        Some(self.bookmarks.remove(index))
    }

    /// Puts back a record removed by an optimistic delete that the store refused.
    ///
    /// Ordering by `created_at` returns it to its original position.
    pub fn rollback_delete(&mut self, record: Bookmark) -> bool {
        let id = record.id.clone();
        let restored = self.apply_insert(record);
        if restored {
            debug!(id = %id, "Rolled back optimistic delete");
        }
        restored
    }

    /// Applies one queued mutation. Returns `true` when the collection changed.
    pub fn apply(&mut self, mutation: Mutation) -> bool {
        match mutation {
            Mutation::Insert(record) => self.apply_insert(record),
            Mutation::Delete(id) => self.apply_delete(&id).is_some(),
            Mutation::Restore(record) => self.rollback_delete(record),
        }
    }
}
