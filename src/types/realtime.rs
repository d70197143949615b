use serde::{Deserialize, Serialize};

use super::bookmark::Bookmark;

/// Identifier of a record removed by a delete event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedRecord {
    pub id: String,
}

/// A row-level change pushed by the record store's change feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "record", rename_all = "UPPERCASE")]
pub enum ChangeEvent {
    Insert(Bookmark),
    Delete(DeletedRecord),
}

/// Where a queued signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalOrigin {
    /// An optimistic action taken by this client.
    Local,
    /// A push event delivered by the change feed.
    Remote,
}

/// A state change for the bookmark collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Insert(Bookmark),
    Delete(String),
    /// Undo of an optimistic delete whose store request failed.
    Restore(Bookmark),
}

impl From<ChangeEvent> for Mutation {
    fn from(event: ChangeEvent) -> Self {
        match event {
            ChangeEvent::Insert(record) => Mutation::Insert(record),
            ChangeEvent::Delete(deleted) => Mutation::Delete(deleted.id),
        }
    }
}

/// One entry of the signal queue drained by the bookmark view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub origin: SignalOrigin,
    pub mutation: Mutation,
}

impl Signal {
    pub fn local(mutation: Mutation) -> Self {
        Self {
            origin: SignalOrigin::Local,
            mutation,
        }
    }

    pub fn remote(event: ChangeEvent) -> Self {
        Self {
            origin: SignalOrigin::Remote,
            mutation: event.into(),
        }
    }
}

/// Scope of a change subscription: one table, one owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionFilter {
    pub table: String,
    pub owner_id: String,
}

impl SubscriptionFilter {
    /// Filter expression in the hosted service's `column=op.value` form.
    pub fn expression(&self) -> String {
        format!("user_id=eq.{}", self.owner_id)
    }
}

/// Handle returned by a change feed for a live subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub id: u64,
    pub channel: String,
}
