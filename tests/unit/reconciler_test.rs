//! Unit tests for the bookmark collection reconciler.

use chrono::{DateTime, TimeZone, Utc};
use realtime_bookmarks::managers::reconciler::Reconciler;
use realtime_bookmarks::types::bookmark::Bookmark;
use realtime_bookmarks::types::realtime::{ChangeEvent, DeletedRecord, Mutation};

const OWNER: &str = "user-1";

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn bookmark(id: &str, secs: i64) -> Bookmark {
    Bookmark {
        id: id.to_string(),
        title: format!("Site {}", id.to_uppercase()),
        url: format!("https://{}.example", id),
        owner_id: OWNER.to_string(),
        created_at: at(secs),
    }
}

fn ids(r: &Reconciler) -> Vec<&str> {
    r.bookmarks().iter().map(|b| b.id.as_str()).collect()
}

#[test]
fn test_insert_into_empty_collection() {
    let mut r = Reconciler::new(OWNER);
    assert!(r.apply_insert(bookmark("a", 1)));
    assert_eq!(ids(&r), vec!["a"]);
}

#[test]
fn test_duplicate_insert_is_noop() {
    let mut r = Reconciler::new(OWNER);
    r.replace_all(vec![bookmark("a", 2), bookmark("b", 1)]);

    assert!(!r.apply_insert(bookmark("a", 2)));
    assert_eq!(ids(&r), vec!["a", "b"]);
}

#[test]
fn test_newer_insert_goes_to_head() {
    let mut r = Reconciler::new(OWNER);
    r.replace_all(vec![bookmark("a", 2), bookmark("b", 1)]);

    r.apply_insert(bookmark("c", 3));
    assert_eq!(ids(&r), vec!["c", "a", "b"]);
}

#[test]
fn test_rollback_restores_original_position() {
    let mut r = Reconciler::new(OWNER);
    r.replace_all(vec![bookmark("a", 3), bookmark("b", 2), bookmark("c", 1)]);

    let removed = r.apply_delete("b").expect("b is present");
    assert_eq!(ids(&r), vec!["a", "c"]);

    assert!(r.rollback_delete(removed));
    assert_eq!(ids(&r), vec!["a", "b", "c"]);
}

#[test]
fn test_rollback_after_push_reinsert_does_not_duplicate() {
    let mut r = Reconciler::new(OWNER);
    r.replace_all(vec![bookmark("a", 2), bookmark("b", 1)]);

    let removed = r.apply_delete("b").unwrap();
    r.apply_insert(removed.clone());
    assert!(!r.rollback_delete(removed));
    assert_eq!(ids(&r), vec!["a", "b"]);
}

#[test]
fn test_delete_missing_id_is_noop() {
    let mut r = Reconciler::new(OWNER);
    r.replace_all(vec![bookmark("a", 1)]);
    assert!(r.apply_delete("zzz").is_none());
    assert_eq!(r.len(), 1);
}

#[test]
fn test_replace_all_discards_previous_content() {
    let mut r = Reconciler::new(OWNER);
    r.replace_all(vec![bookmark("a", 1), bookmark("b", 2)]);
    r.replace_all(vec![bookmark("c", 5)]);
    assert_eq!(ids(&r), vec!["c"]);
}

#[test]
fn test_replace_all_sorts_unordered_input() {
    let mut r = Reconciler::new(OWNER);
    r.replace_all(vec![bookmark("old", 1), bookmark("new", 9), bookmark("mid", 5)]);
    assert_eq!(ids(&r), vec!["new", "mid", "old"]);
}

#[test]
fn test_equal_timestamps_break_ties_by_id() {
    let mut r = Reconciler::new(OWNER);
    r.apply_insert(bookmark("a", 1));
    r.apply_insert(bookmark("c", 1));
    r.apply_insert(bookmark("b", 1));
    assert_eq!(ids(&r), vec!["c", "b", "a"]);
}

#[test]
fn test_foreign_owner_records_are_ignored() {
    let mut r = Reconciler::new(OWNER);
    let mut foreign = bookmark("x", 4);
    foreign.owner_id = "someone-else".to_string();

    assert!(!r.apply_insert(foreign.clone()));
    r.replace_all(vec![foreign, bookmark("a", 1)]);
    assert_eq!(ids(&r), vec!["a"]);
}

#[test]
fn test_apply_dispatches_push_events() {
    let mut r = Reconciler::new(OWNER);
    assert!(r.apply(ChangeEvent::Insert(bookmark("a", 1)).into()));
    assert!(r.apply(ChangeEvent::Delete(DeletedRecord { id: "a".to_string() }).into()));
    assert!(r.is_empty());
    assert!(r.apply(Mutation::Restore(bookmark("a", 1))));
    assert!(r.contains("a"));
}
