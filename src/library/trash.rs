//! Soft delete for hymns.
//!
//! Trashed hymns move out of the active collection into the `hymn-trash`
//! collection with a timestamp, can be restored, and are purged once older
//! than the configured retention.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{Library, LibraryError, LibraryResult};
use crate::models::Hymn;
use crate::seed;
use crate::store::{keys, load_collection, save_collection};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrashedItemType {
    Hymn,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrashedItem {
    pub original_id: String,
    pub item_type: TrashedItemType,
    /// Snapshot of the hymn as it was when trashed.
    pub data: Hymn,
    pub trashed_at: DateTime<Utc>,
}

impl TrashedItem {
    pub fn age_days(&self, now: DateTime<Utc>) -> i64 {
        (now - self.trashed_at).num_days()
    }
}

/// Result of a trash operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrashOutcome {
    pub trashed: Vec<String>,
    pub missing: Vec<String>,
}

impl Library {
    pub fn trash(&self) -> LibraryResult<Vec<TrashedItem>> {
        self.load(keys::HYMN_TRASH, Vec::new)
    }

    /// Move hymns to the trash. Ids with no active hymn are reported, not fatal.
    pub fn trash_hymns(&self, ids: &[&str]) -> LibraryResult<TrashOutcome> {
        self.trash_hymns_at(ids, Utc::now())
    }

    pub fn trash_hymns_at(&self, ids: &[&str], now: DateTime<Utc>) -> LibraryResult<TrashOutcome> {
        let _guard = self.lock()?;
        let store = self.store.as_ref();

        let mut hymns: Vec<Hymn> = load_collection(store, keys::HYMNS, seed::hymns)?;
        let mut trash: Vec<TrashedItem> = load_collection(store, keys::HYMN_TRASH, Vec::new)?;
        let mut outcome = TrashOutcome::default();

        for id in ids {
            match hymns.iter().position(|h| h.id == *id) {
                Some(index) => {
                    let hymn = hymns.remove(index);
                    trash.retain(|t| t.original_id != hymn.id);
                    trash.push(TrashedItem {
                        original_id: hymn.id.clone(),
                        item_type: TrashedItemType::Hymn,
                        data: hymn,
                        trashed_at: now,
                    });
                    outcome.trashed.push(id.to_string());
                }
                None => outcome.missing.push(id.to_string()),
            }
        }

        if outcome.trashed.is_empty() {
            return Ok(outcome);
        }

        // Trash first: a failure in between leaves a duplicate, never a loss.
        save_collection(store, keys::HYMN_TRASH, &trash)?;
        save_collection(store, keys::HYMNS, &hymns)?;

        tracing::info!(
            trashed = outcome.trashed.len(),
            missing = outcome.missing.len(),
            "Moved hymns to trash"
        );
        Ok(outcome)
    }

    /// Move a trashed hymn back into the active collection.
    pub fn restore_hymn(&self, original_id: &str) -> LibraryResult<Hymn> {
        let _guard = self.lock()?;
        let store = self.store.as_ref();

        let mut hymns: Vec<Hymn> = load_collection(store, keys::HYMNS, seed::hymns)?;
        let mut trash: Vec<TrashedItem> = load_collection(store, keys::HYMN_TRASH, Vec::new)?;

        let index = trash
            .iter()
            .position(|t| t.original_id == original_id)
            .ok_or_else(|| LibraryError::not_found("trashed hymn", original_id))?;

        if hymns.iter().any(|h| h.id == original_id) {
            return Err(LibraryError::AlreadyExists {
                kind: "hymn",
                id: original_id.to_string(),
            });
        }

        let entry = trash.remove(index);
        hymns.push(entry.data.clone());

        save_collection(store, keys::HYMNS, &hymns)?;
        save_collection(store, keys::HYMN_TRASH, &trash)?;

        tracing::info!(id = original_id, "Restored hymn from trash");
        Ok(entry.data)
    }

    pub fn delete_from_trash(&self, original_id: &str) -> LibraryResult<TrashedItem> {
        self.update(keys::HYMN_TRASH, Vec::new, |trash: &mut Vec<TrashedItem>| {
            let index = trash
                .iter()
                .position(|t| t.original_id == original_id)
                .ok_or_else(|| LibraryError::not_found("trashed hymn", original_id))?;
            Ok(trash.remove(index))
        })
    }

    /// Permanently remove trash entries older than `max_age_days`.
    pub fn purge_trash(&self, max_age_days: u32, now: DateTime<Utc>) -> LibraryResult<Vec<TrashedItem>> {
        let cutoff = now - Duration::days(i64::from(max_age_days));
        let purged = self.update(keys::HYMN_TRASH, Vec::new, |trash: &mut Vec<TrashedItem>| {
            let (expired, kept): (Vec<_>, Vec<_>) =
                trash.drain(..).partition(|t| t.trashed_at < cutoff);
            *trash = kept;
            Ok(expired)
        })?;
        if !purged.is_empty() {
            tracing::info!(count = purged.len(), max_age_days, "Purged expired trash");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::test_library;
    use std::collections::HashSet;

    #[test]
    fn test_trash_moves_exactly_the_given_ids() {
        let (_store, library) = test_library();
        let before = library.hymns().unwrap();
        let snapshot: Vec<Hymn> = before.iter().filter(|h| h.id == "2" || h.id == "5").cloned().collect();

        let outcome = library.trash_hymns(&["2", "5", "404"]).unwrap();
        assert_eq!(outcome.trashed, vec!["2", "5"]);
        assert_eq!(outcome.missing, vec!["404"]);

        let active = library.hymns().unwrap();
        let trash = library.trash().unwrap();
        assert_eq!(active.len(), before.len() - 2);

        let active_ids: HashSet<_> = active.iter().map(|h| h.id.clone()).collect();
        let trashed_ids: HashSet<_> = trash.iter().map(|t| t.original_id.clone()).collect();
        assert!(active_ids.is_disjoint(&trashed_ids));
        let expected: HashSet<String> = ["2", "5"].iter().map(|s| s.to_string()).collect();
        assert_eq!(trashed_ids, expected);

        for hymn in snapshot {
            let entry = trash.iter().find(|t| t.original_id == hymn.id).unwrap();
            assert_eq!(entry.data, hymn);
            assert_eq!(entry.item_type, TrashedItemType::Hymn);
        }
    }

    #[test]
    fn test_restore_round_trip() {
        let (_store, library) = test_library();
        library.trash_hymns(&["3"]).unwrap();
        assert!(library.hymn("3").unwrap().is_none());

        let restored = library.restore_hymn("3").unwrap();
        assert_eq!(restored.id, "3");
        assert!(library.hymn("3").unwrap().is_some());
        assert!(library.trash().unwrap().is_empty());
        assert!(library.restore_hymn("3").unwrap_err().is_not_found());
    }

    #[test]
    fn test_restore_refuses_to_overwrite_active_hymn() {
        let (_store, library) = test_library();
        let hymn = library.hymn("3").unwrap().unwrap();
        library.trash_hymns(&["3"]).unwrap();
        library.put_hymn(hymn).unwrap();
        assert!(matches!(
            library.restore_hymn("3"),
            Err(LibraryError::AlreadyExists { .. })
        ));
    }

    #[test]
    fn test_purge_removes_only_expired_entries() {
        let (_store, library) = test_library();
        let now = Utc::now();
        library.trash_hymns_at(&["1"], now - Duration::days(45)).unwrap();
        library.trash_hymns_at(&["2"], now - Duration::days(3)).unwrap();

        let purged = library.purge_trash(30, now).unwrap();
        assert_eq!(purged.len(), 1);
        assert_eq!(purged[0].original_id, "1");
        assert!(purged[0].age_days(now) >= 45);

        let remaining = library.trash().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].original_id, "2");
    }

    #[test]
    fn test_delete_from_trash() {
        let (_store, library) = test_library();
        library.trash_hymns(&["6"]).unwrap();
        library.delete_from_trash("6").unwrap();
        assert!(library.trash().unwrap().is_empty());
        assert!(library.hymn("6").unwrap().is_none());
    }
}
