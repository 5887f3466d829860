//! The authoritative repository over the local store.
//!
//! One `Library` is shared by every consumer. Each mutation reloads the
//! latest stored snapshot, applies the change and writes the whole collection
//! back while holding a single write lock, so no writer works from a stale
//! copy.

mod hymns;
mod programs;
mod readings;
mod trash;

pub use trash::{TrashOutcome, TrashedItem, TrashedItemType};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

use crate::store::{load_collection, save_collection, KeyValueStore, StoreError};

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{kind} '{id}' not found")]
    NotFound { kind: &'static str, id: String },

    #[error("{kind} '{id}' already exists")]
    AlreadyExists { kind: &'static str, id: String },

    #[error("invalid {kind}: {reason}")]
    Invalid { kind: &'static str, reason: String },
}

impl LibraryError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        LibraryError::NotFound { kind, id: id.into() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, LibraryError::NotFound { .. })
    }
}

pub type LibraryResult<T> = std::result::Result<T, LibraryError>;

pub struct Library {
    store: Arc<dyn KeyValueStore>,
    write_lock: Mutex<()>,
}

impl Library {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
        }
    }

    /// The underlying store, shared with notes, activity and settings.
    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }

    fn lock(&self) -> LibraryResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Backend("library write lock poisoned".to_string()).into())
    }

    fn load<T, F>(&self, key: &str, seed: F) -> LibraryResult<Vec<T>>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Vec<T>,
    {
        Ok(load_collection(self.store.as_ref(), key, seed)?)
    }

    /// Read-modify-write of one collection. Nothing is written when `f` fails.
    fn update<T, F, S, R>(&self, key: &str, seed: S, f: F) -> LibraryResult<R>
    where
        T: Serialize + DeserializeOwned,
        S: FnOnce() -> Vec<T>,
        F: FnOnce(&mut Vec<T>) -> LibraryResult<R>,
    {
        let _guard = self.lock()?;
        let mut items = self.load(key, seed)?;
        let result = f(&mut items)?;
        save_collection(self.store.as_ref(), key, &items)?;
        Ok(result)
    }
}

/// Replace the record with the same id, or append it when none matches.
fn upsert<T, K>(items: &mut Vec<T>, record: T, key: K) -> bool
where
    K: Fn(&T) -> &str,
{
    let id = key(&record).to_string();
    match items.iter().position(|item| key(item) == id) {
        Some(index) => {
            items[index] = record;
            true
        }
        None => {
            items.push(record);
            false
        }
    }
}

/// Next numeric id past the largest numeric id in use.
fn next_numeric_id<'a>(ids: impl Iterator<Item = &'a str>) -> String {
    let max = ids.filter_map(|id| id.parse::<u64>().ok()).max().unwrap_or(0);
    (max + 1).to_string()
}

#[cfg(test)]
pub(crate) fn test_library() -> (Arc<crate::store::MemoryStore>, Library) {
    let store = Arc::new(crate::store::MemoryStore::new());
    let library = Library::new(store.clone());
    (store, library)
}
