//! Local key-value store.
//!
//! Every collection lives under a fixed string key as a JSON array; personal
//! notes and uploaded documents use prefixed keys holding raw text. Backends
//! implement [`KeyValueStore`]: [`MemoryStore`] for tests and
//! [`SqliteStore`] for the binary.

mod memory;
mod schema;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use thiserror::Error;

/// Fixed keys, one per entity collection or setting.
pub mod keys {
    pub const HYMNS: &str = "hymns";
    pub const PROGRAMS: &str = "programs";
    pub const READINGS: &str = "readings";
    pub const HYMN_TRASH: &str = "hymn-trash";
    pub const USER_ACTIVITY: &str = "user-activity";
    pub const CHAT_HISTORY: &str = "chat-history";
    pub const THEME: &str = "theme";
    pub const PRIMARY_COLOR: &str = "primary-color";
    pub const FONT_STYLE: &str = "font-style";
    pub const UPLOADED_FILES: &str = "uploaded-files";

    /// Prefix of per-(program, item) personal notes. Values are raw strings.
    pub const NOTE_PREFIX: &str = "note:";
    /// Prefix of uploaded document bodies. Values are raw strings.
    pub const FILE_PREFIX: &str = "file:";

    pub const FIXED: [&str; 10] = [
        HYMNS,
        PROGRAMS,
        READINGS,
        HYMN_TRASH,
        USER_ACTIVITY,
        CHAT_HISTORY,
        THEME,
        PRIMARY_COLOR,
        FONT_STYLE,
        UPLOADED_FILES,
    ];

    pub fn note(program_id: &str, item_id: &str) -> String {
        format!("{}{}:{}", NOTE_PREFIX, program_id, item_id)
    }

    pub fn file(id: &str) -> String {
        format!("{}{}", FILE_PREFIX, id)
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read '{key}': {message}")]
    Read { key: String, message: String },

    #[error("failed to write '{key}': {message}")]
    Write { key: String, message: String },

    #[error("failed to serialize '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn read(key: &str, err: impl Display) -> Self {
        StoreError::Read {
            key: key.to_string(),
            message: err.to_string(),
        }
    }

    pub fn write(key: &str, err: impl Display) -> Self {
        StoreError::Write {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// String-keyed, string-valued persistent store.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Removing a missing key is not an error.
    fn remove(&self, key: &str) -> StoreResult<()>;

    /// All keys currently present, in ascending order.
    fn keys(&self) -> StoreResult<Vec<String>>;

    fn keys_with_prefix(&self, prefix: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .keys()?
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect())
    }
}

/// Read a collection, falling back to `seed` when the key is absent or
/// unparseable. The seed is persisted in both cases so later reads find it.
pub fn load_collection<T, F>(store: &dyn KeyValueStore, key: &str, seed: F) -> StoreResult<Vec<T>>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Vec<T>,
{
    match store.get(key)? {
        Some(raw) => match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(items) => Ok(items),
            Err(e) => {
                tracing::warn!(key, error = %e, "Stored collection is unparseable, restoring seed data");
                let items = seed();
                save_collection(store, key, &items)?;
                Ok(items)
            }
        },
        None => {
            tracing::debug!(key, "No stored collection, seeding");
            let items = seed();
            save_collection(store, key, &items)?;
            Ok(items)
        }
    }
}

/// Serialize the complete collection back to its key.
pub fn save_collection<T: Serialize>(store: &dyn KeyValueStore, key: &str, items: &[T]) -> StoreResult<()> {
    let raw = serde_json::to_string(items).map_err(|source| StoreError::Serialize {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}

/// Read a single JSON value, `None` when absent or unparseable.
pub fn load_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> StoreResult<Option<T>> {
    match store.get(key)? {
        Some(raw) => match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(key, error = %e, "Stored value is unparseable, ignoring it");
                Ok(None)
            }
        },
        None => Ok(None),
    }
}

pub fn save_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> StoreResult<()> {
    let raw = serde_json::to_string(value).map_err(|source| StoreError::Serialize {
        key: key.to_string(),
        source,
    })?;
    store.set(key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed() -> Vec<String> {
        vec!["a".to_string(), "b".to_string()]
    }

    #[test]
    fn test_missing_key_is_seeded_and_persisted() {
        let store = MemoryStore::new();
        let items: Vec<String> = load_collection(&store, keys::HYMNS, seed).unwrap();
        assert_eq!(items, seed());
        assert_eq!(store.get(keys::HYMNS).unwrap().as_deref(), Some(r#"["a","b"]"#));
    }

    #[test]
    fn test_unparseable_value_falls_back_to_seed() {
        let store = MemoryStore::new();
        store.set(keys::HYMNS, "{not json").unwrap();
        let items: Vec<String> = load_collection(&store, keys::HYMNS, seed).unwrap();
        assert_eq!(items, seed());
        assert_eq!(store.get(keys::HYMNS).unwrap().as_deref(), Some(r#"["a","b"]"#));
    }

    #[test]
    fn test_stored_value_wins_over_seed() {
        let store = MemoryStore::new();
        store.set(keys::HYMNS, r#"["x"]"#).unwrap();
        let items: Vec<String> = load_collection(&store, keys::HYMNS, seed).unwrap();
        assert_eq!(items, vec!["x".to_string()]);
    }

    #[test]
    fn test_write_failure_surfaces() {
        let store = MemoryStore::new();
        store.set_read_only(true);
        let result: StoreResult<Vec<String>> = load_collection(&store, keys::HYMNS, seed);
        assert!(matches!(result, Err(StoreError::Write { .. })));
    }

    #[test]
    fn test_keys_with_prefix() {
        let store = MemoryStore::new();
        store.set(&keys::note("100", "100-1"), "hello").unwrap();
        store.set(&keys::file("abc"), "text").unwrap();
        store.set(keys::THEME, "dark").unwrap();
        assert_eq!(store.keys_with_prefix(keys::NOTE_PREFIX).unwrap(), vec!["note:100:100-1"]);
    }
}
