//! SQLite-backed store.

use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use super::schema::{MIGRATIONS, SCHEMA};
use super::{KeyValueStore, StoreError, StoreResult};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating if needed) the store file and its schema.
    pub fn open(path: &Path) -> StoreResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Backend(e.to_string()))?;
        }
        let conn = Connection::open(path).map_err(|e| StoreError::Backend(e.to_string()))?;
        let store = Self { conn: Mutex::new(conn) };
        store.initialize()?;
        Ok(store)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| StoreError::Backend(e.to_string()))?;
        let store = Self { conn: Mutex::new(conn) };
        store.initialize()?;
        Ok(store)
    }

    fn initialize(&self) -> StoreResult<()> {
        let conn = self.lock()?;
        conn.execute_batch(SCHEMA)
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        apply_migrations(&conn, MIGRATIONS)
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("sqlite connection lock poisoned".to_string()))
    }
}

/// Run each migration in order. They are written to be re-runnable, so any
/// failure is a real one.
fn apply_migrations(conn: &Connection, migrations: &[&str]) -> StoreResult<()> {
    for migration in migrations {
        conn.execute_batch(migration).map_err(|e| {
            tracing::error!(error = %e, migration, "Store migration failed");
            StoreError::Backend(format!("migration failed: {}", e))
        })?;
    }
    Ok(())
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.lock()?
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |row| row.get(0))
            .optional()
            .map_err(|e| StoreError::read(key, e))
    }

    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.lock()?
            .execute(
                r#"
                INSERT INTO kv (key, value, updated_at) VALUES (?, ?, CURRENT_TIMESTAMP)
                ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                "#,
                rusqlite::params![key, value],
            )
            .map_err(|e| StoreError::write(key, e))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        self.lock()?
            .execute("DELETE FROM kv WHERE key = ?", [key])
            .map_err(|e| StoreError::write(key, e))?;
        Ok(())
    }

    fn keys(&self) -> StoreResult<Vec<String>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT key FROM kv ORDER BY key")
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        let keys = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| StoreError::Backend(e.to_string()))?
            .collect::<Result<Vec<String>, _>>()
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("hymnbook.db");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.set("theme", "dark").unwrap();
            store.set("theme", "light").unwrap();
            store.set("note:1:1-1", "  ").unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("light"));
        assert_eq!(store.get("note:1:1-1").unwrap().as_deref(), Some("  "));
        assert_eq!(store.keys().unwrap(), vec!["note:1:1-1", "theme"]);
    }

    #[test]
    fn test_remove() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.set("hymns", "[]").unwrap();
        store.remove("hymns").unwrap();
        store.remove("hymns").unwrap();
        assert_eq!(store.get("hymns").unwrap(), None);
    }

    #[test]
    fn test_migrations_rerun_and_report_failures() {
        let store = SqliteStore::open_in_memory().unwrap();
        let conn = store.lock().unwrap();
        apply_migrations(&conn, MIGRATIONS).unwrap();

        let indexed: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND name = 'idx_kv_updated_at'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(indexed, 1);

        let err = apply_migrations(&conn, &["ALTER TABLE missing ADD COLUMN x TEXT"]).unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
