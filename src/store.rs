use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;
use tracing::debug;

const DB_FILE: &str = "payscope.db";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not create data directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("local storage error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Small persistent key-value store, the local equivalent of browser
/// storage.
pub struct KeyValueStore {
    conn: Connection,
    path: Option<PathBuf>,
}

impl KeyValueStore {
    /// Opens (creating if needed) the store under `dir`.
    pub fn open(dir: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
        let path = dir.join(DB_FILE);
        let conn = Connection::open(&path)?;
        let store = Self {
            conn,
            path: Some(path),
        };
        store.init()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        let store = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        store.init()?;
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Platform data directory, falling back to the working directory.
    pub fn default_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "payscope")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
            params![key, value],
        )?;
        debug!(key, "stored value");
        Ok(())
    }

    /// Removes `key`; returns whether it was present.
    pub fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let removed = self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = KeyValueStore::open_in_memory().unwrap();
        assert_eq!(store.get("token").unwrap(), None);

        store.set("token", "abc").unwrap();
        assert_eq!(store.get("token").unwrap().as_deref(), Some("abc"));

        store.set("token", "def").unwrap();
        assert_eq!(store.get("token").unwrap().as_deref(), Some("def"));

        assert!(store.remove("token").unwrap());
        assert!(!store.remove("token").unwrap());
        assert_eq!(store.get("token").unwrap(), None);
    }

    #[test]
    fn test_values_persist_across_opens() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data");
        {
            let store = KeyValueStore::open(&nested).unwrap();
            store.set("token", "persisted").unwrap();
            assert_eq!(store.path(), Some(nested.join("payscope.db").as_path()));
        }
        let reopened = KeyValueStore::open(&nested).unwrap();
        assert_eq!(reopened.get("token").unwrap().as_deref(), Some("persisted"));
    }
}
