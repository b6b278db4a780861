//! SQLite implementation of [`HistoryStorage`].
//!
//! Uses rusqlite with bundled SQLite. The connection sits behind a mutex so
//! the storage can be shared between histories of several channels.

use std::path::Path;
use std::sync::{Mutex, PoisonError};

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::migration::{self, now_millis};
use crate::traits::HistoryStorage;

/// SQLite-backed key/value storage.
pub struct SqliteHistoryStorage {
    conn: Mutex<Connection>,
}

impl SqliteHistoryStorage {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Run `f` with the connection locked.
    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().unwrap_or_else(PoisonError::into_inner);
        f(&conn)
    }

    /// All stored keys, sorted.
    pub fn keys(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT key FROM history_items ORDER BY key")?;
            let keys = stmt
                .query_map([], |row| row.get(0))?
                .collect::<rusqlite::Result<Vec<String>>>()?;
            Ok(keys)
        })
    }
}

impl HistoryStorage for SqliteHistoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM history_items WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO history_items (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, value, now_millis()],
            )?;
            Ok(())
        })
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM history_items WHERE key = ?1", params![key])?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let storage = SqliteHistoryStorage::open_memory().unwrap();
        assert_eq!(storage.get_item("a").unwrap(), None);

        storage.set_item("a", "1").unwrap();
        storage.set_item("b", "2").unwrap();
        storage.set_item("a", "3").unwrap();
        assert_eq!(storage.get_item("a").unwrap().as_deref(), Some("3"));
        assert_eq!(storage.keys().unwrap(), vec!["a".to_string(), "b".to_string()]);

        storage.remove_item("a").unwrap();
        storage.remove_item("missing").unwrap();
        assert_eq!(storage.get_item("a").unwrap(), None);
    }

    #[test]
    fn test_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.db");

        {
            let storage = SqliteHistoryStorage::open(&path).unwrap();
            storage.set_item("waku:sds:history:chat", "[]").unwrap();
        }

        let storage = SqliteHistoryStorage::open(&path).unwrap();
        assert_eq!(
            storage.get_item("waku:sds:history:chat").unwrap().as_deref(),
            Some("[]")
        );
    }
}
