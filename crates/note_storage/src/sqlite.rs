use std::path::Path;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;

use crate::migrations::MIGRATIONS;
use crate::{KeyValueStorage, Result};

/// Durable medium backed by a single SQLite table.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path`. `":memory:"` gives a
    /// throwaway database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path != Path::new(":memory:") {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        for sql in MIGRATIONS {
            conn.execute(sql, [])?;
        }
        debug!(path = %path.display(), "opened sqlite storage");

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn keys(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key FROM kv_entries ORDER BY key")?;
        let mut rows = stmt.query([])?;
        let mut output = Vec::new();
        while let Some(row) = rows.next()? {
            output.push(row.get(0)?);
        }
        Ok(output)
    }
}

impl KeyValueStorage for SqliteStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let conn = self.conn.lock();
        let value = conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn roundtrip_in_memory() {
        let storage = SqliteStorage::open(":memory:").expect("open");
        storage.set("notes_app_data", "{}").expect("set");
        storage.set("notes_app_data", r#"{"notes":[]}"#).expect("upsert");
        assert_eq!(
            storage.get("notes_app_data").expect("get").as_deref(),
            Some(r#"{"notes":[]}"#)
        );
        assert_eq!(storage.keys().expect("keys"), vec!["notes_app_data"]);

        storage.remove("notes_app_data").expect("remove");
        assert!(storage.get("notes_app_data").expect("get").is_none());
    }

    #[test]
    fn values_survive_reopen() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("notes.db");

        let storage = SqliteStorage::open(&path).expect("open");
        storage.set("k", "persisted").expect("set");
        drop(storage);

        let reopened = SqliteStorage::open(&path).expect("reopen");
        assert_eq!(reopened.get("k").expect("get").as_deref(), Some("persisted"));
    }
}
