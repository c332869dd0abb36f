//! SQLite storage backend: a single flat table keyed on path, with WAL
//! journal mode and a `PRAGMA user_version` schema guard on open.

use super::Storage;
use crate::error::{FileMetaError, Result};
use crate::model::MetadataRecord;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

const SCHEMA_VERSION: i64 = 1;

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path)
            .map_err(|e| FileMetaError::Storage(format!("opening database: {e}")))?;
        conn.pragma_update(None, "journal_mode", "wal")
            .map_err(|e| FileMetaError::Storage(e.to_string()))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .map_err(|e| FileMetaError::Storage(e.to_string()))?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// In-memory SQLite database, useful in tests that want the real
    /// backend without a temp directory.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| FileMetaError::Storage(e.to_string()))?;
        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        let user_version: i64 = self
            .conn
            .query_row("SELECT user_version FROM pragma_user_version", [], |row| row.get(0))
            .map_err(|e| FileMetaError::Storage(e.to_string()))?;

        match user_version {
            0 => {
                self.conn
                    .execute_batch(&format!(
                        "BEGIN;
                         CREATE TABLE IF NOT EXISTS metadata (
                             path TEXT PRIMARY KEY,
                             data TEXT NOT NULL
                         );
                         PRAGMA user_version = {SCHEMA_VERSION};
                         COMMIT;"
                    ))
                    .map_err(|e| FileMetaError::Storage(format!("creating schema: {e}")))?;
                Ok(())
            }
            v if v == SCHEMA_VERSION => Ok(()),
            v => Err(FileMetaError::Storage(format!(
                "unsupported schema version {v}, expected {SCHEMA_VERSION}"
            ))),
        }
    }
}

impl Storage for SqliteStore {
    fn save(&mut self, path: &str, record: &MetadataRecord) -> Result<()> {
        let data = serde_json::to_string(record).map_err(|e| FileMetaError::Storage(e.to_string()))?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO metadata (path, data) VALUES (?1, ?2)",
                params![path, data],
            )
            .map_err(|e| FileMetaError::Storage(e.to_string()))?;
        Ok(())
    }

    fn load(&self, path: &str) -> Result<Option<MetadataRecord>> {
        let data: Option<String> = self
            .conn
            .query_row("SELECT data FROM metadata WHERE path = ?1", params![path], |row| row.get(0))
            .optional()
            .map_err(|e| FileMetaError::Storage(e.to_string()))?;

        data.map(|json| serde_json::from_str(&json).map_err(|e| FileMetaError::Storage(e.to_string())))
            .transpose()
    }

    fn delete(&mut self, path: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM metadata WHERE path = ?1", params![path])
            .map_err(|e| FileMetaError::Storage(e.to_string()))?;
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<(String, MetadataRecord)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT path, data FROM metadata")
            .map_err(|e| FileMetaError::Storage(e.to_string()))?;

        let rows = stmt
            .query_map([], |row| {
                let path: String = row.get(0)?;
                let data: String = row.get(1)?;
                Ok((path, data))
            })
            .map_err(|e| FileMetaError::Storage(e.to_string()))?;

        let mut out = Vec::new();
        for row in rows {
            let (path, data) = row.map_err(|e| FileMetaError::Storage(e.to_string()))?;
            let record = serde_json::from_str(&data).map_err(|e| FileMetaError::Storage(e.to_string()))?;
            out.push((path, record));
        }
        Ok(out)
    }
}
