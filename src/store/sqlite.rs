use super::{check_request, Store};
use crate::{error::StoreError, model::StoredReport, util::now_rfc3339};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::debug;

/// SQLite-backed key-value table: one row per id, the item kept as a JSON document.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    fn ensure_table(&self, table: &str) -> Result<(), StoreError> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{table}\" (
                id         TEXT PRIMARY KEY,
                item       TEXT NOT NULL,
                written_at TEXT NOT NULL
            );"
        ))?;
        Ok(())
    }

    pub fn count(&self, table: &str) -> Result<usize, StoreError> {
        check_request(table, &[])?;
        self.ensure_table(table)?;
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |r| r.get(0))?;
        Ok(n as usize)
    }

    pub fn get(&self, table: &str, id: &str) -> Result<Option<StoredReport>, StoreError> {
        check_request(table, &[])?;
        self.ensure_table(table)?;
        let raw: Option<String> = self
            .conn
            .query_row(
                &format!("SELECT item FROM \"{table}\" WHERE id = ?1"),
                params![id],
                |r| r.get(0),
            )
            .optional()?;
        match raw {
            Some(s) => Ok(Some(serde_json::from_str(&s)?)),
            None => Ok(None),
        }
    }
}

impl Store for SqliteStore {
    fn batch_upsert(&self, table: &str, items: &[StoredReport]) -> Result<(), StoreError> {
        check_request(table, items)?;
        self.ensure_table(table)?;

        let written_at = now_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO \"{table}\" (id, item, written_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET item = excluded.item, written_at = excluded.written_at"
            ))?;
            for item in items {
                let doc = serde_json::to_string(item)?;
                stmt.execute(params![item.id, doc, written_at])?;
            }
        }
        tx.commit()?;

        debug!(table, items = items.len(), "sqlite batch committed");
        Ok(())
    }
}
