//! Record of feed items that have already been announced.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use thiserror::Error;

/// Errors from the dedup ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Database(String),
}

impl From<rusqlite::Error> for LedgerError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Database(e.to_string())
    }
}

/// Existence check and insert keyed by feed item id.
pub trait DedupLedger: Send + Sync {
    /// Whether the item has already been announced.
    fn exists(&self, item_id: &str) -> Result<bool, LedgerError>;

    /// Record the item as announced. Marking twice is not an error.
    fn mark_processed(&self, item_id: &str) -> Result<(), LedgerError>;
}

/// SQLite-backed ledger.
pub struct SqliteLedger {
    conn: Mutex<Connection>,
}

impl SqliteLedger {
    /// Open or create the database file and its table.
    pub fn new(path: &Path) -> Result<Self, LedgerError> {
        let conn = Connection::open(path)?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory ledger (useful for testing).
    pub fn in_memory() -> Result<Self, LedgerError> {
        let conn = Connection::open_in_memory()?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), LedgerError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS processed_posts (
                post_id TEXT PRIMARY KEY,
                processed_at TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, LedgerError> {
        self.conn
            .lock()
            .map_err(|_| LedgerError::Database("connection lock poisoned".to_string()))
    }

    /// Number of recorded items.
    pub fn count(&self) -> Result<u64, LedgerError> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM processed_posts", [], |row| {
            row.get(0)
        })?;
        Ok(count as u64)
    }
}

impl DedupLedger for SqliteLedger {
    fn exists(&self, item_id: &str) -> Result<bool, LedgerError> {
        let conn = self.lock()?;
        let found = conn
            .query_row(
                "SELECT 1 FROM processed_posts WHERE post_id = ?",
                params![item_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn mark_processed(&self, item_id: &str) -> Result<(), LedgerError> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR IGNORE INTO processed_posts (post_id, processed_at) VALUES (?, ?)",
            params![item_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }
}
