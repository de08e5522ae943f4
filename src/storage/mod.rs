//! Durable storage subsystem.
//!
//! # Data Flow
//! ```text
//! async handler / middleware
//!     → Database::call (spawn_blocking)
//!     → Mutex<rusqlite::Connection>
//!     → souls.rs  (get-or-create, quota counter, listing)
//!     → pixels.rs (bulk init, claim transaction, listing)
//! ```
//!
//! # Design Decisions
//! - One SQLite connection behind a std mutex; SQLite is single-writer anyway
//! - Blocking work never runs on the async workers
//! - Multi-statement writes run in one transaction; dropping it rolls back
//! - A claim whose caller is dropped before commit rolls back

pub mod error;
pub mod pixels;
pub mod souls;

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, instrument};

pub use error::{ClaimError, StoreError};
pub use souls::InsertOutcome;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS souls (
        id INTEGER PRIMARY KEY,
        address TEXT NOT NULL UNIQUE,
        seed TEXT NOT NULL,
        painted_pixels INTEGER NOT NULL DEFAULT 0
    );
    CREATE TABLE IF NOT EXISTS pixels (
        soul_id INTEGER NOT NULL REFERENCES souls(id),
        color INTEGER NOT NULL,
        x INTEGER NOT NULL CHECK (x >= 0),
        y INTEGER NOT NULL CHECK (y >= 0),
        PRIMARY KEY (x, y)
    );
";

/// Shared handle to the SQLite database. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Opens (or creates) the database file, creating parent directories.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;",
        )?;
        let db = Self::prepare(conn)?;
        debug!("Opened database");
        Ok(db)
    }

    /// Opens an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run `f` against the connection on the blocking pool.
    pub(crate) async fn call<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: FnOnce(&mut Connection) -> Result<R, E> + Send + 'static,
        R: Send + 'static,
        E: From<StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&mut guard)
        })
        .await
        .map_err(|err| StoreError::Join(err.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_open_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("grid.db");

        let db = Database::open(&path).unwrap();
        assert!(path.exists());

        let tables: i64 = db
            .call(|conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('souls', 'pixels')",
                    [],
                    |row| row.get(0),
                )
                .map_err(StoreError::from)
            })
            .await
            .unwrap();
        assert_eq!(tables, 2);
    }

    #[tokio::test]
    async fn test_reopen_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.db");

        let id = Database::open(&path).unwrap().assign_soul("192.0.2.10").await.unwrap();
        let again = Database::open(&path).unwrap().assign_soul("192.0.2.10").await.unwrap();
        assert_eq!(id, again);
    }
}
