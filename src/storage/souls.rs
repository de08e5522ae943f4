//! Soul table: get-or-create by client key, reads and listing.

use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::observability::metrics;
use crate::souls::Soul;
use crate::storage::{Database, StoreError};

/// Result of inserting a soul under a unique client key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Created(i64),
    /// Another writer inserted the same key first.
    AlreadyExists,
}

pub(crate) fn find_soul_id(conn: &Connection, address: &str) -> Result<Option<i64>, StoreError> {
    let id = conn
        .query_row(
            "SELECT id FROM souls WHERE address = ?1",
            params![address],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

pub(crate) fn insert_soul(
    conn: &Connection,
    address: &str,
    seed: &str,
) -> Result<InsertOutcome, StoreError> {
    match conn.execute(
        "INSERT INTO souls (address, seed) VALUES (?1, ?2)",
        params![address, seed],
    ) {
        Ok(_) => Ok(InsertOutcome::Created(conn.last_insert_rowid())),
        Err(rusqlite::Error::SqliteFailure(err, _)) if err.code == ErrorCode::ConstraintViolation => {
            Ok(InsertOutcome::AlreadyExists)
        }
        Err(err) => Err(err.into()),
    }
}

fn map_soul(row: &rusqlite::Row<'_>) -> rusqlite::Result<Soul> {
    Ok(Soul {
        id: row.get(0)?,
        address: row.get(1)?,
        seed: row.get(2)?,
        painted_pixels: row.get(3)?,
    })
}

pub(crate) fn get_soul(conn: &Connection, id: i64) -> Result<Option<Soul>, StoreError> {
    let soul = conn
        .query_row(
            "SELECT id, address, seed, painted_pixels FROM souls WHERE id = ?1",
            params![id],
            map_soul,
        )
        .optional()?;
    Ok(soul)
}

pub(crate) fn list_souls(conn: &Connection, limit: u32, offset: u64) -> Result<Vec<Soul>, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, address, seed, painted_pixels FROM souls ORDER BY id LIMIT ?1 OFFSET ?2",
    )?;
    let offset = i64::try_from(offset).unwrap_or(i64::MAX);
    let rows = stmt.query_map(params![limit, offset], map_soul)?;
    let mut souls = Vec::new();
    for row in rows {
        souls.push(row?);
    }
    Ok(souls)
}

impl Database {
    /// Return the soul id for `address`, creating the soul on first contact.
    ///
    /// Lookup and insert take the connection separately, so two first
    /// requests from one address can both miss the lookup. The unique
    /// constraint rejects the second insert and that caller re-reads the
    /// winner's row instead of failing.
    #[instrument(skip_all, fields(client = %address))]
    pub async fn assign_soul(&self, address: &str) -> Result<i64, StoreError> {
        let key = address.to_string();
        if let Some(id) = self.call(move |conn| find_soul_id(conn, &key)).await? {
            return Ok(id);
        }

        let key = address.to_string();
        let seed = Uuid::now_v7().to_string();
        let outcome = self.call(move |conn| insert_soul(conn, &key, &seed)).await?;

        match outcome {
            InsertOutcome::Created(id) => {
                debug!(soul_id = id, "Soul created");
                metrics::record_soul_created();
                Ok(id)
            }
            InsertOutcome::AlreadyExists => {
                debug!("Lost soul creation race, re-reading");
                let key = address.to_string();
                self.call(move |conn| find_soul_id(conn, &key))
                    .await?
                    .ok_or_else(|| StoreError::Unresolved(address.to_string()))
            }
        }
    }

    pub async fn soul(&self, id: i64) -> Result<Option<Soul>, StoreError> {
        self.call(move |conn| get_soul(conn, id)).await
    }

    /// One page of souls ordered by creation.
    pub async fn souls_page(&self, limit: u32, offset: u64) -> Result<Vec<Soul>, StoreError> {
        self.call(move |conn| list_souls(conn, limit, offset)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_duplicate_insert_reports_already_exists() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE souls (id INTEGER PRIMARY KEY, address TEXT NOT NULL UNIQUE, seed TEXT NOT NULL, painted_pixels INTEGER NOT NULL DEFAULT 0);",
        )
        .unwrap();

        let first = insert_soul(&conn, "203.0.113.7", "seed-a").unwrap();
        assert!(matches!(first, InsertOutcome::Created(_)));
        assert_eq!(
            insert_soul(&conn, "203.0.113.7", "seed-b").unwrap(),
            InsertOutcome::AlreadyExists
        );

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM souls", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_assign_is_stable_per_address() {
        let db = Database::open_in_memory().unwrap();
        let a = db.assign_soul("198.51.100.1").await.unwrap();
        let b = db.assign_soul("198.51.100.2").await.unwrap();
        assert_ne!(a, b);
        assert_eq!(db.assign_soul("198.51.100.1").await.unwrap(), a);

        let soul = db.soul(a).await.unwrap().unwrap();
        assert_eq!(soul.address, "198.51.100.1");
        assert_eq!(soul.painted_pixels, 0);
        assert_eq!(Uuid::parse_str(&soul.seed).unwrap().get_version_num(), 7);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_contact_creates_one_soul() {
        let db = Database::open_in_memory().unwrap();

        let mut handles = Vec::new();
        for _ in 0..32 {
            let db = db.clone();
            handles.push(tokio::spawn(async move { db.assign_soul("203.0.113.50").await }));
        }

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap().unwrap());
        }
        assert_eq!(ids.len(), 1);

        let souls = db.souls_page(100, 0).await.unwrap();
        assert_eq!(souls.len(), 1);
    }

    #[tokio::test]
    async fn test_souls_page_offsets() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..5 {
            db.assign_soul(&format!("192.0.2.{i}")).await.unwrap();
        }

        let first = db.souls_page(2, 0).await.unwrap();
        let last = db.souls_page(2, 4).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].address, "192.0.2.0");
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].address, "192.0.2.4");
    }

    #[tokio::test]
    async fn test_missing_soul_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.soul(42).await.unwrap().is_none());
    }
}
