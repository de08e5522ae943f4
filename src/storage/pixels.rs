//! Pixel table: one-shot bulk initialization and the paint transaction.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rusqlite::{params, Connection, TransactionBehavior};
use tracing::{debug, instrument};

use crate::grid::{Color, Pixel, PixelPosition};
use crate::storage::{ClaimError, Database, StoreError};

pub(crate) fn is_initialized(conn: &Connection) -> Result<bool, StoreError> {
    let exists = conn.query_row("SELECT EXISTS(SELECT 1 FROM pixels)", [], |row| row.get(0))?;
    Ok(exists)
}

pub(crate) fn initialize(
    conn: &mut Connection,
    cells: &[PixelPosition],
    owner: i64,
    color: Color,
) -> Result<usize, StoreError> {
    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare_cached(
            "INSERT OR REPLACE INTO pixels (x, y, soul_id, color) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for cell in cells {
            stmt.execute(params![cell.x, cell.y, owner, color])?;
        }
    }
    tx.commit()?;
    Ok(cells.len())
}

/// Charge one unit of `quota` to `soul_id` and hand it the cell at `(x, y)`.
///
/// The quota check is the `WHERE` clause of the counter update, so two
/// concurrent claims by the same soul cannot both pass it. Any early return
/// drops the transaction, which rolls back the counter update. Nothing is
/// committed once `cancelled` is set.
pub(crate) fn claim(
    conn: &mut Connection,
    soul_id: i64,
    position: PixelPosition,
    color: Color,
    quota: u32,
    cancelled: &AtomicBool,
) -> Result<(), ClaimError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let charged = tx.execute(
        "UPDATE souls SET painted_pixels = painted_pixels + 1 WHERE id = ?1 AND painted_pixels < ?2",
        params![soul_id, quota],
    )?;
    if charged == 0 {
        let exists: bool = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM souls WHERE id = ?1)",
            params![soul_id],
            |row| row.get(0),
        )?;
        return Err(if exists {
            ClaimError::QuotaExceeded { quota }
        } else {
            StoreError::SoulNotFound(soul_id).into()
        });
    }

    let painted = tx.execute(
        "UPDATE pixels SET soul_id = ?1, color = ?2 WHERE x = ?3 AND y = ?4",
        params![soul_id, color, position.x, position.y],
    )?;
    if painted == 0 {
        return Err(if is_initialized(&tx)? {
            ClaimError::UnknownCell {
                x: position.x,
                y: position.y,
            }
        } else {
            ClaimError::NotInitialized
        });
    }

    if cancelled.load(Ordering::Acquire) {
        return Err(StoreError::Cancelled.into());
    }
    tx.commit()?;
    Ok(())
}

/// Sets the flag when dropped, including when the owning future is dropped
/// mid-await.
struct CancelOnDrop(Arc<AtomicBool>);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

pub(crate) fn list_pixels(conn: &Connection) -> Result<Vec<Pixel>, StoreError> {
    let mut stmt = conn.prepare_cached("SELECT x, y, color, soul_id FROM pixels ORDER BY y, x")?;
    let rows = stmt.query_map([], |row| {
        Ok(Pixel {
            x: row.get(0)?,
            y: row.get(1)?,
            color: row.get(2)?,
            soul_id: row.get(3)?,
        })
    })?;
    let mut pixels = Vec::new();
    for row in rows {
        pixels.push(row?);
    }
    Ok(pixels)
}

impl Database {
    /// Cheap probe for whether any pixel has been registered.
    pub async fn is_initialized(&self) -> Result<bool, StoreError> {
        self.call(|conn| is_initialized(conn)).await
    }

    /// Insert every cell owned by `owner` in `color`, replacing duplicates.
    ///
    /// Does not guard against concurrent initialization; callers must check
    /// [`Database::is_initialized`] under their own lock.
    #[instrument(skip(self, cells), fields(cells = cells.len()))]
    pub async fn initialize_grid(
        &self,
        cells: Vec<PixelPosition>,
        owner: i64,
        color: Color,
    ) -> Result<usize, StoreError> {
        let inserted = self
            .call(move |conn| initialize(conn, &cells, owner, color))
            .await?;
        debug!(inserted, "Pixel field initialized");
        Ok(inserted)
    }

    /// Atomically charge quota and transfer ownership of one cell.
    ///
    /// Dropping the returned future before the blocking work commits rolls
    /// the claim back.
    pub async fn claim_pixel(
        &self,
        soul_id: i64,
        position: PixelPosition,
        color: Color,
        quota: u32,
    ) -> Result<(), ClaimError> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let _guard = CancelOnDrop(Arc::clone(&cancelled));
        self.call(move |conn| claim(conn, soul_id, position, color, quota, &cancelled))
            .await
    }

    /// Every cell, row-major.
    pub async fn pixels(&self) -> Result<Vec<Pixel>, StoreError> {
        self.call(|conn| list_pixels(conn)).await
    }
}
