//! Storage error definitions.

use thiserror::Error;

/// Failures of the durable layer. Every variant means "nothing was changed":
/// open transactions are rolled back before the error is returned.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An error originating from the underlying SQLite database.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Creating the database directory failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A soul id that should exist could not be found.
    #[error("soul {0} not found")]
    SoulNotFound(i64),

    /// Insert lost a duplicate-key race but the winning row is not visible.
    #[error("soul for client key '{0}' could not be resolved after duplicate insert")]
    Unresolved(String),

    #[error("database connection mutex poisoned")]
    Poisoned,

    #[error("blocking storage task failed: {0}")]
    Join(String),

    /// The caller went away before commit; the transaction was rolled back.
    #[error("request cancelled before commit")]
    Cancelled,
}

/// Outcome of a rejected ownership transfer.
#[derive(Debug, Error)]
pub enum ClaimError {
    /// The soul has already painted its full quota.
    #[error("already painted maximum of {quota} pixels")]
    QuotaExceeded { quota: u32 },

    /// The coordinate was never registered.
    #[error("pixel ({x}, {y}) does not exist")]
    UnknownCell { x: i64, y: i64 },

    /// No pixels have been registered at all.
    #[error("pixel field is not initialized")]
    NotInitialized,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<rusqlite::Error> for ClaimError {
    fn from(err: rusqlite::Error) -> Self {
        ClaimError::Store(StoreError::Sqlite(err))
    }
}
