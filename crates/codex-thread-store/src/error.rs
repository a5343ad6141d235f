//! Error types for the thread store.

use thiserror::Error;

/// Thread store error type.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing table does not exist yet.
    ///
    /// Distinguished from other failures because it is expected during very
    /// early process startup, before migrations have run; callers treat it
    /// as transient and retry.
    #[error("codex_threads table does not exist yet")]
    MissingTable,

    /// Any other SQLite failure.
    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),

    /// A non-SQLite backend failure.
    #[error("Thread store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        if is_missing_table(&err) {
            StoreError::MissingTable
        } else {
            StoreError::Sqlite(err)
        }
    }
}

fn is_missing_table(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => message.contains("no such table"),
        _ => false,
    }
}

/// Result type for thread store operations.
pub type StoreResult<T> = Result<T, StoreError>;
