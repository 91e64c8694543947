//! Persistence error taxonomy.

use thiserror::Error;

/// Errors surfaced by the persistence layer. Fatal for the current run.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The database stayed locked past the 5-second busy timeout.
    #[error("Database busy: {0}")]
    Busy(String),

    /// A foreign-key constraint was violated.
    #[error("Foreign key violation: {0}")]
    FkViolation(String),

    /// The on-disk schema version does not match this build.
    #[error("Schema mismatch: expected {expected}, found {found}")]
    SchemaMismatch { expected: String, found: String },

    /// Any other SQLite failure.
    #[error("Database error: {0}")]
    Sqlite(String),

    /// Filesystem failure around the database file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored JSON could not be decoded.
    #[error("Corrupt stored data: {0}")]
    CorruptData(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, message) => {
                let text = message.clone().unwrap_or_else(|| code.to_string());
                match code.code {
                    rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked => {
                        StoreError::Busy(text)
                    }
                    rusqlite::ErrorCode::ConstraintViolation => StoreError::FkViolation(text),
                    _ => StoreError::Sqlite(text),
                }
            }
            _ => StoreError::Sqlite(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::CorruptData(err.to_string())
    }
}

/// Result alias for persistence operations.
pub type StoreResult<T> = Result<T, StoreError>;
