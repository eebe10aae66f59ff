//! Error types for tget-store

use thiserror::Error;

/// Errors that can occur in storage engine operations
#[derive(Error, Debug)]
pub enum Error {
    /// The key has never been written
    #[error("key not found: {0}")]
    NotFound(String),

    /// A conditional write found a value other than the expected one.
    /// The write was not applied.
    #[error("write conflict on {0}")]
    WriteConflict(String),

    /// sled backend error
    #[error(transparent)]
    Sled(#[from] sled::Error),

    /// redb backend error
    #[error(transparent)]
    Redb(#[from] redb::Error),

    /// SQLite backend error
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    /// I/O error
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True if this is the benign "key has never been written" case
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// True if a compare-and-swap precondition failed
    pub fn is_write_conflict(&self) -> bool {
        matches!(self, Error::WriteConflict(_))
    }
}

/// Result type for storage engine operations
pub type Result<T> = std::result::Result<T, Error>;
