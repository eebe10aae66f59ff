//! Error types for tget-cache

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in trust cache operations
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open the underlying storage engine
    #[error("open store {path}: {source}")]
    Open {
        /// Path of the store file
        path: PathBuf,
        /// Underlying engine error
        source: tget_store::Error,
    },

    /// A config-namespace read or write failed
    #[error("config {name}: {source}")]
    Config {
        /// Config record name (without the namespace prefix)
        name: String,
        /// Underlying engine error
        source: tget_store::Error,
    },

    /// A file-namespace read or write failed
    #[error("cached file {path}: {source}")]
    Cache {
        /// Cache record path (without the namespace prefix)
        path: String,
        /// Underlying engine error
        source: tget_store::Error,
    },

    /// The log server answered with a non-success status
    #[error("remote {url}: status {status}")]
    RemoteStatus {
        /// The URL that was fetched
        url: String,
        /// The non-success HTTP status
        status: reqwest::StatusCode,
    },

    /// The log server could not be reached
    #[error("remote {url}: {source}")]
    Remote {
        /// The URL that was fetched
        url: String,
        /// Underlying transport error
        source: reqwest::Error,
    },
}

impl Error {
    fn store_error(&self) -> Option<&tget_store::Error> {
        match self {
            Error::Open { source, .. }
            | Error::Config { source, .. }
            | Error::Cache { source, .. } => Some(source),
            _ => None,
        }
    }

    /// True if the underlying storage reported a never-written key
    pub fn is_not_found(&self) -> bool {
        self.store_error().is_some_and(|e| e.is_not_found())
    }

    /// True if a conditional config write observed a concurrent mutation
    pub fn is_write_conflict(&self) -> bool {
        self.store_error().is_some_and(|e| e.is_write_conflict())
    }
}

/// Result type for trust cache operations
pub type Result<T> = std::result::Result<T, Error>;
