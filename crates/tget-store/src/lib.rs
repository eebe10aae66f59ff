//! Pluggable storage engines for the tget trust cache
//!
//! This crate provides a byte-string key-value store contract with three
//! interchangeable backends:
//!
//! - [`SledStore`]: transactional embedded store
//! - [`RedbStore`]: B-tree table store in a single file
//! - [`SqliteStore`]: relational-table store
//!
//! All three satisfy the same read/write/compare-and-swap contract and are
//! selected at construction time via [`EngineKind`]. The store is opened
//! exclusively per call by its owner, so the engines only need to make the
//! read-compare-write sequence of [`StorageEngine::compare_and_swap`]
//! indivisible with respect to other writers on the same key.
//!
//! # Example
//!
//! ```no_run
//! use tget_store::{open, EngineKind};
//!
//! # fn example() -> tget_store::Result<()> {
//! let mut store = open(EngineKind::Sled, "/tmp/my-cache.sled".as_ref())?;
//! store.put("config:key", b"verifier-key")?;
//! let value = store.get("config:key")?;
//! store.compare_and_swap("config:key", &value, b"rotated")?;
//! # Ok(())
//! # }
//! ```

mod error;
mod redb_store;
mod sled_store;
mod sqlite_store;

pub use error::{Error, Result};
pub use redb_store::RedbStore;
pub use sled_store::SledStore;
pub use sqlite_store::SqliteStore;

use std::path::Path;
use std::str::FromStr;

/// A durable, exclusive-access byte-string key-value store
///
/// Implementations must make `put` durable on return and must execute
/// `compare_and_swap` atomically: the current value is read, compared
/// byte-for-byte against the expected value, and replaced only on a match,
/// all within one transaction.
pub trait StorageEngine {
    /// Read the value stored at `key`
    ///
    /// Fails with [`Error::NotFound`] when the key has never been written.
    fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Unconditionally create or overwrite the value at `key`
    fn put(&mut self, key: &str, value: &[u8]) -> Result<()>;

    /// Replace the value at `key` only if it is byte-identical to `expected`
    ///
    /// Any mismatch aborts the transaction and fails with
    /// [`Error::WriteConflict`]; nothing is applied. A missing key fails
    /// with [`Error::NotFound`] rather than treating absence as a valid
    /// "old" value.
    fn compare_and_swap(&mut self, key: &str, expected: &[u8], value: &[u8]) -> Result<()>;
}

/// The available storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineKind {
    /// Transactional embedded store ([`SledStore`])
    Sled,
    /// B-tree table store ([`RedbStore`])
    Redb,
    /// Relational-table store ([`SqliteStore`])
    Sqlite,
}

impl EngineKind {
    /// The configuration name of this backend
    pub fn as_str(&self) -> &'static str {
        match self {
            EngineKind::Sled => "sled",
            EngineKind::Redb => "redb",
            EngineKind::Sqlite => "sqlite",
        }
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "sled" => Ok(EngineKind::Sled),
            "redb" => Ok(EngineKind::Redb),
            "sqlite" => Ok(EngineKind::Sqlite),
            other => Err(format!(
                "unknown storage engine {:?} (expected sled, redb or sqlite)",
                other
            )),
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Open the storage engine of the given kind at `path`
///
/// The file (or directory, for sled) is created if it does not exist.
pub fn open(kind: EngineKind, path: &Path) -> Result<Box<dyn StorageEngine>> {
    match kind {
        EngineKind::Sled => Ok(Box::new(SledStore::open(path)?)),
        EngineKind::Redb => Ok(Box::new(RedbStore::open(path)?)),
        EngineKind::Sqlite => Ok(Box::new(SqliteStore::open(path)?)),
    }
}
