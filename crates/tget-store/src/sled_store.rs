//! Transactional embedded store backed by sled

use std::path::Path;

use crate::{Error, Result, StorageEngine};

/// Storage engine backed by a [sled](https://docs.rs/sled) database
///
/// sled keeps its data in a directory and provides an atomic
/// compare-and-swap primitive directly, which this adapter maps onto the
/// [`StorageEngine`] contract. Writes are flushed before returning so that
/// durability holds across per-call open/close cycles.
pub struct SledStore {
    db: sled::Db,
}

impl SledStore {
    /// Open (or create) a sled database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            db: sled::open(path)?,
        })
    }
}

impl StorageEngine for SledStore {
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        match self.db.get(key)? {
            Some(value) => Ok(value.to_vec()),
            None => Err(Error::NotFound(key.to_string())),
        }
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.db.insert(key, value)?;
        self.db.flush()?;
        Ok(())
    }

    fn compare_and_swap(&mut self, key: &str, expected: &[u8], value: &[u8]) -> Result<()> {
        match self.db.compare_and_swap(key, Some(expected), Some(value))? {
            Ok(()) => {
                self.db.flush()?;
                Ok(())
            }
            Err(cas) => match cas.current {
                None => Err(Error::NotFound(key.to_string())),
                Some(_) => Err(Error::WriteConflict(key.to_string())),
            },
        }
    }
}
