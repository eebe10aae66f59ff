//! B-tree table store backed by redb

use std::path::Path;

use redb::{Database, ReadableTable, TableDefinition};

use crate::{Error, Result, StorageEngine};

const TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("tget");

/// Storage engine backed by a [redb](https://docs.rs/redb) database file
///
/// All records live in a single named table, created when the store is
/// opened so that reads against a fresh file report [`Error::NotFound`]
/// per key instead of a missing-table error.
pub struct RedbStore {
    db: Database,
}

impl RedbStore {
    /// Open (or create) a redb database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let db = Database::create(path).map_err(redb::Error::from)?;

        let tx = db.begin_write().map_err(redb::Error::from)?;
        tx.open_table(TABLE).map_err(redb::Error::from)?;
        tx.commit().map_err(redb::Error::from)?;

        Ok(Self { db })
    }
}

impl StorageEngine for RedbStore {
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        let tx = self.db.begin_read().map_err(redb::Error::from)?;
        let table = tx.open_table(TABLE).map_err(redb::Error::from)?;
        match table.get(key).map_err(redb::Error::from)? {
            Some(value) => Ok(value.value().to_vec()),
            None => Err(Error::NotFound(key.to_string())),
        }
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        let tx = self.db.begin_write().map_err(redb::Error::from)?;
        {
            let mut table = tx.open_table(TABLE).map_err(redb::Error::from)?;
            table.insert(key, value).map_err(redb::Error::from)?;
        }
        tx.commit().map_err(redb::Error::from)?;
        Ok(())
    }

    fn compare_and_swap(&mut self, key: &str, expected: &[u8], value: &[u8]) -> Result<()> {
        let tx = self.db.begin_write().map_err(redb::Error::from)?;

        let decision = {
            let mut table = tx.open_table(TABLE).map_err(redb::Error::from)?;
            let current = table
                .get(key)
                .map_err(redb::Error::from)?
                .map(|guard| guard.value().to_vec());

            match current {
                None => Err(Error::NotFound(key.to_string())),
                Some(current) if current != expected => {
                    Err(Error::WriteConflict(key.to_string()))
                }
                Some(_) => {
                    table.insert(key, value).map_err(redb::Error::from)?;
                    Ok(())
                }
            }
        };

        match decision {
            Ok(()) => {
                tx.commit().map_err(redb::Error::from)?;
                Ok(())
            }
            Err(err) => {
                tx.abort().map_err(redb::Error::from)?;
                Err(err)
            }
        }
    }
}
