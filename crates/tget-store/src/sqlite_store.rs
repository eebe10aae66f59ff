//! Relational-table store backed by SQLite

use std::path::Path;

use rusqlite::{params, Connection};

use crate::{Error, Result, StorageEngine};

/// Storage engine backed by a single-table SQLite database
///
/// Records live in `kv (k primary key, v)`. The compare-and-swap runs the
/// read, comparison and write inside one SQL transaction; dropping the
/// transaction without committing rolls it back.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("CREATE TABLE IF NOT EXISTS kv (k TEXT PRIMARY KEY, v BLOB)")?;
        Ok(Self { conn })
    }

    fn read(conn: &Connection, key: &str) -> Result<Vec<u8>> {
        match conn.query_row("SELECT v FROM kv WHERE k = ?1", params![key], |row| {
            row.get::<_, Vec<u8>>(0)
        }) {
            Ok(value) => Ok(value),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(Error::NotFound(key.to_string())),
            Err(err) => Err(err.into()),
        }
    }
}

impl StorageEngine for SqliteStore {
    fn get(&self, key: &str) -> Result<Vec<u8>> {
        Self::read(&self.conn, key)
    }

    fn put(&mut self, key: &str, value: &[u8]) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO kv (k, v) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    fn compare_and_swap(&mut self, key: &str, expected: &[u8], value: &[u8]) -> Result<()> {
        let tx = self.conn.transaction()?;

        let current = Self::read(&tx, key)?;
        if current != expected {
            return Err(Error::WriteConflict(key.to_string()));
        }

        tx.execute(
            "INSERT OR REPLACE INTO kv (k, v) VALUES (?1, ?2)",
            params![key, value],
        )?;
        tx.commit()?;
        Ok(())
    }
}
