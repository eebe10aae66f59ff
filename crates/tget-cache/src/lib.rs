//! Local trust cache for transparency log clients
//!
//! [`TrustCache`] layers two logical namespaces over a pluggable
//! [`StorageEngine`](tget_store::StorageEngine):
//!
//! - `config:` records hold trust state: the pinned verifier key and the
//!   latest verified tree head. Writes go through [`TrustCache::write_config`],
//!   which enforces a compare-and-swap discipline: once a record exists it
//!   can only be replaced by a caller that supplies its exact previous bytes.
//! - `file:` records are pure cache entries for log-derived artifacts. They
//!   are re-derivable from the remote log, so last-write-wins is fine.
//!
//! The cache also carries the sole network access point for the log client
//! ([`TrustCache::read_remote`]) and the trust-on-first-use bootstrap for
//! the verification key ([`TrustCache::bootstrap`]).
//!
//! Each operation opens the storage engine, acts, and closes it again.
//! Durability and isolation are delegated entirely to the engine's own
//! file-level locking; no state is kept in memory between operations.

mod error;

pub use error::{Error, Result};

use std::path::PathBuf;

use url::Url;

/// Key prefix of the config namespace
pub const CONFIG_PREFIX: &str = "config:";

/// Key prefix of the cached-file namespace
pub const FILE_PREFIX: &str = "file:";

/// Config record name of the trust-on-first-use key anchor
pub const TRUST_ANCHOR: &str = "key";

/// The I/O surface consumed by the transparency log client
///
/// This is the seam at which the log client's Merkle-proof and
/// note-signature logic plugs in: everything it reads or writes (config
/// state, cached log artifacts, the network) goes through these six
/// operations. [`TrustCache`] is the production implementation.
pub trait ClientOps {
    /// Read a config record; `Ok(None)` only for absent `/latest` records
    fn read_config(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Write a config record, unconditionally when `old` is `None`,
    /// otherwise only if the stored bytes still equal `old`
    fn write_config(&self, name: &str, old: Option<&[u8]>, new: &[u8]) -> Result<()>;

    /// Read a cached log artifact
    fn read_cache(&self, path: &str) -> Result<Vec<u8>>;

    /// Store a cached log artifact
    fn write_cache(&self, path: &str, data: &[u8]) -> Result<()>;

    /// Fetch `path` (plus optional query string) from the log server
    fn read_remote(&self, path: &str, query: Option<&str>) -> Result<Vec<u8>>;

    /// Report an informational, non-fatal message
    fn log(&self, msg: &str);
}

/// The local trust cache
///
/// Holds the engine selection, the cache file path and the log server URL;
/// the storage engine itself is opened per operation.
pub struct TrustCache {
    engine: tget_store::EngineKind,
    store_path: PathBuf,
    server_url: Url,
    http: reqwest::blocking::Client,
}

impl TrustCache {
    /// Create a trust cache over the given engine and cache file
    pub fn new(engine: tget_store::EngineKind, store_path: PathBuf, server_url: Url) -> Self {
        Self {
            engine,
            store_path,
            server_url,
            http: reqwest::blocking::Client::new(),
        }
    }

    /// The log server this cache reads through to
    pub fn server_url(&self) -> &Url {
        &self.server_url
    }

    fn open_store(&self) -> Result<Box<dyn tget_store::StorageEngine>> {
        tget_store::open(self.engine, &self.store_path).map_err(|source| Error::Open {
            path: self.store_path.clone(),
            source,
        })
    }

    /// Read the config record `name`
    ///
    /// A missing record whose name ends in `/latest` is benign ("no
    /// published data yet") and reads as `Ok(None)`; every other failure is
    /// reported with the record name attached.
    pub fn read_config(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let store = self.open_store()?;
        match store.get(&format!("{CONFIG_PREFIX}{name}")) {
            Ok(value) => Ok(Some(value)),
            Err(err) if err.is_not_found() && name.ends_with("/latest") => Ok(None),
            Err(source) => Err(Error::Config {
                name: name.to_string(),
                source,
            }),
        }
    }

    /// Write the config record `name`
    ///
    /// With `old == None` this is an unconditional first write; otherwise
    /// the stored value must still be byte-identical to `old` or the write
    /// fails with a conflict, surfaced unchanged to the caller. This is the
    /// only path by which the trust anchor can be mutated after creation.
    pub fn write_config(&self, name: &str, old: Option<&[u8]>, new: &[u8]) -> Result<()> {
        let mut store = self.open_store()?;
        let key = format!("{CONFIG_PREFIX}{name}");
        let result = match old {
            None => store.put(&key, new),
            Some(old) => store.compare_and_swap(&key, old, new),
        };
        result.map_err(|source| Error::Config {
            name: name.to_string(),
            source,
        })
    }

    /// Read the cached log artifact at `path`
    pub fn read_cache(&self, path: &str) -> Result<Vec<u8>> {
        let store = self.open_store()?;
        store
            .get(&format!("{FILE_PREFIX}{path}"))
            .map_err(|source| Error::Cache {
                path: path.to_string(),
                source,
            })
    }

    /// Store the log artifact at `path`, overwriting any previous value
    pub fn write_cache(&self, path: &str, data: &[u8]) -> Result<()> {
        let mut store = self.open_store()?;
        store
            .put(&format!("{FILE_PREFIX}{path}"), data)
            .map_err(|source| Error::Cache {
                path: path.to_string(),
                source,
            })
    }

    /// Fetch `path` (plus optional query string) from the log server
    ///
    /// Returns the response body verbatim. Any transport failure or
    /// non-success status is an error carrying the full URL.
    pub fn read_remote(&self, path: &str, query: Option<&str>) -> Result<Vec<u8>> {
        let mut url = self.server_url.clone();
        url.set_path(path);
        url.set_query(query);

        let response = self
            .http
            .get(url.clone())
            .send()
            .map_err(|source| Error::Remote {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::RemoteStatus {
                url: url.to_string(),
                status,
            });
        }

        let body = response.bytes().map_err(|source| Error::Remote {
            url: url.to_string(),
            source,
        })?;
        Ok(body.to_vec())
    }

    /// Report an informational, non-fatal message
    pub fn log(&self, msg: &str) {
        tracing::info!(target: "tget", "{msg}");
    }

    /// Trust-on-first-use bootstrap of the verification key anchor
    ///
    /// Reads the anchor record; any failure (including a never-written key)
    /// triggers the one unconditional first write. Once the anchor exists
    /// this is a no-op: re-running never alters an already-pinned key.
    pub fn bootstrap(&self, verifier_key: &str) -> Result<()> {
        match self.read_config(TRUST_ANCHOR) {
            Ok(Some(_)) => Ok(()),
            _ => {
                self.log("pinning log verifier key on first use");
                self.write_config(TRUST_ANCHOR, None, verifier_key.as_bytes())
            }
        }
    }
}

impl ClientOps for TrustCache {
    fn read_config(&self, name: &str) -> Result<Option<Vec<u8>>> {
        TrustCache::read_config(self, name)
    }

    fn write_config(&self, name: &str, old: Option<&[u8]>, new: &[u8]) -> Result<()> {
        TrustCache::write_config(self, name, old, new)
    }

    fn read_cache(&self, path: &str) -> Result<Vec<u8>> {
        TrustCache::read_cache(self, path)
    }

    fn write_cache(&self, path: &str, data: &[u8]) -> Result<()> {
        TrustCache::write_cache(self, path, data)
    }

    fn read_remote(&self, path: &str, query: Option<&str>) -> Result<Vec<u8>> {
        TrustCache::read_remote(self, path, query)
    }

    fn log(&self, msg: &str) {
        TrustCache::log(self, msg)
    }
}
