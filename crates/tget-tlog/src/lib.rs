//! Transparency log client
//!
//! [`Client`] resolves a log entry for a cache key: it serves the signed
//! note from the local cache when present, fetches it from the log server
//! otherwise, verifies the note signature against the pinned verifier key,
//! and tracks the latest verified tree head so a log that shrinks or forks
//! is rejected.
//!
//! All I/O goes through the [`ClientOps`] surface; the client itself never
//! touches the network or the storage engines directly, which keeps it
//! testable against in-memory fakes and lets callers decide where trust
//! state lives.
//!
//! Merkle inclusion and consistency proofs are not checked here; the note
//! signature and tree-head monotonicity are this client's contract.

mod error;
pub mod note;

pub use error::{Error, Result};
pub use note::{digest_line, match_digest, Note, TreeHead, VerifierKey, DIGEST_PREFIX};

use tget_cache::{ClientOps, TRUST_ANCHOR};

/// Options for a digest-aware lookup
#[derive(Debug, Clone, Default)]
pub struct LookupOpts {
    /// A candidate digest line, passed to the server so it can
    /// short-circuit to proof generation for that specific entry
    pub digest: Option<String>,
}

/// A transparency log client over a [`ClientOps`] provider
pub struct Client<O: ClientOps> {
    ops: O,
}

impl<O: ClientOps> Client<O> {
    /// Create a client over the given I/O provider
    pub fn new(ops: O) -> Self {
        Self { ops }
    }

    /// Look up the signed note for `key`
    ///
    /// Returns the verified tree head and the full note text; digest
    /// assertions are scanned out of the text by the caller with
    /// [`match_digest`].
    pub fn lookup(&self, key: &str) -> Result<(TreeHead, String)> {
        self.lookup_opts(key, LookupOpts::default())
    }

    /// Look up the signed note for `key`, optionally naming a candidate
    /// digest for the server
    ///
    /// Any failure (transport, malformed note, signature or tree-head
    /// verification) means the entry must not be trusted; callers fail
    /// closed.
    pub fn lookup_opts(&self, key: &str, opts: LookupOpts) -> Result<(TreeHead, String)> {
        let vkey = self.verifier_key()?;

        let cache_path = format!("lookup/{key}");
        let (text, fetched) = match self.ops.read_cache(&cache_path) {
            Ok(data) => (note_text(data)?, false),
            Err(err) if err.is_not_found() => {
                let query = opts.digest.as_deref().map(|d| format!("digest={d}"));
                let raw = self.ops.read_remote(&format!("/lookup/{key}"), query.as_deref())?;
                (note_text(raw)?, true)
            }
            Err(err) => return Err(err.into()),
        };

        let parsed = Note::from_text(&text)?;
        parsed.verify(&vkey)?;

        // A cached note is a snapshot that already passed these checks when
        // it was stored; its tree may lag the latest head. Only fresh data
        // advances the head, and only verified notes enter the cache.
        if fetched {
            self.advance_tree(&vkey, &parsed.tree)?;
            self.ops.write_cache(&cache_path, text.as_bytes())?;
            self.ops.log(&format!("cached log note for {key}"));
        }

        Ok((parsed.tree, text))
    }

    fn verifier_key(&self) -> Result<VerifierKey> {
        let raw = self.ops.read_config(TRUST_ANCHOR)?.ok_or_else(|| {
            Error::BadVerifierKey("no verifier key pinned in the trust cache".to_string())
        })?;
        let text = String::from_utf8(raw)
            .map_err(|_| Error::BadVerifierKey("pinned key is not UTF-8".to_string()))?;
        VerifierKey::parse(&text)
    }

    /// Record `tree` as the latest verified tree head for this log
    ///
    /// The record is advanced with a compare-and-swap against the previous
    /// head, so a concurrent writer cannot be silently overwritten. A head
    /// that moves backwards, or changes without growing, is a fork and
    /// fails closed.
    fn advance_tree(&self, vkey: &VerifierKey, tree: &TreeHead) -> Result<()> {
        let name = format!("{}/latest", vkey.name());

        let previous = self.ops.read_config(&name)?;
        let previous = match previous {
            None => {
                self.ops.write_config(&name, None, tree.to_text().as_bytes())?;
                return Ok(());
            }
            Some(bytes) => bytes,
        };

        let previous_head = TreeHead::from_text(
            std::str::from_utf8(&previous)
                .map_err(|_| Error::BadNote("stored tree head is not UTF-8".to_string()))?,
        )?;

        if tree.tree_size < previous_head.tree_size {
            return Err(Error::SecurityViolation(format!(
                "log tree went backwards: size {} -> {}",
                previous_head.tree_size, tree.tree_size
            )));
        }
        if tree.tree_size == previous_head.tree_size && tree.root_hash != previous_head.root_hash {
            return Err(Error::SecurityViolation(format!(
                "log tree forked at size {}",
                tree.tree_size
            )));
        }

        if *tree != previous_head {
            self.ops
                .write_config(&name, Some(previous.as_slice()), tree.to_text().as_bytes())?;
        }
        Ok(())
    }
}

fn note_text(raw: Vec<u8>) -> Result<String> {
    String::from_utf8(raw).map_err(|_| Error::BadNote("note is not UTF-8".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use ed25519_dalek::{Signer, SigningKey};
    use rand::rngs::OsRng;
    use tget_cache::ClientOps;

    /// In-memory ClientOps fake: a key-value map plus canned remote bodies.
    #[derive(Default)]
    struct FakeOps {
        config: RefCell<HashMap<String, Vec<u8>>>,
        files: RefCell<HashMap<String, Vec<u8>>>,
        remote: RefCell<HashMap<String, Vec<u8>>>,
        remote_hits: Cell<usize>,
        last_query: RefCell<Option<String>>,
    }

    fn not_found(key: &str) -> tget_cache::Error {
        tget_cache::Error::Cache {
            path: key.to_string(),
            source: tget_store::Error::NotFound(key.to_string()),
        }
    }

    impl ClientOps for FakeOps {
        fn read_config(&self, name: &str) -> tget_cache::Result<Option<Vec<u8>>> {
            match self.config.borrow().get(name) {
                Some(value) => Ok(Some(value.clone())),
                None if name.ends_with("/latest") => Ok(None),
                None => Err(tget_cache::Error::Config {
                    name: name.to_string(),
                    source: tget_store::Error::NotFound(name.to_string()),
                }),
            }
        }

        fn write_config(
            &self,
            name: &str,
            old: Option<&[u8]>,
            new: &[u8],
        ) -> tget_cache::Result<()> {
            let mut config = self.config.borrow_mut();
            if let Some(old) = old {
                match config.get(name) {
                    None => {
                        return Err(tget_cache::Error::Config {
                            name: name.to_string(),
                            source: tget_store::Error::NotFound(name.to_string()),
                        })
                    }
                    Some(current) if current.as_slice() != old => {
                        return Err(tget_cache::Error::Config {
                            name: name.to_string(),
                            source: tget_store::Error::WriteConflict(name.to_string()),
                        })
                    }
                    Some(_) => {}
                }
            }
            config.insert(name.to_string(), new.to_vec());
            Ok(())
        }

        fn read_cache(&self, path: &str) -> tget_cache::Result<Vec<u8>> {
            self.files
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| not_found(path))
        }

        fn write_cache(&self, path: &str, data: &[u8]) -> tget_cache::Result<()> {
            self.files.borrow_mut().insert(path.to_string(), data.to_vec());
            Ok(())
        }

        fn read_remote(&self, path: &str, query: Option<&str>) -> tget_cache::Result<Vec<u8>> {
            self.remote_hits.set(self.remote_hits.get() + 1);
            *self.last_query.borrow_mut() = query.map(str::to_string);
            self.remote
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| not_found(path))
        }

        fn log(&self, _msg: &str) {}
    }

    struct Log {
        signing: SigningKey,
        vkey: VerifierKey,
    }

    impl Log {
        fn new(name: &str) -> Self {
            let signing = SigningKey::generate(&mut OsRng);
            let vkey =
                VerifierKey::parse(&VerifierKey::encode(name, &signing.verifying_key())).unwrap();
            Self { signing, vkey }
        }

        fn note(&self, tree_size: u64, digests: &[&str]) -> String {
            let head = TreeHead {
                origin: self.vkey.name().to_string(),
                tree_size,
                root_hash: vec![tree_size as u8; 32],
            };
            let mut body = head.to_text();
            for digest in digests {
                body.push_str(digest);
                body.push('\n');
            }
            let sig = self.signing.sign(body.as_bytes());
            let mut blob = self.vkey.key_id().to_vec();
            blob.extend_from_slice(&sig.to_bytes());
            format!(
                "{body}\n\u{2014} {} {}\n",
                self.vkey.name(),
                STANDARD.encode(&blob)
            )
        }
    }

    fn ops_with_key(log: &Log) -> FakeOps {
        let ops = FakeOps::default();
        ops.config.borrow_mut().insert(
            TRUST_ANCHOR.to_string(),
            VerifierKey::encode(log.vkey.name(), &log.signing.verifying_key()).into_bytes(),
        );
        ops
    }

    #[test]
    fn test_lookup_fetches_verifies_and_caches() {
        let log = Log::new("asset-log");
        let ops = ops_with_key(&log);
        ops.remote.borrow_mut().insert(
            "/lookup/example.com/tool".to_string(),
            log.note(7, &["h1:AAAA"]).into_bytes(),
        );

        let client = Client::new(ops);
        let (tree, text) = client.lookup("example.com/tool").unwrap();
        assert_eq!(tree.tree_size, 7);
        match_digest(&text, "h1:AAAA").unwrap();

        // The verified note is cached and the latest head recorded.
        assert!(client.ops.files.borrow().contains_key("lookup/example.com/tool"));
        assert!(client.ops.config.borrow().contains_key("asset-log/latest"));

        // A second lookup is served from the cache.
        client.lookup("example.com/tool").unwrap();
        assert_eq!(client.ops.remote_hits.get(), 1);
    }

    #[test]
    fn test_lookup_opts_passes_digest_query() {
        let log = Log::new("asset-log");
        let ops = ops_with_key(&log);
        ops.remote.borrow_mut().insert(
            "/lookup/example.com/tool".to_string(),
            log.note(7, &["h1:AAAA"]).into_bytes(),
        );

        let client = Client::new(ops);
        client
            .lookup_opts(
                "example.com/tool",
                LookupOpts {
                    digest: Some("h1:AAAA".to_string()),
                },
            )
            .unwrap();
        assert_eq!(
            client.ops.last_query.borrow().as_deref(),
            Some("digest=h1:AAAA")
        );
    }

    #[test]
    fn test_lookup_without_pinned_key_fails() {
        let log = Log::new("asset-log");
        let ops = FakeOps::default();
        ops.remote.borrow_mut().insert(
            "/lookup/example.com/tool".to_string(),
            log.note(7, &["h1:AAAA"]).into_bytes(),
        );

        let err = Client::new(ops).lookup("example.com/tool").unwrap_err();
        assert!(matches!(err, Error::Ops(_)));
    }

    #[test]
    fn test_lookup_rejects_unsigned_tampering() {
        let log = Log::new("asset-log");
        let ops = ops_with_key(&log);
        let tampered = log.note(7, &["h1:AAAA"]).replace("h1:AAAA", "h1:BBBB");
        ops.remote
            .borrow_mut()
            .insert("/lookup/example.com/tool".to_string(), tampered.into_bytes());

        let err = Client::new(ops).lookup("example.com/tool").unwrap_err();
        assert!(err.is_security_violation());
    }

    #[test]
    fn test_unverified_note_is_never_cached() {
        let log = Log::new("asset-log");
        let ops = ops_with_key(&log);
        let tampered = log.note(7, &["h1:AAAA"]).replace("h1:AAAA", "h1:BBBB");
        ops.remote
            .borrow_mut()
            .insert("/lookup/example.com/tool".to_string(), tampered.into_bytes());

        let client = Client::new(ops);
        client.lookup("example.com/tool").unwrap_err();
        assert!(client.ops.files.borrow().is_empty());
    }

    #[test]
    fn test_tree_head_advances_and_never_regresses() {
        let log = Log::new("asset-log");
        let ops = ops_with_key(&log);
        ops.remote.borrow_mut().insert(
            "/lookup/a".to_string(),
            log.note(7, &["h1:AAAA"]).into_bytes(),
        );
        ops.remote.borrow_mut().insert(
            "/lookup/b".to_string(),
            log.note(9, &["h1:BBBB"]).into_bytes(),
        );
        ops.remote.borrow_mut().insert(
            "/lookup/c".to_string(),
            log.note(5, &["h1:CCCC"]).into_bytes(),
        );

        let client = Client::new(ops);
        client.lookup("a").unwrap();
        client.lookup("b").unwrap();

        let latest = client.ops.config.borrow()["asset-log/latest"].clone();
        let head = TreeHead::from_text(std::str::from_utf8(&latest).unwrap()).unwrap();
        assert_eq!(head.tree_size, 9);

        // A note from a smaller tree is a security violation, and the
        // stored head stays where it was.
        let err = client.lookup("c").unwrap_err();
        assert!(err.is_security_violation());
        let latest = client.ops.config.borrow()["asset-log/latest"].clone();
        let head = TreeHead::from_text(std::str::from_utf8(&latest).unwrap()).unwrap();
        assert_eq!(head.tree_size, 9);
    }

    #[test]
    fn test_cached_note_from_older_tree_still_verifies() {
        let log = Log::new("asset-log");
        let ops = ops_with_key(&log);
        ops.remote.borrow_mut().insert(
            "/lookup/a".to_string(),
            log.note(7, &["h1:AAAA"]).into_bytes(),
        );
        ops.remote.borrow_mut().insert(
            "/lookup/b".to_string(),
            log.note(9, &["h1:BBBB"]).into_bytes(),
        );

        let client = Client::new(ops);
        client.lookup("a").unwrap();
        client.lookup("b").unwrap();

        // "a" is served from the cache; its older tree head is a snapshot,
        // not a regression.
        let (tree, _) = client.lookup("a").unwrap();
        assert_eq!(tree.tree_size, 7);
    }

    #[test]
    fn test_fork_at_same_size_is_rejected() {
        let log = Log::new("asset-log");
        let ops = ops_with_key(&log);
        ops.remote.borrow_mut().insert(
            "/lookup/a".to_string(),
            log.note(7, &["h1:AAAA"]).into_bytes(),
        );

        let client = Client::new(ops);
        client.lookup("a").unwrap();

        // Same size, different root hash.
        let forked = TreeHead {
            origin: "asset-log".to_string(),
            tree_size: 7,
            root_hash: vec![0xFF; 32],
        };
        let err = client.advance_tree(&log.vkey, &forked).unwrap_err();
        assert!(err.is_security_violation());
    }
}
