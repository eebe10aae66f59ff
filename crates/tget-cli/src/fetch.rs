//! Fetch pipeline helpers: key derivation, streaming download, hashing
//!
//! The digest of a stream is only known at end-of-stream, so the download
//! writes the full artifact to disk while feeding a SHA-256 accumulator;
//! the byte-level check against the log happens after the copy completes.

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use url::Url;

/// Parse `raw` and derive the transparency log key for it: `host + path`,
/// dropping scheme and query
pub fn derive_key(raw: &str) -> Result<(Url, String)> {
    let url = Url::parse(raw).with_context(|| format!("invalid URL {raw}"))?;
    let host = match url.host_str() {
        Some(host) => host,
        None => bail!("URL {raw} has no host"),
    };
    let key = format!("{host}{}", url.path());
    Ok((url, key))
}

/// Derive the local file name for a downloaded URL from its last path
/// segment
pub fn dest_name(url: &Url) -> Result<PathBuf> {
    let name = url
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|name| !name.is_empty());
    match name {
        Some(name) => Ok(PathBuf::from(name)),
        None => bail!("cannot derive a file name from {url}"),
    }
}

/// A writer that tees everything it writes into a SHA-256 accumulator
struct DigestWriter<W: Write> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> Write for DigestWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Stream `url` to `dest`, returning the SHA-256 digest of the bytes
/// written
pub fn download(url: &Url, dest: &Path) -> Result<[u8; 32]> {
    let mut response = reqwest::blocking::get(url.clone())
        .with_context(|| format!("GET {url}"))?;
    let status = response.status();
    if !status.is_success() {
        bail!("GET {url}: status {status}");
    }

    let file = File::create(dest).with_context(|| format!("create {}", dest.display()))?;
    let mut writer = DigestWriter {
        inner: BufWriter::new(file),
        hasher: Sha256::new(),
    };
    response
        .copy_to(&mut writer)
        .with_context(|| format!("download {url}"))?;
    writer.flush().with_context(|| format!("write {}", dest.display()))?;

    Ok(writer.hasher.finalize().into())
}

/// Fetch `url` fully into memory
pub fn fetch_bytes(url: &Url) -> Result<Vec<u8>> {
    let response = reqwest::blocking::get(url.clone())
        .with_context(|| format!("GET {url}"))?;
    let status = response.status();
    if !status.is_success() {
        bail!("GET {url}: status {status}");
    }
    let body = response.bytes().with_context(|| format!("read {url}"))?;
    Ok(body.to_vec())
}

/// SHA-256 of a local file, streamed
pub fn hash_file(path: &Path) -> Result<[u8; 32]> {
    let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file
            .read(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_drops_scheme_and_query() {
        let (_, key) = derive_key("https://dl.example.com/tool/v1.2.3.tar.gz?mirror=eu").unwrap();
        assert_eq!(key, "dl.example.com/tool/v1.2.3.tar.gz");
    }

    #[test]
    fn test_malformed_url_is_fatal() {
        assert!(derive_key("::not a url::").is_err());
    }

    #[test]
    fn test_url_without_host_is_fatal() {
        assert!(derive_key("data:text/plain,hello").is_err());
    }

    #[test]
    fn test_dest_name_uses_last_segment() {
        let (url, _) = derive_key("https://dl.example.com/tool/v1.2.3.tar.gz").unwrap();
        assert_eq!(dest_name(&url).unwrap(), PathBuf::from("v1.2.3.tar.gz"));
    }

    #[test]
    fn test_dest_name_rejects_bare_host() {
        let (url, _) = derive_key("https://dl.example.com/").unwrap();
        assert!(dest_name(&url).is_err());
    }

    #[test]
    fn test_hash_file_matches_known_digest() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("artifact");
        std::fs::write(&path, b"hello world").unwrap();

        let digest = hash_file(&path).unwrap();
        assert_eq!(
            hex::encode(digest),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_digest_writer_hashes_what_it_writes() {
        let mut writer = DigestWriter {
            inner: Vec::new(),
            hasher: Sha256::new(),
        };
        writer.write_all(b"hello ").unwrap();
        writer.write_all(b"world").unwrap();

        let digest: [u8; 32] = writer.hasher.finalize().into();
        assert_eq!(writer.inner, b"hello world");
        assert_eq!(
            hex::encode(digest),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }
}
