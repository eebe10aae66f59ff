//! Signed note format: verifier keys, tree heads and digest assertions
//!
//! A lookup response is a signed note. The note body carries the log's tree
//! head followed by the digest assertions for the requested entry, and is
//! signed by the log's Ed25519 key:
//!
//! ```text
//! <origin>
//! <tree_size>
//! <root_hash_base64>
//! h1:<artifact_digest_base64>
//!
//! — <signer_name> <base64(key_id || signature)>
//! ```
//!
//! The signature lines begin with the Unicode em dash (U+2014), not an ASCII
//! hyphen. Each decoded signature starts with a 4-byte key ID used to match
//! it to the pinned verifier key.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Prefix of a digest assertion line
pub const DIGEST_PREFIX: &str = "h1:";

/// Algorithm byte for Ed25519 verifier keys
const ALG_ED25519: u8 = 1;

/// Format a raw SHA-256 digest as a log digest line
pub fn digest_line(digest: &[u8]) -> String {
    format!("{DIGEST_PREFIX}{}", STANDARD.encode(digest))
}

/// Scan note text for the digest assertion `want`
///
/// The scan stops at the first line exactly equal to `want`. A different
/// line carrying the digest prefix before the match is a security
/// violation, as is text that asserts no digest at all: a note that says
/// nothing about the artifact must not pass verification.
pub fn match_digest(text: &str, want: &str) -> Result<()> {
    for line in text.lines() {
        if line == want {
            return Ok(());
        }
        if line.starts_with(DIGEST_PREFIX) {
            return Err(Error::SecurityViolation(format!(
                "log digest {line} does not match file digest {want}"
            )));
        }
    }
    Err(Error::SecurityViolation(format!(
        "log note asserts no digest for file digest {want}"
    )))
}

/// A pinned log verifier key
///
/// Text form: `<name>+<key_id_hex>+<base64(alg || public_key)>`. The key ID
/// is the first 4 bytes of `SHA-256(<name> "\n" <alg || public_key>)` and
/// lets a verifier match note signatures to this key.
#[derive(Debug, Clone)]
pub struct VerifierKey {
    name: String,
    key_id: [u8; 4],
    key: VerifyingKey,
}

impl VerifierKey {
    /// Parse a verifier key from its text form
    pub fn parse(vkey: &str) -> Result<Self> {
        let bad = |msg: &str| Error::BadVerifierKey(format!("{msg}: {vkey}"));

        let mut fields = vkey.split('+');
        let (name, id_hex, key_b64) = match (fields.next(), fields.next(), fields.next()) {
            (Some(name), Some(id), Some(key)) => (name, id, key),
            _ => return Err(bad("expected <name>+<id>+<key>")),
        };
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(bad("invalid name"));
        }

        let id_bytes = hex::decode(id_hex).map_err(|_| bad("key id is not hex"))?;
        let key_id: [u8; 4] = id_bytes
            .as_slice()
            .try_into()
            .map_err(|_| bad("key id must be 4 bytes"))?;

        // The base64 field may itself contain '+'; rejoin the remainder.
        let mut key_b64 = key_b64.to_string();
        for rest in fields {
            key_b64.push('+');
            key_b64.push_str(rest);
        }
        let alg_key = STANDARD
            .decode(&key_b64)
            .map_err(|_| bad("key is not base64"))?;

        match alg_key.split_first() {
            Some((&ALG_ED25519, raw)) => {
                if key_id != Self::key_hash(name, &alg_key) {
                    return Err(bad("key id does not match key"));
                }
                let raw: &[u8; 32] = raw
                    .try_into()
                    .map_err(|_| bad("ed25519 key must be 32 bytes"))?;
                let key = VerifyingKey::from_bytes(raw).map_err(|_| bad("invalid ed25519 key"))?;
                Ok(Self {
                    name: name.to_string(),
                    key_id,
                    key,
                })
            }
            Some((alg, _)) => Err(bad(&format!("unsupported key algorithm {alg}"))),
            None => Err(bad("empty key")),
        }
    }

    /// Format the text form of an Ed25519 verifier key
    pub fn encode(name: &str, key: &VerifyingKey) -> String {
        let mut alg_key = vec![ALG_ED25519];
        alg_key.extend_from_slice(key.as_bytes());
        let key_id = Self::key_hash(name, &alg_key);
        format!(
            "{name}+{}+{}",
            hex::encode(key_id),
            STANDARD.encode(&alg_key)
        )
    }

    fn key_hash(name: &str, alg_key: &[u8]) -> [u8; 4] {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        hasher.update(b"\n");
        hasher.update(alg_key);
        let hash = hasher.finalize();
        [hash[0], hash[1], hash[2], hash[3]]
    }

    /// The log name this key signs for
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The 4-byte key ID
    pub fn key_id(&self) -> [u8; 4] {
        self.key_id
    }

    /// Verify an Ed25519 signature over `message`
    pub fn verify(&self, message: &[u8], signature: &[u8]) -> Result<()> {
        let signature = Signature::from_slice(signature)
            .map_err(|_| Error::SecurityViolation("malformed note signature".to_string()))?;
        self.key
            .verify(message, &signature)
            .map_err(|_| Error::SecurityViolation(format!("note signature by {} is invalid", self.name)))
    }
}

/// A log tree head: the first three lines of a note body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeHead {
    /// The origin string identifying the log
    pub origin: String,
    /// Tree size (number of leaves)
    pub tree_size: u64,
    /// Root hash of the log's Merkle tree
    pub root_hash: Vec<u8>,
}

impl TreeHead {
    /// Parse a tree head from note body text
    pub fn from_text(text: &str) -> Result<Self> {
        let mut lines = text.lines();

        let origin = lines
            .next()
            .filter(|l| !l.is_empty())
            .ok_or_else(|| Error::BadNote("missing origin".to_string()))?
            .to_string();

        let tree_size = lines
            .next()
            .ok_or_else(|| Error::BadNote("missing tree size".to_string()))?
            .parse()
            .map_err(|_| Error::BadNote("invalid tree size".to_string()))?;

        let root_hash = STANDARD
            .decode(
                lines
                    .next()
                    .ok_or_else(|| Error::BadNote("missing root hash".to_string()))?,
            )
            .map_err(|_| Error::BadNote("invalid root hash base64".to_string()))?;

        Ok(Self {
            origin,
            tree_size,
            root_hash,
        })
    }

    /// Serialize the tree head back to its text form
    pub fn to_text(&self) -> String {
        format!(
            "{}\n{}\n{}\n",
            self.origin,
            self.tree_size,
            STANDARD.encode(&self.root_hash)
        )
    }
}

/// A single signature line of a note
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteSignature {
    /// The signer name (appears after the em dash)
    pub name: String,
    /// The 4-byte key ID from the start of the decoded signature
    pub key_id: [u8; 4],
    /// The signature bytes after the key ID
    pub signature: Vec<u8>,
}

impl NoteSignature {
    /// Parse a signature line of the form `— <name> <base64>`
    pub fn from_line(line: &str) -> Result<Self> {
        let rest = line
            .strip_prefix("\u{2014} ")
            .ok_or_else(|| Error::BadNote("signature line must start with em dash".to_string()))?;

        let (name, sig_b64) = rest
            .split_once(' ')
            .ok_or_else(|| Error::BadNote("signature line must name its signer".to_string()))?;

        let decoded = STANDARD
            .decode(sig_b64)
            .map_err(|_| Error::BadNote("signature is not base64".to_string()))?;
        if decoded.len() < 5 {
            return Err(Error::BadNote("signature too short".to_string()));
        }

        let mut key_id = [0u8; 4];
        key_id.copy_from_slice(&decoded[..4]);
        Ok(Self {
            name: name.to_string(),
            key_id,
            signature: decoded[4..].to_vec(),
        })
    }
}

/// A parsed signed note
#[derive(Debug, Clone)]
pub struct Note {
    /// The tree head from the start of the body
    pub tree: TreeHead,
    /// The raw body text, exactly as signed (trailing newline included)
    pub body: String,
    /// The signatures after the blank separator line
    pub signatures: Vec<NoteSignature>,
}

impl Note {
    /// Parse a signed note: body text, one blank line, signature lines
    pub fn from_text(text: &str) -> Result<Self> {
        let (body, sig_text) = text
            .split_once("\n\n")
            .ok_or_else(|| Error::BadNote("missing signature separator".to_string()))?;
        if sig_text.contains("\n\n") {
            return Err(Error::BadNote("multiple signature separators".to_string()));
        }

        let tree = TreeHead::from_text(body)?;

        let signatures = sig_text
            .lines()
            .filter(|line| !line.is_empty())
            .map(NoteSignature::from_line)
            .collect::<Result<Vec<_>>>()?;
        if signatures.is_empty() {
            return Err(Error::BadNote("no signatures".to_string()));
        }

        Ok(Self {
            tree,
            // The blank separator's first newline terminates the signed body.
            body: format!("{body}\n"),
            signatures,
        })
    }

    /// Verify that this note is signed by `vkey`
    ///
    /// The signature must name the pinned key's log and carry its key ID;
    /// a note without such a signature fails closed.
    pub fn verify(&self, vkey: &VerifierKey) -> Result<()> {
        let signature = self
            .signatures
            .iter()
            .find(|sig| sig.name == vkey.name() && sig.key_id == vkey.key_id())
            .ok_or_else(|| {
                Error::SecurityViolation(format!("note has no signature by {}", vkey.name()))
            })?;

        vkey.verify(self.body.as_bytes(), &signature.signature)
    }
}
