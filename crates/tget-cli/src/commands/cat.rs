//! `tget cat`: print a URL's contents only if the log verifies them

use std::io::{self, Write};

use anyhow::Result;
use sha2::{Digest, Sha256};
use tget_tlog::{digest_line, match_digest, Client, LookupOpts};

use crate::config::Config;
use crate::fetch;

pub fn run(config: &Config, raw_url: &str) -> Result<()> {
    let (url, key) = fetch::derive_key(raw_url)?;

    let body = fetch::fetch_bytes(&url)?;
    let digest: [u8; 32] = Sha256::digest(&body).into();
    let want = digest_line(&digest);

    let client = Client::new(config.client_cache()?);
    let (_, note) = client.lookup_opts(
        &key,
        LookupOpts {
            digest: Some(want.clone()),
        },
    )?;
    match_digest(&note, &want)?;

    // Nothing reaches stdout until the digest is verified.
    io::stdout().write_all(&body)?;
    Ok(())
}
