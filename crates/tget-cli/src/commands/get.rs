//! `tget get`: download a URL and verify it against the log

use std::fs;

use anyhow::{Context, Result};
use tget_tlog::{digest_line, match_digest, Client};

use crate::config::Config;
use crate::fetch;

pub fn run(config: &Config, raw_url: &str) -> Result<()> {
    let (url, key) = fetch::derive_key(raw_url)?;

    let client = Client::new(config.client_cache()?);
    let (_, note) = client.lookup(&key)?;
    println!("fetched note: {}", config.lookup_url(&key));

    // The artifact lands under a partial name first; only verified bytes
    // are released under the final name.
    let dest = fetch::dest_name(&url)?;
    let partial = std::path::PathBuf::from(format!("{}.partial", dest.display()));

    let digest = fetch::download(&url, &partial)?;
    let want = digest_line(&digest);
    match_digest(&note, &want)
        .with_context(|| format!("artifact left unverified at {}", partial.display()))?;

    fs::rename(&partial, &dest)
        .with_context(|| format!("rename {} to {}", partial.display(), dest.display()))?;

    println!("validated file sha256sum: {}", hex::encode(digest));
    println!("download validated and saved to {}", dest.display());
    Ok(())
}
