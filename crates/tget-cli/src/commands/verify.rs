//! `tget verify`: verify a pre-existing local file against the log

use std::path::Path;

use anyhow::Result;
use tget_tlog::{digest_line, match_digest, Client, LookupOpts};

use crate::config::Config;
use crate::fetch;

pub fn run(config: &Config, raw_url: &str, file: &Path) -> Result<()> {
    let (_, key) = fetch::derive_key(raw_url)?;

    let digest = fetch::hash_file(file)?;
    let want = digest_line(&digest);

    let client = Client::new(config.client_cache()?);
    let (_, note) = client.lookup_opts(
        &key,
        LookupOpts {
            digest: Some(want.clone()),
        },
    )?;
    println!("fetched note: {}", config.lookup_url(&key));

    match_digest(&note, &want)?;

    println!("validated file sha256sum: {}", hex::encode(digest));
    Ok(())
}
