//! Configuration: defaults, config file and environment overrides

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::ProjectDirs;
use serde::Deserialize;
use tget_cache::TrustCache;
use tget_store::EngineKind;
use url::Url;

/// The default asset transparency log server
pub const DEFAULT_SERVER_URL: &str = "https://beta-asset.transparencylog.net";

/// The default log verifier key, pinned on first use
pub const DEFAULT_VERIFIER_KEY: &str =
    "log+3809a75e+ARmkoBH4C+/rbs9QomTtpLJQCkzfY171BfHZLEnmA/+e";

/// Optional on-disk configuration, `config.toml` in the config directory
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    server_url: Option<String>,
    verifier_key: Option<String>,
    engine: Option<String>,
}

impl FileConfig {
    fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parse config file {}", path.display()))
    }
}

/// Resolved configuration for one invocation
#[derive(Debug)]
pub struct Config {
    /// Base URL of the log server
    pub server_url: Url,
    /// Verifier key pinned on first use
    pub verifier_key: String,
    /// Storage engine backing the trust cache
    pub engine: EngineKind,
    /// Path of the trust cache file
    pub cache_path: PathBuf,
}

impl Config {
    /// Load configuration: defaults, then the config file, then environment
    /// overrides (`TGET_SERVER_URL`, `TGET_SERVER_KEY`, `TGET_ENGINE`)
    pub fn load(config_file: Option<&Path>) -> Result<Self> {
        let dirs = ProjectDirs::from("net", "transparencylog", "tget")
            .ok_or_else(|| anyhow!("could not determine a config directory"))?;
        let config_dir = dirs.config_dir().to_path_buf();
        fs::create_dir_all(&config_dir)
            .with_context(|| format!("create config directory {}", config_dir.display()))?;

        let file = match config_file {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::load(&config_dir.join("config.toml"))?,
        };

        let server_url = std::env::var("TGET_SERVER_URL")
            .ok()
            .or(file.server_url)
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());
        let server_url =
            Url::parse(&server_url).with_context(|| format!("invalid server URL {server_url}"))?;

        let verifier_key = std::env::var("TGET_SERVER_KEY")
            .ok()
            .or(file.verifier_key)
            .unwrap_or_else(|| DEFAULT_VERIFIER_KEY.to_string());

        let engine = std::env::var("TGET_ENGINE")
            .ok()
            .or(file.engine)
            .map(|name| name.parse::<EngineKind>().map_err(|e| anyhow!(e)))
            .transpose()?
            .unwrap_or(EngineKind::Sled);

        let cache_path = config_dir.join(format!("cache.{engine}"));

        Ok(Self {
            server_url,
            verifier_key,
            engine,
            cache_path,
        })
    }

    /// Open the trust cache and run the trust-on-first-use bootstrap
    pub fn client_cache(&self) -> Result<TrustCache> {
        let cache = TrustCache::new(
            self.engine,
            self.cache_path.clone(),
            self.server_url.clone(),
        );
        cache
            .bootstrap(&self.verifier_key)
            .context("pin log verifier key")?;
        Ok(cache)
    }

    /// The note URL for a lookup key, for display
    pub fn lookup_url(&self, key: &str) -> String {
        format!(
            "{}/lookup/{}",
            self.server_url.as_str().trim_end_matches('/'),
            key
        )
    }
}
