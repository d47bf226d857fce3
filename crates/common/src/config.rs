//! Application configuration.

use serde::Deserialize;
use std::path::Path;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Remote document store configuration.
    #[serde(default)]
    pub remote: RemoteConfig,
    /// Local cache configuration.
    #[serde(default)]
    pub cache: CacheConfig,
}

/// Remote document store configuration.
///
/// The remote store is optional: with no base URL the process runs
/// local-only for its whole lifetime and every operation short-circuits
/// to the cache.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the document store (e.g. `https://docs.example.com/v1`).
    #[serde(default)]
    pub base_url: Option<String>,
    /// API key sent as a bearer token.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Local cache configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Directory for the file-backed cache. `None` keeps the cache in memory.
    #[serde(default)]
    pub dir: Option<String>,
    /// Namespace prefixed to every cache key.
    #[serde(default = "default_namespace")]
    pub namespace: String,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: None,
            namespace: default_namespace(),
        }
    }
}

const fn default_timeout_secs() -> u64 {
    10
}

fn default_namespace() -> String {
    "prepsync".to_string()
}

impl RemoteConfig {
    /// Whether remote credentials are present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.base_url.as_deref().is_some_and(|url| !url.trim().is_empty())
    }
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Configuration is loaded in the following order:
    /// 1. `config/default.toml`
    /// 2. `config/{environment}.toml` (based on `PREPSYNC_ENV`)
    /// 3. Environment variables with `PREPSYNC_` prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let env = std::env::var("PREPSYNC_ENV").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("PREPSYNC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("PREPSYNC")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}
