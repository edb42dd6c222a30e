use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use url::Url;

pub const DEFAULT_USER_AGENT: &str = concat!("arbor/", env!("CARGO_PKG_VERSION"));

/// 5 MiB, the usual per-origin web storage allowance.
pub const DEFAULT_STORAGE_QUOTA: usize = 5 * 1024 * 1024;

/// Engine configuration for the effect environment.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Relative HTTP effect URLs are resolved against this.
    pub http_base_url: Option<Url>,
    pub http_timeout: Duration,
    pub user_agent: String,
    /// Byte quota per storage area; `None` is unlimited.
    pub storage_quota: Option<usize>,
    /// JSON file backing the local storage area; in memory when unset.
    pub persistent_store: Option<PathBuf>,
    pub random_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            http_base_url: None,
            http_timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            storage_quota: Some(DEFAULT_STORAGE_QUOTA),
            persistent_store: None,
            random_seed: None,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        let defaults = Self::default();
        Ok(Self {
            http_base_url: env::var("ARBOR_HTTP_BASE_URL")
                .ok()
                .map(|raw| Url::parse(&raw))
                .transpose()
                .context("ARBOR_HTTP_BASE_URL must be an absolute URL")?,
            http_timeout: match env::var("ARBOR_HTTP_TIMEOUT_SECS") {
                Ok(raw) => Duration::from_secs(
                    raw.parse()
                        .context("ARBOR_HTTP_TIMEOUT_SECS must be a whole number of seconds")?,
                ),
                Err(_) => defaults.http_timeout,
            },
            user_agent: env::var("ARBOR_HTTP_USER_AGENT").unwrap_or(defaults.user_agent),
            storage_quota: match env::var("ARBOR_STORAGE_QUOTA_BYTES") {
                Ok(raw) if raw == "unlimited" => None,
                Ok(raw) => Some(
                    raw.parse()
                        .context(
                            "ARBOR_STORAGE_QUOTA_BYTES must be a number of bytes or \"unlimited\"",
                        )?,
                ),
                Err(_) => defaults.storage_quota,
            },
            persistent_store: env::var("ARBOR_PERSISTENT_STORE").ok().map(PathBuf::from),
            random_seed: env::var("ARBOR_RANDOM_SEED")
                .ok()
                .map(|raw| raw.parse())
                .transpose()
                .context("ARBOR_RANDOM_SEED must be an unsigned integer")?,
        })
    }

    pub fn with_base_url(mut self, url: Url) -> Self {
        self.http_base_url = Some(url);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_timeout = timeout;
        self
    }

    pub fn with_storage_quota(mut self, quota: Option<usize>) -> Self {
        self.storage_quota = quota;
        self
    }

    pub fn with_persistent_store(mut self, path: impl Into<PathBuf>) -> Self {
        self.persistent_store = Some(path.into());
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = Some(seed);
        self
    }
}
