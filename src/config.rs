use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::constants;
use crate::error::{Result, SyncError};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub sync: SyncConfig,
    pub connectivity: ConnectivityConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub index_limit: usize,
    pub request_timeout_secs: u64,
    /// Upper bound on detail requests in flight during one load
    pub max_in_flight: usize,
    /// Honor HTTP(S)_PROXY from the environment
    pub use_system_proxy: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: constants::DEFAULT_BASE_URL.to_string(),
            index_limit: constants::DEFAULT_INDEX_LIMIT,
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT_SECS,
            max_in_flight: constants::DEFAULT_MAX_IN_FLIGHT,
            use_system_proxy: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub retry_interval_secs: u64,
    /// `None` retries forever
    pub max_attempts: Option<u32>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retry_interval_secs: constants::DEFAULT_RETRY_INTERVAL_SECS,
            max_attempts: None,
        }
    }
}

impl SyncConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectivityConfig {
    pub enabled: bool,
    pub probe_interval_secs: u64,
    pub probe_timeout_ms: u64,
}

impl Default for ConnectivityConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            probe_interval_secs: constants::DEFAULT_PROBE_INTERVAL_SECS,
            probe_timeout_ms: constants::DEFAULT_PROBE_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file, then apply environment overrides.
    /// A missing file is not an error; defaults are used instead.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let content = fs::read_to_string(path).map_err(|e| {
                SyncError::Config(format!(
                    "Failed to read config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
            toml::from_str::<Config>(&content)?
        } else {
            Config::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from any key lookup (the process environment in production).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(constants::ENV_BASE_URL) {
            self.api.base_url = url;
        }
        if let Some(raw) = lookup(constants::ENV_INDEX_LIMIT) {
            self.api.index_limit = parse_override(constants::ENV_INDEX_LIMIT, &raw)?;
        }
        if let Some(raw) = lookup(constants::ENV_RETRY_INTERVAL_SECS) {
            self.sync.retry_interval_secs =
                parse_override(constants::ENV_RETRY_INTERVAL_SECS, &raw)?;
        }
        if let Some(raw) = lookup(constants::ENV_MAX_ATTEMPTS) {
            self.sync.max_attempts = Some(parse_override(constants::ENV_MAX_ATTEMPTS, &raw)?);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(SyncError::Config("api.base_url must not be empty".into()));
        }
        if self.api.max_in_flight == 0 {
            return Err(SyncError::Config("api.max_in_flight must be at least 1".into()));
        }
        if self.sync.retry_interval_secs == 0 {
            return Err(SyncError::Config(
                "sync.retry_interval_secs must be at least 1".into(),
            ));
        }
        if self.sync.max_attempts == Some(0) {
            return Err(SyncError::Config("sync.max_attempts must be at least 1".into()));
        }
        Ok(())
    }
}

fn parse_override<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| SyncError::Config(format!("invalid value for {}: '{}'", key, raw)))
}
