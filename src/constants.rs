/// Source API defaults
pub const DEFAULT_BASE_URL: &str = "https://pokeapi.co/api/v2";
pub const INDEX_RESOURCE: &str = "pokemon";
pub const DEFAULT_INDEX_LIMIT: usize = 999;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 32;

/// Retry defaults
pub const DEFAULT_RETRY_INTERVAL_SECS: u64 = 5;

/// Reachability probe defaults
pub const DEFAULT_PROBE_INTERVAL_SECS: u64 = 2;
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 1500;

pub const DEFAULT_CONFIG_PATH: &str = "catalog_sync.toml";
pub const DEFAULT_LOG_DIR: &str = "logs";

// Environment overrides (read after .env is loaded)
pub const ENV_BASE_URL: &str = "CATALOG_SYNC_BASE_URL";
pub const ENV_INDEX_LIMIT: &str = "CATALOG_SYNC_INDEX_LIMIT";
pub const ENV_RETRY_INTERVAL_SECS: &str = "CATALOG_SYNC_RETRY_INTERVAL_SECS";
pub const ENV_MAX_ATTEMPTS: &str = "CATALOG_SYNC_MAX_ATTEMPTS";

/// Build the index URL for a given page size
pub fn index_url(base_url: &str, limit: usize) -> String {
    format!(
        "{}/{}?limit={}",
        base_url.trim_end_matches('/'),
        INDEX_RESOURCE,
        limit
    )
}
