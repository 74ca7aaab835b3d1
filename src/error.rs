use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    /// The bulk index request failed. Fatal to the current load attempt.
    #[error("index fetch failed: {0}")]
    LoadFailed(String),

    /// One detail request failed. The loader drops the record and moves on.
    #[error("detail fetch failed for {locator}: {reason}")]
    DetailFetchFailed { locator: String, reason: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("JSON deserialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("sync controller has shut down")]
    ControllerClosed,
}

pub type Result<T> = std::result::Result<T, SyncError>;
