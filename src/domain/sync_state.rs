use std::fmt;

/// Lifecycle of the catalog as seen by readers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncState {
    /// A load is running and no catalog has been published for it yet
    Loading,
    /// The catalog holds the result of the latest successful load
    Ready,
    /// The latest load failed; retries are armed until one succeeds
    Degraded { attempt: u32, last_error: String },
}

impl SyncState {
    pub fn is_ready(&self) -> bool {
        matches!(self, SyncState::Ready)
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, SyncState::Degraded { .. })
    }

    /// Stable numeric code, used for the state gauge
    pub fn code(&self) -> u8 {
        match self {
            SyncState::Loading => 0,
            SyncState::Ready => 1,
            SyncState::Degraded { .. } => 2,
        }
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Loading => write!(f, "loading"),
            SyncState::Ready => write!(f, "ready"),
            SyncState::Degraded {
                attempt,
                last_error,
            } => write!(f, "degraded (attempt {}): {}", attempt, last_error),
        }
    }
}
