//! Metrics for the catalog loader and sync controller
//!
//! Recording goes through the `metrics` facade; without an installed
//! recorder every call is a no-op, so library users and tests pay nothing.

use std::fmt;
use std::net::SocketAddr;
use tracing::info;

/// Every metric the crate emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Loader metrics
    LoadsSuccess,
    LoadsFailed,
    DetailDropped,
    RecordsLoaded,
    LoadDuration,

    // Sync controller metrics
    RetriesTotal,
    SyncState,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::LoadsSuccess => "catalog_sync_loads_success_total",
            MetricName::LoadsFailed => "catalog_sync_loads_failed_total",
            MetricName::DetailDropped => "catalog_sync_detail_dropped_total",
            MetricName::RecordsLoaded => "catalog_sync_records_loaded",
            MetricName::LoadDuration => "catalog_sync_load_duration_seconds",

            MetricName::RetriesTotal => "catalog_sync_retries_total",
            MetricName::SyncState => "catalog_sync_state",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            LoadsSuccess,
            LoadsFailed,
            DetailDropped,
            RecordsLoaded,
            LoadDuration,
            RetriesTotal,
            SyncState,
        ]
        .into_iter()
    }

    /// (phase, description)
    pub fn metadata(&self) -> (&'static str, &'static str) {
        match self {
            MetricName::LoadsSuccess => ("loader", "Bulk loads that produced a catalog"),
            MetricName::LoadsFailed => ("loader", "Bulk loads that failed on the index request"),
            MetricName::DetailDropped => ("loader", "Detail records dropped after a failed fetch"),
            MetricName::RecordsLoaded => ("loader", "Records in the latest loaded catalog"),
            MetricName::LoadDuration => ("loader", "Bulk load duration in seconds"),
            MetricName::RetriesTotal => ("sync", "Retry attempts by trigger"),
            MetricName::SyncState => ("sync", "Current sync state (0 loading, 1 ready, 2 degraded)"),
        }
    }
}

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
/// Must be called from inside a tokio runtime.
pub fn init(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error>> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus recorder: {}", e))?;

    for name in MetricName::all_metrics() {
        let (_, help) = name.metadata();
        match name {
            MetricName::RecordsLoaded | MetricName::SyncState => {
                ::metrics::describe_gauge!(name.as_str(), help)
            }
            MetricName::LoadDuration => ::metrics::describe_histogram!(name.as_str(), help),
            _ => ::metrics::describe_counter!(name.as_str(), help),
        }
    }

    info!("Metrics exporter listening on {}", addr);
    Ok(())
}

// ============================================================================
// Loader Metrics
// ============================================================================

pub mod loader {
    use super::MetricName;

    pub fn load_success(records: usize, secs: f64) {
        ::metrics::counter!(MetricName::LoadsSuccess.as_str()).increment(1);
        ::metrics::gauge!(MetricName::RecordsLoaded.as_str()).set(records as f64);
        ::metrics::histogram!(MetricName::LoadDuration.as_str()).record(secs);
    }

    pub fn load_failed(secs: f64) {
        ::metrics::counter!(MetricName::LoadsFailed.as_str()).increment(1);
        ::metrics::histogram!(MetricName::LoadDuration.as_str()).record(secs);
    }

    pub fn details_dropped(count: usize) {
        if count > 0 {
            ::metrics::counter!(MetricName::DetailDropped.as_str()).increment(count as u64);
        }
    }
}

// ============================================================================
// Sync Metrics
// ============================================================================

pub mod sync {
    use super::MetricName;
    use crate::domain::SyncState;

    pub fn retry(trigger: &'static str) {
        ::metrics::counter!(MetricName::RetriesTotal.as_str(), "trigger" => trigger).increment(1);
    }

    pub fn state(state: &SyncState) {
        ::metrics::gauge!(MetricName::SyncState.as_str()).set(state.code() as f64);
    }
}
