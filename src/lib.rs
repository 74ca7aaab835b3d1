pub mod config;
pub mod constants;
pub mod error;
pub mod logging;

// Domain data shapes shared across layers
pub mod domain;

// Loader, filter and sync controller
pub mod app;

// HTTP client and reachability probe
pub mod infra;

pub mod observability;

pub use app::{BulkLoader, ConnectivityHub, FilterEngine, SyncController, SyncHandle, SyncOptions};
pub use domain::{Catalog, CatalogRecord, FilterCriteria, SyncState};
pub use error::{Result, SyncError};
