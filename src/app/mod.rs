pub mod bulk_loader;
pub mod connectivity;
pub mod filter;
pub mod ports;
pub mod sync_controller;

pub use bulk_loader::BulkLoader;
pub use connectivity::ConnectivityHub;
pub use filter::{FilterEngine, Predicate};
pub use sync_controller::{RetryTrigger, SyncController, SyncHandle, SyncOptions};
