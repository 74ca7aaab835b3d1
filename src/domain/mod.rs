//! Data shapes shared across layers. No behavior beyond construction.

pub mod catalog;
pub mod criteria;
pub mod sync_state;
pub mod wire;

pub use catalog::{Catalog, CatalogRecord};
pub use criteria::FilterCriteria;
pub use sync_state::SyncState;
pub use wire::{DetailRecord, IndexEntry, IndexResponse};
