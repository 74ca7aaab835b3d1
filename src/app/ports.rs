use async_trait::async_trait;

use crate::domain::{DetailRecord, IndexEntry};
use crate::error::Result;

/// Read-only access to the source API.
///
/// Implementations report transport errors, non-success statuses and
/// malformed bodies as errors; deciding which of those are fatal is the
/// loader's job.
#[async_trait]
pub trait CatalogApiPort: Send + Sync {
    /// Fetch up to `limit` references from the index endpoint.
    async fn fetch_index(&self, limit: usize) -> Result<Vec<IndexEntry>>;

    /// Fetch one detail record by the locator taken from an index entry.
    async fn fetch_detail(&self, locator: &str) -> Result<DetailRecord>;
}
