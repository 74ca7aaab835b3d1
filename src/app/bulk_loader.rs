use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, instrument, warn};

use crate::app::ports::CatalogApiPort;
use crate::config::ApiConfig;
use crate::domain::{Catalog, CatalogRecord};
use crate::error::{Result, SyncError};
use crate::observability::metrics;

/// Builds a full catalog from one index request plus one detail request per
/// index entry.
///
/// Only the index request can fail the load. Detail failures drop the
/// affected record. Detail requests run concurrently but never more than
/// `max_in_flight` at a time.
pub struct BulkLoader {
    api: Arc<dyn CatalogApiPort>,
    limit: usize,
    max_in_flight: usize,
}

impl BulkLoader {
    pub fn new(api: Arc<dyn CatalogApiPort>, limit: usize, max_in_flight: usize) -> Self {
        Self {
            api,
            limit,
            max_in_flight: max_in_flight.max(1),
        }
    }

    pub fn from_config(api: Arc<dyn CatalogApiPort>, config: &ApiConfig) -> Self {
        Self::new(api, config.index_limit, config.max_in_flight)
    }

    /// Run one load. Records come back in index order.
    #[instrument(skip(self), fields(limit = self.limit))]
    pub async fn load(&self) -> Result<Catalog> {
        let started = Instant::now();

        let entries = match self.api.fetch_index(self.limit).await {
            Ok(entries) => entries,
            Err(e) => {
                metrics::loader::load_failed(started.elapsed().as_secs_f64());
                warn!("Index request failed: {}", e);
                return Err(SyncError::LoadFailed(e.to_string()));
            }
        };
        let total = entries.len().min(self.limit);
        debug!("Fetching {} detail records", total);

        let permits = Arc::new(Semaphore::new(self.max_in_flight));
        let mut tasks = JoinSet::new();
        for (position, entry) in entries.into_iter().take(self.limit).enumerate() {
            let api = Arc::clone(&self.api);
            let permits = Arc::clone(&permits);
            tasks.spawn(async move {
                // The semaphore is never closed, so this only waits
                let _permit = permits.acquire_owned().await.ok();
                let outcome = fetch_record(api.as_ref(), &entry.url).await;
                (position, outcome)
            });
        }

        let mut slots: Vec<Option<CatalogRecord>> = vec![None; total];
        let mut dropped = 0usize;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((position, Ok(record))) => slots[position] = Some(record),
                Ok((_, Err(e))) => {
                    dropped += 1;
                    debug!("Dropping record: {}", e);
                }
                Err(e) => {
                    dropped += 1;
                    warn!("Detail task did not complete: {}", e);
                }
            }
        }

        let catalog = Catalog::new(slots.into_iter().flatten().collect());
        let secs = started.elapsed().as_secs_f64();
        metrics::loader::details_dropped(dropped);
        metrics::loader::load_success(catalog.len(), secs);
        info!(
            "Loaded {} records ({} dropped, {} categories) in {:.2}s",
            catalog.len(),
            dropped,
            catalog.categories().len(),
            secs
        );
        Ok(catalog)
    }
}

async fn fetch_record(api: &dyn CatalogApiPort, locator: &str) -> Result<CatalogRecord> {
    let detail = api
        .fetch_detail(locator)
        .await
        .map_err(|e| SyncError::DetailFetchFailed {
            locator: locator.to_string(),
            reason: e.to_string(),
        })?;
    detail
        .into_record()
        .map_err(|reason| SyncError::DetailFetchFailed {
            locator: locator.to_string(),
            reason,
        })
}
