use crate::app::ports::CatalogApiPort;
use crate::config::ApiConfig;
use crate::constants;
use crate::domain::{DetailRecord, IndexEntry, IndexResponse};
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// `CatalogApiPort` over HTTP.
pub struct ReqwestCatalogApi {
    client: reqwest::Client,
    base_url: String,
}

impl ReqwestCatalogApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("catalog_sync/", env!("CARGO_PKG_VERSION")));
        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SyncError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl CatalogApiPort for ReqwestCatalogApi {
    async fn fetch_index(&self, limit: usize) -> Result<Vec<IndexEntry>> {
        let url = constants::index_url(&self.base_url, limit);
        let index: IndexResponse = self.get_json(&url).await?;
        debug!(
            "Index returned {} entries (source reports {:?} total)",
            index.results.len(),
            index.count
        );
        Ok(index.results.into_iter().take(limit).collect())
    }

    async fn fetch_detail(&self, locator: &str) -> Result<DetailRecord> {
        self.get_json(locator).await
    }
}
