#![allow(dead_code)]

use async_trait::async_trait;
use catalog_sync::app::ports::CatalogApiPort;
use catalog_sync::domain::{DetailRecord, IndexEntry};
use catalog_sync::{Result, SyncError};
use serde_json::json;
use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory source whose index calls fail according to a script.
pub struct ScriptedApi {
    /// One entry per index call: `false` fails it. Empty means succeed.
    index_script: Mutex<VecDeque<bool>>,
    records: Mutex<Vec<(u32, String, Vec<String>)>>,
    failing_details: Mutex<HashSet<u32>>,
    /// How long each index call takes before answering
    index_delay: Duration,
    index_calls: AtomicUsize,
}

impl ScriptedApi {
    pub fn new(records: &[(u32, &str, &[&str])]) -> Self {
        let api = Self {
            index_script: Mutex::new(VecDeque::new()),
            records: Mutex::new(Vec::new()),
            failing_details: Mutex::new(HashSet::new()),
            index_delay: Duration::ZERO,
            index_calls: AtomicUsize::new(0),
        };
        api.set_records(records);
        api
    }

    /// Records `1..=count` named `mon-N`, cycling through three categories.
    pub fn numbered(count: u32) -> Self {
        let api = Self::new(&[]);
        let categories = ["grass", "fire", "water"];
        *api.records.lock().unwrap() = (1..=count)
            .map(|id| {
                (
                    id,
                    format!("mon-{}", id),
                    vec![categories[id as usize % 3].to_string()],
                )
            })
            .collect();
        api
    }

    pub fn fail_index_times(self, times: usize) -> Self {
        self.index_script
            .lock()
            .unwrap()
            .extend(std::iter::repeat(false).take(times));
        self
    }

    pub fn fail_details(self, ids: &[u32]) -> Self {
        self.failing_details.lock().unwrap().extend(ids);
        self
    }

    pub fn with_index_delay(mut self, delay: Duration) -> Self {
        self.index_delay = delay;
        self
    }

    pub fn set_records(&self, records: &[(u32, &str, &[&str])]) {
        *self.records.lock().unwrap() = records
            .iter()
            .map(|(id, name, cats)| {
                (
                    *id,
                    name.to_string(),
                    cats.iter().map(|c| c.to_string()).collect(),
                )
            })
            .collect();
    }

    pub fn index_calls(&self) -> usize {
        self.index_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogApiPort for ScriptedApi {
    async fn fetch_index(&self, limit: usize) -> Result<Vec<IndexEntry>> {
        self.index_calls.fetch_add(1, Ordering::SeqCst);
        if !self.index_delay.is_zero() {
            tokio::time::sleep(self.index_delay).await;
        }
        let succeed = self.index_script.lock().unwrap().pop_front().unwrap_or(true);
        if !succeed {
            return Err(SyncError::Status {
                url: "http://scripted/pokemon".into(),
                status: 503,
            });
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .take(limit)
            .map(|(id, name, _)| IndexEntry {
                name: name.clone(),
                url: format!("http://scripted/pokemon/{}", id),
            })
            .collect())
    }

    async fn fetch_detail(&self, locator: &str) -> Result<DetailRecord> {
        let id: u32 = locator.rsplit('/').next().unwrap().parse().unwrap();
        if self.failing_details.lock().unwrap().contains(&id) {
            return Err(SyncError::Status {
                url: locator.to_string(),
                status: 500,
            });
        }
        let (_, name, categories) = self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|(rid, _, _)| *rid == id)
            .cloned()
            .unwrap();
        let types: Vec<_> = categories
            .iter()
            .map(|c| json!({"type": {"name": c}}))
            .collect();
        Ok(serde_json::from_value(json!({
            "id": id,
            "name": name,
            "types": types,
            "sprites": {"front_default": format!("{}.png", id)}
        }))
        .unwrap())
    }
}
