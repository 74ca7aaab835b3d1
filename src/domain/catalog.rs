use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One entity of the catalog, built from a single detail response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: u32,
    pub name: String,
    /// Display order as served by the API; matching ignores order.
    pub categories: Vec<String>,
    /// Artwork URL, or empty when the source supplies none
    pub image_ref: String,
}

impl CatalogRecord {
    /// `#025` style identifier.
    pub fn display_id(&self) -> String {
        format!("#{:03}", self.id)
    }
}

/// An immutable snapshot of the loaded records and the categories they use.
///
/// The category set is a projection of the records and is only ever computed
/// here, so the two cannot drift apart. Snapshots are replaced whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    records: Vec<CatalogRecord>,
    categories: BTreeSet<String>,
}

impl Catalog {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        let categories = records
            .iter()
            .flat_map(|r| r.categories.iter().cloned())
            .collect();
        Self {
            records,
            categories,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn categories(&self) -> &BTreeSet<String> {
        &self.categories
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
