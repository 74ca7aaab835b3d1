//! Response shapes of the source API.
//!
//! Field names follow PokéAPI (`types[].type.name`); the generic spellings
//! `categories[].category.name` are accepted as aliases so any API serving
//! the same layout can feed the loader.

use serde::Deserialize;

use super::catalog::CatalogRecord;

#[derive(Debug, Clone, Deserialize)]
pub struct IndexResponse {
    #[serde(default)]
    pub count: Option<u64>,
    pub results: Vec<IndexEntry>,
}

/// Lightweight reference returned by the index endpoint
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexEntry {
    pub name: String,
    /// Locator of the detail resource
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailRecord {
    pub id: u32,
    pub name: String,
    #[serde(rename = "types", alias = "categories", default)]
    pub categories: Vec<CategorySlot>,
    #[serde(default)]
    pub sprites: Sprites,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategorySlot {
    #[serde(rename = "type", alias = "category")]
    pub category: NamedRef,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedRef {
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Sprites {
    pub front_default: Option<String>,
    pub other: Option<OtherSprites>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OtherSprites {
    #[serde(rename = "official-artwork", alias = "official_artwork")]
    pub official_artwork: Option<SpriteRef>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpriteRef {
    pub front_default: Option<String>,
}

impl Sprites {
    /// Official artwork first, then the default sprite, then nothing.
    pub fn resolve_image(&self) -> String {
        let artwork = self
            .other
            .as_ref()
            .and_then(|o| o.official_artwork.as_ref())
            .and_then(|a| a.front_default.as_deref());

        artwork
            .filter(|s| !s.is_empty())
            .or_else(|| self.front_default.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or_default()
            .to_string()
    }
}

impl DetailRecord {
    /// Convert into a catalog record. Records that would break the catalog
    /// invariants (id 0, no categories) are rejected with a reason.
    pub fn into_record(self) -> Result<CatalogRecord, String> {
        if self.id == 0 {
            return Err(format!("record '{}' has id 0", self.name));
        }
        if self.categories.is_empty() {
            return Err(format!("record {} has no categories", self.id));
        }

        let image_ref = self.sprites.resolve_image();
        Ok(CatalogRecord {
            id: self.id,
            name: self.name,
            categories: self
                .categories
                .into_iter()
                .map(|slot| slot.category.name)
                .collect(),
            image_ref,
        })
    }
}
