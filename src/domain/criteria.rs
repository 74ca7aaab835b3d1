use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// User-editable filter inputs. Selected categories need not exist in the
/// current catalog; a stale selection simply matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub search_text: String,
    pub selected_categories: BTreeSet<String>,
    pub exclude_mode: bool,
}

impl FilterCriteria {
    pub fn with_search(mut self, text: impl Into<String>) -> Self {
        self.search_text = text.into();
        self
    }

    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.selected_categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn excluding(mut self, exclude: bool) -> Self {
        self.exclude_mode = exclude;
        self
    }

    /// Select the category if it is not selected yet, otherwise deselect it.
    pub fn toggle_category(&mut self, category: &str) {
        if !self.selected_categories.remove(category) {
            self.selected_categories.insert(category.to_string());
        }
    }
}
