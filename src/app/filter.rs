//! Search and category filtering over a catalog.
//!
//! Criteria compile once into a [`Predicate`], which is then applied to every
//! record. Evaluation is pure and stable: matching records come back in input
//! order.

use std::collections::BTreeSet;

use crate::domain::{CatalogRecord, FilterCriteria};

/// Criteria normalized for per-record matching.
#[derive(Debug, Clone)]
pub struct Predicate {
    /// Trimmed, lower-cased search text
    term: String,
    /// `term` without its leading `#`
    clean_term: String,
    /// `clean_term` is an integer literal, of any length
    numeric_search: bool,
    /// Value of `clean_term` when it fits, for the exact-id comparison
    numeric: Option<i64>,
    categories: BTreeSet<String>,
    exclude: bool,
}

impl Predicate {
    pub fn compile(criteria: &FilterCriteria) -> Self {
        let term = criteria.search_text.trim().to_lowercase();
        let clean_term = term.strip_prefix('#').unwrap_or(&term).to_string();
        let numeric_search = is_integer_literal(&clean_term);
        let numeric = if numeric_search {
            clean_term.parse::<i64>().ok()
        } else {
            None
        };
        let categories = criteria
            .selected_categories
            .iter()
            .map(|c| c.trim().to_lowercase())
            .collect();

        Self {
            term,
            clean_term,
            numeric_search,
            numeric,
            categories,
            exclude: criteria.exclude_mode,
        }
    }

    fn matches_search(&self, record: &CatalogRecord) -> bool {
        let match_name = record.name.to_lowercase().contains(&self.term);
        let match_id = self.numeric_search
            && (record.id.to_string().contains(&self.clean_term)
                || self.numeric == Some(i64::from(record.id)));
        match_name || match_id
    }

    fn matches_category(&self, record: &CatalogRecord) -> bool {
        self.categories.is_empty()
            || record
                .categories
                .iter()
                .any(|c| self.categories.contains(&c.to_lowercase()))
    }

    pub fn is_numeric_search(&self) -> bool {
        self.numeric_search
    }

    pub fn matches(&self, record: &CatalogRecord) -> bool {
        if self.exclude {
            // An empty input never excludes anything
            let exclude_search = self.term.is_empty() || !self.matches_search(record);
            let exclude_category = self.categories.is_empty() || !self.matches_category(record);
            exclude_search && exclude_category
        } else {
            self.matches_search(record) && self.matches_category(record)
        }
    }
}

fn is_integer_literal(term: &str) -> bool {
    let digits = term.strip_prefix(|c: char| c == '+' || c == '-').unwrap_or(term);
    !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())
}

pub struct FilterEngine;

impl FilterEngine {
    /// Records matching `criteria`, in input order.
    pub fn evaluate<'a>(
        records: &'a [CatalogRecord],
        criteria: &FilterCriteria,
    ) -> Vec<&'a CatalogRecord> {
        let predicate = Predicate::compile(criteria);
        records.iter().filter(|r| predicate.matches(r)).collect()
    }
}
