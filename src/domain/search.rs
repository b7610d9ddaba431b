use std::collections::{HashMap, HashSet};

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use super::item::{Item, ItemId};

/// Ranked ids returned by the search backend
///
/// `ids` is already in ranking order; `total` is the number of matches the
/// backend knows about, which may exceed `ids.len()`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    pub ids: Vec<ItemId>,
    pub total: usize,
}

impl ResultSet {
    pub fn new(ids: Vec<ItemId>) -> Self {
        let total = ids.len();
        Self { ids, total }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Items of `canonical` that appear in this result set, in ranking order
    ///
    /// Ids unknown to `canonical` and repeated ids are skipped.
    pub fn rank(&self, canonical: &[Item]) -> Vec<Item> {
        let by_id: HashMap<&ItemId, &Item> = canonical.iter().map(|item| (&item.id, item)).collect();
        let mut seen = HashSet::new();
        self.ids
            .iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| by_id.get(id).map(|item| (*item).clone()))
            .collect()
    }
}

/// Search overlay installed on a feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchState {
    pub active: bool,
    pub query: String,
    /// `None` while the backend has not answered yet
    pub results: Option<ResultSet>,
}

impl SearchState {
    pub fn new(query: impl Into<String>, results: Option<ResultSet>) -> Self {
        Self {
            active: true,
            query: query.into(),
            results,
        }
    }
}

/// Case-insensitive literal matcher used to rank items for a query
#[derive(Debug, Clone)]
pub struct QueryMatcher {
    pattern: Regex,
}

impl QueryMatcher {
    pub fn new(query: &str) -> Result<Self, regex::Error> {
        let pattern = RegexBuilder::new(&regex::escape(query.trim()))
            .case_insensitive(true)
            .build()?;
        Ok(Self { pattern })
    }

    /// Relevance of `item`, or `None` when it does not match
    ///
    /// Title matches outrank author-only matches.
    pub fn score(&self, item: &Item) -> Option<u8> {
        if self.pattern.is_match(&item.title) {
            Some(2)
        } else if self.pattern.is_match(&item.author) {
            Some(1)
        } else {
            None
        }
    }

    /// Matching items ordered by score; ties keep their input order
    pub fn rank<'a>(&self, items: impl IntoIterator<Item = &'a Item>) -> Vec<&'a Item> {
        let mut scored: Vec<(u8, &Item)> = items
            .into_iter()
            .filter_map(|item| self.score(item).map(|score| (score, item)))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        scored.into_iter().map(|(_, item)| item).collect()
    }
}
