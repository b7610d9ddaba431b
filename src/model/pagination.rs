//! Pagination snapshot of a single feed instance

pub mod overlay;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

use crate::domain::{filter::FilterState, item::Item, search::SearchState};

/// Where the next page comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PaginationMode {
    /// Pages are sliced out of `display_items`
    Client,
    /// Every page needs a remote fetch
    #[default]
    Server,
}

/// The two loading flags of a snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum LoadingFlag {
    Fetch,
    LoadMore,
}

/// Bookkeeping that travels with every snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// Items received from the remote store so far
    pub loaded_remote_count: usize,
    /// Number of remote batches merged into `canonical_items`
    pub current_batch_number: usize,
    pub last_fetch_timestamp: Option<DateTime<Utc>>,
    /// Length of `display_items`
    pub total_filtered_count: usize,
    /// Length of `page_items`; kept equal on every transition
    pub visible_filtered_count: usize,
    pub filter_applied_at_timestamp: Option<DateTime<Utc>>,
}

/// Immutable view of one feed
///
/// Snapshots are never edited once published. The manager clones the current
/// one, changes what the intent asks for and runs [`overlay::recompute`]
/// before publishing the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaginationState {
    /// Server-ordered superset used for client pagination
    pub canonical_items: Vec<Item>,
    /// `canonical_items` after the search or filter overlay
    pub display_items: Vec<Item>,
    /// Visible slice of `display_items`
    pub page_items: Vec<Item>,
    pub page_size: usize,
    /// 1-based
    pub current_page_index: usize,
    pub total_remote_count: usize,
    /// Another load-more would produce items, locally or remotely
    pub has_more_items: bool,
    /// Last `has_more` the remote store reported
    pub remote_has_more: bool,
    pub fetch_in_flight: bool,
    pub load_more_in_flight: bool,
    pub search_state: Option<SearchState>,
    pub filter_state: FilterState,
    pub pagination_mode: PaginationMode,
    pub metadata: Metadata,
    /// Bumped whenever outstanding fetches stop being relevant
    pub generation: u64,
}

impl PaginationState {
    /// Empty snapshot for a freshly mounted feed
    pub fn new(page_size: usize) -> Self {
        Self {
            canonical_items: Vec::new(),
            display_items: Vec::new(),
            page_items: Vec::new(),
            page_size,
            current_page_index: 1,
            total_remote_count: 0,
            has_more_items: false,
            remote_has_more: false,
            fetch_in_flight: false,
            load_more_in_flight: false,
            search_state: None,
            filter_state: FilterState::default(),
            pagination_mode: PaginationMode::Server,
            metadata: Metadata::default(),
            generation: 0,
        }
    }

    pub fn is_search_active(&self) -> bool {
        self.search_state.as_ref().is_some_and(|search| search.active)
    }

    pub fn search_query(&self) -> Option<&str> {
        self.search_state
            .as_ref()
            .filter(|search| search.active)
            .map(|search| search.query.as_str())
    }

    pub fn is_loading(&self) -> bool {
        self.fetch_in_flight || self.load_more_in_flight
    }

    pub fn loading_flag(&self, flag: LoadingFlag) -> bool {
        match flag {
            LoadingFlag::Fetch => self.fetch_in_flight,
            LoadingFlag::LoadMore => self.load_more_in_flight,
        }
    }

    /// Page count implied by `total_remote_count`, when it is known and positive
    pub fn total_pages(&self) -> Option<usize> {
        if self.total_remote_count == 0 || self.page_size == 0 {
            return None;
        }
        Some(self.total_remote_count.div_ceil(self.page_size))
    }

    /// Size used by the client/server mode heuristic
    ///
    /// While a search with results is active the backend's match count wins,
    /// otherwise the remote total.
    pub fn known_result_count(&self) -> Option<usize> {
        match &self.search_state {
            Some(SearchState {
                active: true,
                results: Some(results),
                ..
            }) => Some(results.total),
            _ if self.total_remote_count > 0 || self.metadata.last_fetch_timestamp.is_some() => {
                Some(self.total_remote_count)
            }
            _ => None,
        }
    }

    /// Whether the held items depend on the query sent to the remote store
    ///
    /// True once anything was fetched, or while the remote store holds items
    /// past the held ones. Such a set cannot be re-filtered locally.
    pub fn holds_remote_window(&self) -> bool {
        self.remote_has_more || self.metadata.last_fetch_timestamp.is_some()
    }

    /// Drop held items so the next fetch starts at offset 0 of the current query
    pub fn restart_remote_cursor(&mut self) {
        self.canonical_items.clear();
        self.total_remote_count = 0;
        self.remote_has_more = true;
        self.metadata.loaded_remote_count = 0;
        self.metadata.current_batch_number = 0;
        self.metadata.last_fetch_timestamp = None;
    }

    /// Copy of this snapshot with every outstanding fetch invalidated
    ///
    /// Used by intents that change what the feed shows: the generation is
    /// bumped, loading flags are cleared and paging restarts at page 1.
    pub fn reconfigured(&self) -> Self {
        Self {
            generation: self.generation.wrapping_add(1),
            fetch_in_flight: false,
            load_more_in_flight: false,
            current_page_index: 1,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::*;

    use super::*;
    use crate::domain::search::ResultSet;

    #[test]
    fn test_new_snapshot_is_empty_server_mode() {
        let state = PaginationState::new(15);
        assert!(state.canonical_items.is_empty());
        assert_eq!(state.current_page_index, 1);
        assert_eq!(state.pagination_mode, PaginationMode::Server);
        assert!(!state.is_loading());
        assert_eq!(state.known_result_count(), None);
    }

    #[rstest]
    #[case(0, 15, None)]
    #[case(40, 15, Some(3))]
    #[case(45, 15, Some(3))]
    #[case(46, 15, Some(4))]
    #[case(10, 0, None)]
    fn test_total_pages(#[case] total: usize, #[case] page_size: usize, #[case] expected: Option<usize>) {
        let mut state = PaginationState::new(page_size);
        state.total_remote_count = total;
        assert_eq!(state.total_pages(), expected);
    }

    #[test]
    fn test_known_result_count_prefers_search_total() {
        let mut state = PaginationState::new(15);
        state.total_remote_count = 500;
        assert_eq!(state.known_result_count(), Some(500));

        state.search_state = Some(SearchState::new(
            "jazz",
            Some(ResultSet {
                ids: vec![],
                total: 12,
            }),
        ));
        assert_eq!(state.known_result_count(), Some(12));
        assert_eq!(state.search_query(), Some("jazz"));
    }

    #[test]
    fn test_reconfigured_invalidates_fetches() {
        let mut state = PaginationState::new(15);
        state.current_page_index = 3;
        state.load_more_in_flight = true;
        state.generation = 7;

        let next = state.reconfigured();
        assert_eq!(next.generation, 8);
        assert_eq!(next.current_page_index, 1);
        assert!(!next.load_more_in_flight);
        assert!(!next.fetch_in_flight);
        assert!(state.load_more_in_flight, "source snapshot is untouched");
    }

    #[test]
    fn test_restart_remote_cursor_drops_fetched_window() {
        let mut state = PaginationState::new(15);
        assert!(!state.holds_remote_window());

        state.canonical_items = crate::test_helpers::fixture_items(30);
        state.total_remote_count = 300;
        state.metadata.loaded_remote_count = 30;
        state.metadata.current_batch_number = 2;
        state.metadata.last_fetch_timestamp = Some(Utc::now());
        assert!(state.holds_remote_window());

        state.restart_remote_cursor();
        assert!(state.canonical_items.is_empty());
        assert!(state.remote_has_more);
        assert_eq!(state.metadata.loaded_remote_count, 0);
        assert_eq!(state.metadata.current_batch_number, 0);
        assert_eq!(state.known_result_count(), None);
    }
}
