//! Search/filter overlay and page slicing
//!
//! Runs on every transition that touches items, search or filters:
//! `canonical_items -> display_items -> page_items`, with the metadata counts
//! and `has_more_items` derived in the same pass.

use chrono::{DateTime, Utc};

use crate::domain::{
    filter::FilterError,
    item::Item,
    search::SearchState,
};

use super::PaginationState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    Filter(FilterError),
    PageIndexZero,
    PageOutOfRange { page_index: usize, page_size: usize },
}

impl std::fmt::Display for OverlayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayError::Filter(e) => write!(f, "filter could not be applied: {e}"),
            OverlayError::PageIndexZero => write!(f, "page index must be at least 1"),
            OverlayError::PageOutOfRange {
                page_index,
                page_size,
            } => write!(
                f,
                "page {page_index} with page size {page_size} is out of addressable range"
            ),
        }
    }
}

impl std::error::Error for OverlayError {}

impl From<FilterError> for OverlayError {
    fn from(e: FilterError) -> Self {
        OverlayError::Filter(e)
    }
}

/// `display_items` for the given snapshot
///
/// An active search with results replaces filtering entirely; its ranking is
/// already final. A search whose results have not arrived yet falls back to
/// the filter path.
pub fn display_items(
    state: &PaginationState,
    reference: DateTime<Utc>,
) -> Result<Vec<Item>, OverlayError> {
    match &state.search_state {
        Some(SearchState {
            active: true,
            results: Some(results),
            ..
        }) => Ok(results.rank(&state.canonical_items)),
        _ => Ok(state
            .filter_state
            .apply(&state.canonical_items, reference)?),
    }
}

/// Exclusive end of page `page_index`, i.e. `page_index * page_size`
pub fn page_end(page_index: usize, page_size: usize) -> Result<usize, OverlayError> {
    page_index
        .checked_mul(page_size)
        .ok_or(OverlayError::PageOutOfRange {
            page_index,
            page_size,
        })
}

/// Slice `[(page_index - 1) * page_size, page_index * page_size)` of `items`
pub fn slice_page(
    items: &[Item],
    page_index: usize,
    page_size: usize,
) -> Result<Vec<Item>, OverlayError> {
    let previous = page_index.checked_sub(1).ok_or(OverlayError::PageIndexZero)?;
    let start = page_end(previous, page_size)?;
    let end = page_end(page_index, page_size)?.min(items.len());
    Ok(items.get(start..end).map(<[Item]>::to_vec).unwrap_or_default())
}

/// Rebuild the derived parts of `state`
///
/// `reference` anchors time-window filters. On error nothing is returned, so
/// the caller keeps its previous snapshot.
pub fn recompute(
    mut state: PaginationState,
    reference: DateTime<Utc>,
) -> Result<PaginationState, OverlayError> {
    let display = display_items(&state, reference)?;
    let page = slice_page(&display, state.current_page_index, state.page_size)?;
    let shown_through = page_end(state.current_page_index, state.page_size)?;

    state.has_more_items = display.len() > shown_through || state.remote_has_more;
    state.metadata.total_filtered_count = display.len();
    state.metadata.visible_filtered_count = page.len();
    state.display_items = display;
    state.page_items = page;

    Ok(state)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use rstest::*;

    use super::*;
    use crate::domain::{
        filter::{FilterState, SortBy, TimeWindow},
        item::{ContentKind, ItemId},
        search::ResultSet,
    };
    use crate::test_helpers::fixture_items;

    fn ids(items: &[Item]) -> Vec<String> {
        items.iter().map(|item| item.id.to_string()).collect()
    }

    #[fixture]
    fn state() -> PaginationState {
        let mut state = PaginationState::new(15);
        state.canonical_items = fixture_items(40);
        state
    }

    #[rstest]
    #[case(1, 15)]
    #[case(2, 15)]
    #[case(3, 10)]
    #[case(4, 0)]
    fn test_page_lengths(mut state: PaginationState, #[case] page: usize, #[case] expected: usize) {
        state.current_page_index = page;
        let next = recompute(state, Utc::now()).unwrap_or_else(|_| PaginationState::new(15));
        assert_eq!(next.page_items.len(), expected);
        assert_eq!(next.metadata.visible_filtered_count, expected);
        assert_eq!(next.metadata.total_filtered_count, 40);
    }

    #[rstest]
    fn test_has_more_items_counts_local_pages(mut state: PaginationState) {
        state.current_page_index = 2;
        let next = recompute(state, Utc::now());
        assert!(next.as_ref().is_ok_and(|next| next.has_more_items));

        let mut last = PaginationState::new(15);
        last.canonical_items = fixture_items(40);
        last.current_page_index = 3;
        let next = recompute(last.clone(), Utc::now());
        assert!(next.as_ref().is_ok_and(|next| !next.has_more_items));

        last.remote_has_more = true;
        let next = recompute(last, Utc::now());
        assert!(next.as_ref().is_ok_and(|next| next.has_more_items));
    }

    #[rstest]
    fn test_search_results_replace_filters(mut state: PaginationState) {
        state.filter_state = FilterState::default().with_kind(ContentKind::Playlist);
        state.search_state = Some(SearchState::new(
            "q",
            Some(ResultSet::new(vec![ItemId::new("item-7"), ItemId::new("item-2")])),
        ));

        let next = recompute(state, Utc::now()).unwrap_or_else(|_| PaginationState::new(15));
        assert_eq!(ids(&next.display_items), vec!["item-7", "item-2"]);
        assert!(!next.has_more_items);
    }

    #[rstest]
    fn test_pending_search_falls_back_to_filters(mut state: PaginationState) {
        state.filter_state = FilterState::default().with_sort(SortBy::Oldest);
        state.search_state = Some(SearchState::new("q", None));

        let next = recompute(state, Utc::now()).unwrap_or_else(|_| PaginationState::new(15));
        assert_eq!(next.display_items.len(), 40);
        assert_eq!(next.display_items.first().map(|i| i.id.as_str()), Some("item-39"));
    }

    #[rstest]
    fn test_zero_page_index_is_rejected(mut state: PaginationState) {
        state.current_page_index = 0;
        assert_eq!(recompute(state, Utc::now()), Err(OverlayError::PageIndexZero));
    }

    #[rstest]
    fn test_unrepresentable_window_is_rejected(mut state: PaginationState) {
        state.filter_state = FilterState::default().with_time_window(TimeWindow::Week);
        let result = recompute(state, DateTime::<Utc>::MIN_UTC + Duration::days(1));
        assert!(matches!(result, Err(OverlayError::Filter(_))));
    }

    #[test]
    fn test_page_arithmetic_overflow_is_rejected() {
        let items = fixture_items(3);
        assert!(matches!(
            slice_page(&items, usize::MAX, 2),
            Err(OverlayError::PageOutOfRange { .. })
        ));
    }
}
