//! Load-more strategy resolver
//!
//! Decides whether the next page can be sliced out of data the feed already
//! holds or has to come from the remote store, and computes the effect of
//! either choice. Nothing here touches the manager; the manager decides what
//! to do with the snapshots returned.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

use crate::{
    core::error::{ErrorKind, FetchError},
    domain::item::Item,
    model::pagination::{
        overlay::{self, OverlayError},
        PaginationMode, PaginationState,
    },
    repositories::content::{ContentRepository, PageRequest, PageResponse},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Strategy {
    /// Next page is already held in `display_items`
    ClientPaginate,
    /// Next page needs a remote fetch
    ServerFetch,
}

/// Result of one load-more
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadMoreOutcome {
    pub success: bool,
    pub strategy_used: Strategy,
    pub new_items: Vec<Item>,
    pub has_more_items: bool,
    pub error: Option<ErrorKind>,
}

impl LoadMoreOutcome {
    pub fn succeeded(strategy_used: Strategy, new_items: Vec<Item>, has_more_items: bool) -> Self {
        Self {
            success: true,
            strategy_used,
            new_items,
            has_more_items,
            error: None,
        }
    }

    pub fn failed(strategy_used: Strategy, has_more_items: bool, error: ErrorKind) -> Self {
        Self {
            success: false,
            strategy_used,
            new_items: Vec::new(),
            has_more_items,
            error: Some(error),
        }
    }
}

/// Whether the next page can be produced by slicing
pub fn can_client_paginate(state: &PaginationState) -> bool {
    state.pagination_mode == PaginationMode::Client
        && overlay::page_end(state.current_page_index, state.page_size)
            .is_ok_and(|shown_through| state.display_items.len() > shown_through)
}

/// Strategy for the next load-more, or `None` when nothing can produce a page
pub fn resolve(state: &PaginationState) -> Option<Strategy> {
    if can_client_paginate(state) {
        Some(Strategy::ClientPaginate)
    } else if state.pagination_mode == PaginationMode::Server || state.has_more_items {
        Some(Strategy::ServerFetch)
    } else {
        None
    }
}

/// Advance one page over held data
pub fn client_paginate(
    state: &PaginationState,
    reference: DateTime<Utc>,
) -> Result<(PaginationState, LoadMoreOutcome), OverlayError> {
    let mut next = state.clone();
    next.current_page_index = state
        .current_page_index
        .checked_add(1)
        .ok_or(OverlayError::PageOutOfRange {
            page_index: state.current_page_index,
            page_size: state.page_size,
        })?;
    let next = overlay::recompute(next, reference)?;
    let outcome = LoadMoreOutcome::succeeded(
        Strategy::ClientPaginate,
        next.page_items.clone(),
        next.has_more_items,
    );
    Ok((next, outcome))
}

/// Request for the batch following everything already loaded
pub fn page_request(state: &PaginationState) -> PageRequest {
    PageRequest {
        filters: state.filter_state.clone(),
        search_query: state.search_query().map(str::to_owned),
        offset: state.metadata.loaded_remote_count,
        limit: state.page_size,
    }
}

/// Issue the remote fetch; the only suspension point of a load-more
pub async fn server_fetch(
    repository: &dyn ContentRepository,
    request: PageRequest,
) -> Result<PageResponse, FetchError> {
    tracing::debug!(offset = request.offset, limit = request.limit, "fetching page");
    repository.fetch_page(request).await
}

/// Merge a fetched batch into `state` and show the first page with unseen items
///
/// The current page is kept while it is short, otherwise the next one is shown.
/// `loaded_remote_count` advances by everything the remote store returned.
///
/// Items already held (by id) are dropped from the batch. A batch that adds
/// nothing marks the remote side as exhausted so an empty answer cannot keep
/// `has_more_items` true forever.
pub fn merge_page(
    state: &PaginationState,
    response: PageResponse,
    fetched_at: DateTime<Utc>,
    reference: DateTime<Utc>,
) -> Result<(PaginationState, LoadMoreOutcome), OverlayError> {
    let mut next = state.clone();
    let returned = response.items.len();
    let held: HashSet<_> = state.canonical_items.iter().map(|item| &item.id).collect();
    let new_items: Vec<Item> = response
        .items
        .into_iter()
        .filter(|item| !held.contains(&item.id))
        .collect();

    next.total_remote_count = response.total_count;
    next.remote_has_more = response.has_more && !new_items.is_empty();
    if response.has_more && new_items.is_empty() {
        tracing::warn!(
            offset = state.metadata.loaded_remote_count,
            "remote store reported more items but returned none new"
        );
    }
    // A short current page is filled in place; only a full one moves on.
    let current_page_full = state.display_items.len()
        >= overlay::page_end(state.current_page_index, state.page_size)?;
    if !new_items.is_empty() && current_page_full {
        next.current_page_index =
            state
                .current_page_index
                .checked_add(1)
                .ok_or(OverlayError::PageOutOfRange {
                    page_index: state.current_page_index,
                    page_size: state.page_size,
                })?;
    }
    next.canonical_items.extend(new_items.iter().cloned());
    next.metadata.loaded_remote_count = state.metadata.loaded_remote_count.saturating_add(returned);
    next.metadata.current_batch_number = state.metadata.current_batch_number.saturating_add(1);
    next.metadata.last_fetch_timestamp = Some(fetched_at);

    let next = overlay::recompute(next, reference)?;
    let outcome = LoadMoreOutcome::succeeded(Strategy::ServerFetch, new_items, next.has_more_items);
    Ok((next, outcome))
}
