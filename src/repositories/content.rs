use std::{
    sync::atomic::{AtomicUsize, Ordering},
    time::Duration,
};

use chrono::Utc;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::{
    core::error::FetchError,
    domain::{
        filter::FilterState,
        item::Item,
        search::{QueryMatcher, ResultSet},
    },
};

/// One page worth of request parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub filters: FilterState,
    pub search_query: Option<String>,
    pub offset: usize,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageResponse {
    pub items: Vec<Item>,
    /// Matches for the request's filters/search, across all pages
    pub total_count: usize,
    pub has_more: bool,
}

/// Remote store a feed pages through
///
/// Implementations only move data; gating, staleness and merging are the
/// manager's job.
pub trait ContentRepository: Send + Sync {
    fn fetch_page(&self, request: PageRequest) -> BoxFuture<'_, Result<PageResponse, FetchError>>;

    /// Ranked ids matching `query` under `filters`
    fn search<'a>(
        &'a self,
        query: &'a str,
        filters: &'a FilterState,
    ) -> BoxFuture<'a, Result<ResultSet, FetchError>>;
}

/// Repository over an in-memory item list
///
/// Stands in for the remote store in the demo binary and in tests. Latency and
/// periodic transport failures can be injected.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    items: Vec<Item>,
    latency: Duration,
    fail_every: usize,
    calls: AtomicUsize,
}

impl InMemoryRepository {
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fail every `n`th `fetch_page` call with a transport error; 0 disables
    pub fn with_fail_every(mut self, n: usize) -> Self {
        self.fail_every = n;
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn matching(&self, filters: &FilterState, query: Option<&str>) -> Result<Vec<Item>, FetchError> {
        let filtered = filters
            .apply(&self.items, Utc::now())
            .map_err(|e| FetchError::validation(e.to_string()))?;
        match query.map(str::trim).filter(|q| !q.is_empty()) {
            None => Ok(filtered),
            Some(query) => {
                let matcher =
                    QueryMatcher::new(query).map_err(|e| FetchError::validation(e.to_string()))?;
                Ok(matcher.rank(&filtered).into_iter().cloned().collect())
            }
        }
    }

    fn page(&self, request: &PageRequest) -> Result<PageResponse, FetchError> {
        if request.limit == 0 {
            return Err(FetchError::validation("limit must be positive"));
        }
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_every > 0 && call % self.fail_every == 0 {
            return Err(FetchError::transport(format!("simulated failure on call {call}")));
        }

        let matching = self.matching(&request.filters, request.search_query.as_deref())?;
        let total_count = matching.len();
        let end = request.offset.saturating_add(request.limit).min(total_count);
        let items = matching
            .get(request.offset..end)
            .map(<[Item]>::to_vec)
            .unwrap_or_default();
        Ok(PageResponse {
            has_more: end < total_count,
            items,
            total_count,
        })
    }
}

impl ContentRepository for InMemoryRepository {
    fn fetch_page(&self, request: PageRequest) -> BoxFuture<'_, Result<PageResponse, FetchError>> {
        Box::pin(async move {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            let response = self.page(&request);
            match &response {
                Ok(page) => tracing::debug!(
                    offset = request.offset,
                    returned = page.items.len(),
                    total = page.total_count,
                    "page served"
                ),
                Err(e) => tracing::debug!(offset = request.offset, "page failed: {e}"),
            }
            response
        })
    }

    fn search<'a>(
        &'a self,
        query: &'a str,
        filters: &'a FilterState,
    ) -> BoxFuture<'a, Result<ResultSet, FetchError>> {
        Box::pin(async move {
            if !self.latency.is_zero() {
                tokio::time::sleep(self.latency).await;
            }
            let matching = self.matching(filters, Some(query))?;
            Ok(ResultSet::new(
                matching.into_iter().map(|item| item.id).collect(),
            ))
        })
    }
}
