//! Fixtures shared by unit tests, integration tests and benches

use std::{collections::VecDeque, sync::Mutex};

use chrono::{Duration, Utc};
use futures::future::BoxFuture;
use tokio::sync::oneshot;

use crate::{
    core::error::FetchError,
    domain::{
        filter::FilterState,
        item::{ContentKind, Item},
        search::ResultSet,
    },
    repositories::content::{ContentRepository, PageRequest, PageResponse},
};

/// `n` items in server order: `item-0` is the newest, one minute apart
///
/// Kinds rotate post, track, playlist; like and play counts vary so every
/// sort order produces a different arrangement.
pub fn fixture_items(n: usize) -> Vec<Item> {
    fixture_items_from(0, n)
}

/// Like [`fixture_items`] but numbering starts at `start`
pub fn fixture_items_from(start: usize, n: usize) -> Vec<Item> {
    let now = Utc::now();
    (start..start + n)
        .map(|i| {
            let kind = match i % 3 {
                0 => ContentKind::Post,
                1 => ContentKind::Track,
                _ => ContentKind::Playlist,
            };
            Item::new(
                format!("item-{i}"),
                kind,
                format!("{kind} item-{i}"),
                format!("author-{}", i % 4),
                now - Duration::minutes(i as i64),
            )
            .with_likes((i * 7 % 11) as u64)
            .with_plays((i * 5 % 13) as u64)
        })
        .collect()
}

/// Repository whose answers are released by the test
///
/// Every `fetch_page` call records its request and parks on a oneshot
/// channel; [`ScriptedRepository::respond`] completes the oldest parked call.
#[derive(Default)]
pub struct ScriptedRepository {
    requests: Mutex<Vec<PageRequest>>,
    pending: Mutex<VecDeque<oneshot::Sender<Result<PageResponse, FetchError>>>>,
    search_results: Mutex<Option<ResultSet>>,
}

impl ScriptedRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|pending| pending.len()).unwrap_or(0)
    }

    /// Complete the oldest outstanding fetch; `false` if none was waiting
    pub fn respond(&self, response: Result<PageResponse, FetchError>) -> bool {
        let sender = self
            .pending
            .lock()
            .ok()
            .and_then(|mut pending| pending.pop_front());
        match sender {
            Some(sender) => sender.send(response).is_ok(),
            None => false,
        }
    }

    pub fn set_search_results(&self, results: ResultSet) {
        if let Ok(mut slot) = self.search_results.lock() {
            *slot = Some(results);
        }
    }
}

impl ContentRepository for ScriptedRepository {
    fn fetch_page(&self, request: PageRequest) -> BoxFuture<'_, Result<PageResponse, FetchError>> {
        let (tx, rx) = oneshot::channel();
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        if let Ok(mut pending) = self.pending.lock() {
            pending.push_back(tx);
        }
        Box::pin(async move {
            rx.await
                .unwrap_or_else(|_| Err(FetchError::transport("scripted response dropped")))
        })
    }

    fn search<'a>(
        &'a self,
        _query: &'a str,
        _filters: &'a FilterState,
    ) -> BoxFuture<'a, Result<ResultSet, FetchError>> {
        let results = self
            .search_results
            .lock()
            .ok()
            .and_then(|slot| slot.clone());
        Box::pin(async move { results.ok_or_else(|| FetchError::validation("no scripted results")) })
    }
}

/// Response holding `items` out of `total_count`
pub fn page_response(items: Vec<Item>, total_count: usize, has_more: bool) -> PageResponse {
    PageResponse {
        items,
        total_count,
        has_more,
    }
}
