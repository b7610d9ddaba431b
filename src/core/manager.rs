//! Pagination manager
//!
//! The facade a view layer talks to. Every intent follows the same path:
//!
//! 1. refuse it if a subscriber notification is running (reentrancy guard)
//! 2. consult the load-more machine when the intent is a load-more
//! 3. build the next snapshot from the current one, recomputing the overlay
//! 4. publish the snapshot and notify subscribers
//!
//! A failure in step 3 aborts the intent and the previous snapshot stays
//! authoritative. The manager is single-threaded by construction (`Rc`
//! inside): all mutations run to completion between suspension points and the
//! only suspension point is a repository fetch.

use std::{
    cell::{Cell, RefCell},
    rc::Rc,
    sync::Arc,
};

use chrono::{DateTime, Utc};

use crate::{
    core::{
        error::{ErrorKind, FetchError, ManagerError},
        feed_config::FeedConfig,
        resolver::{self, LoadMoreOutcome, Strategy},
        subscription::{SubscriberRegistry, Subscription},
        validator::{self, Diagnostics},
    },
    domain::{
        filter::FilterState,
        item::Item,
        search::{ResultSet, SearchState},
    },
    model::{
        load_more::{LoadMoreMachine, LoadMorePhase, Message, Rejection},
        pagination::{overlay, LoadingFlag, PaginationMode, PaginationState},
    },
    repositories::content::{ContentRepository, PageResponse},
};

/// Owner of one feed instance's state
///
/// Cloning yields another handle to the same feed. Separate feeds are
/// separate managers and share nothing.
#[derive(Clone)]
pub struct PaginationManager {
    inner: Rc<Inner>,
}

struct Inner {
    config: FeedConfig,
    repository: Arc<dyn ContentRepository>,
    state: RefCell<Arc<PaginationState>>,
    machine: Cell<LoadMoreMachine>,
    subscribers: Rc<SubscriberRegistry>,
}

/// Time the overlay's time windows are measured from
fn overlay_reference(state: &PaginationState, now: DateTime<Utc>) -> DateTime<Utc> {
    state.metadata.filter_applied_at_timestamp.unwrap_or(now)
}

/// Reconfigured copy of `current` for a new filter or search
///
/// Items fetched under the previous query are dropped, so the next fetch
/// counts its offset within the new result set.
fn requeried(current: &PaginationState) -> PaginationState {
    let mut next = current.reconfigured();
    if current.holds_remote_window() {
        next.restart_remote_cursor();
    }
    next
}

impl PaginationManager {
    pub fn new(
        config: FeedConfig,
        repository: Arc<dyn ContentRepository>,
    ) -> Result<Self, ManagerError> {
        config.check()?;
        let initial = PaginationState::new(config.page_size);
        Ok(Self {
            inner: Rc::new(Inner {
                config,
                repository,
                state: RefCell::new(Arc::new(initial)),
                machine: Cell::new(LoadMoreMachine::new()),
                subscribers: SubscriberRegistry::new(),
            }),
        })
    }

    pub fn config(&self) -> &FeedConfig {
        &self.inner.config
    }

    /// Current snapshot
    pub fn get_state(&self) -> Arc<PaginationState> {
        Arc::clone(&self.inner.state.borrow())
    }

    pub fn load_more_phase(&self) -> LoadMorePhase {
        self.inner.machine.get().phase()
    }

    /// Whether [`PaginationManager::load_more`] would currently be accepted
    pub fn can_load_more(&self) -> bool {
        let state = self.get_state();
        !state.fetch_in_flight && self.inner.machine.get().can_load_more(state.has_more_items)
    }

    /// Register `callback` to receive every published snapshot
    ///
    /// Callbacks must not call mutating methods of this manager; such calls
    /// fail with [`ManagerError::Reentrant`].
    pub fn subscribe(
        &self,
        callback: impl Fn(&Arc<PaginationState>) + 'static,
    ) -> Subscription {
        self.inner.subscribers.subscribe(callback)
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Diagnostics for the current snapshot
    pub fn validate(&self) -> Diagnostics {
        validator::validate(Some(&self.get_state()), &self.inner.config)
    }

    /// Restore the initial empty snapshot; outstanding fetches become stale
    pub fn reset(&self) -> Result<(), ManagerError> {
        let page_size = self.inner.config.page_size;
        self.transition("reset", true, |current, _| {
            let mut next = PaginationState::new(page_size);
            next.generation = current.generation.wrapping_add(1);
            Ok(next)
        })
    }

    /// Replace the held items, e.g. after a full refresh
    pub fn update_items(&self, items: Vec<Item>, mode: PaginationMode) -> Result<(), ManagerError> {
        self.transition("update_items", true, |current, now| {
            let mut next = current.reconfigured();
            next.remote_has_more = next.total_remote_count > items.len();
            next.metadata.loaded_remote_count = items.len();
            next.metadata.current_batch_number = usize::from(!items.is_empty());
            next.canonical_items = items;
            next.pagination_mode = mode;
            Ok(overlay::recompute(next, overlay_reference(current, now))?)
        })
    }

    /// Toggle one loading flag; refused if both flags would end up set
    pub fn set_loading_state(&self, flag: LoadingFlag, value: bool) -> Result<(), ManagerError> {
        self.transition("set_loading_state", false, |current, _| {
            let other = match flag {
                LoadingFlag::Fetch => current.load_more_in_flight,
                LoadingFlag::LoadMore => current.fetch_in_flight,
            };
            if value && other {
                return Err(ManagerError::ConflictingLoadingState { requested: flag });
            }
            let mut next = current.clone();
            match flag {
                LoadingFlag::Fetch => next.fetch_in_flight = value,
                LoadingFlag::LoadMore => next.load_more_in_flight = value,
            }
            Ok(next)
        })
    }

    /// Install a search overlay; a blank query clears the search instead
    pub fn update_search(
        &self,
        query: impl Into<String>,
        results: Option<ResultSet>,
    ) -> Result<(), ManagerError> {
        let query = query.into();
        if query.trim().is_empty() {
            return self.clear_search();
        }
        let config = &self.inner.config;
        self.transition("update_search", true, |current, now| {
            let mut next = requeried(current);
            next.search_state = Some(SearchState::new(query, results));
            next.pagination_mode = config.preferred_mode(next.known_result_count());
            Ok(overlay::recompute(next, overlay_reference(current, now))?)
        })
    }

    pub fn clear_search(&self) -> Result<(), ManagerError> {
        let config = &self.inner.config;
        self.transition("clear_search", true, |current, now| {
            let mut next = requeried(current);
            next.search_state = None;
            next.pagination_mode = config.preferred_mode(next.known_result_count());
            Ok(overlay::recompute(next, overlay_reference(current, now))?)
        })
    }

    pub fn update_filters(&self, filters: FilterState) -> Result<(), ManagerError> {
        let config = &self.inner.config;
        self.transition("update_filters", true, |current, now| {
            let mut next = requeried(current);
            next.filter_state = filters;
            next.metadata.filter_applied_at_timestamp = Some(now);
            next.pagination_mode = config.preferred_mode(next.known_result_count());
            Ok(overlay::recompute(next, now)?)
        })
    }

    /// Record a total reported by the remote store ahead of its items
    ///
    /// An exhausted feed is reopened when the new total leaves items to load.
    pub fn update_total_remote_count(&self, total: usize) -> Result<(), ManagerError> {
        let config = &self.inner.config;
        self.transition("update_total_remote_count", false, |current, now| {
            let mut next = current.clone();
            next.total_remote_count = total;
            next.remote_has_more = total > next.metadata.loaded_remote_count;
            next.pagination_mode = config.preferred_mode(next.known_result_count());
            let next = overlay::recompute(next, overlay_reference(current, now))?;
            if next.has_more_items && self.load_more_phase() == LoadMorePhase::Exhausted {
                tracing::debug!(total, "reopening exhausted feed");
                self.reconfigure_machine();
            }
            Ok(next)
        })
    }

    /// Recompute display items, page and counts from the held items
    pub fn reconcile(&self) -> Result<(), ManagerError> {
        self.transition("reconcile", false, |current, now| {
            Ok(overlay::recompute(
                current.clone(),
                overlay_reference(current, now),
            )?)
        })
    }

    /// Fetch the first page for the current filters and search
    ///
    /// Held items are dropped first, so the feed never carries data and an
    /// initial-load flag at the same time. Any outstanding fetch becomes stale.
    pub async fn load_initial(&self) -> Result<LoadMoreOutcome, ManagerError> {
        self.ensure_not_notifying("load_initial")?;
        let current = self.get_state();
        if current.fetch_in_flight {
            tracing::warn!("initial load rejected: another initial load is in flight");
            return Err(ManagerError::InitialLoadInFlight);
        }

        let mut loading = PaginationState::new(self.inner.config.page_size);
        loading.generation = current.generation.wrapping_add(1);
        loading.filter_state = current.filter_state.clone();
        loading.search_state = current.search_state.clone();
        loading.metadata.filter_applied_at_timestamp =
            current.metadata.filter_applied_at_timestamp;
        loading.fetch_in_flight = true;

        let issued = loading.generation;
        let request = resolver::page_request(&loading);
        self.reconfigure_machine();
        self.publish("load_initial", loading);

        let response = resolver::server_fetch(self.inner.repository.as_ref(), request).await;
        self.settle_initial_load(issued, response)
    }

    /// Produce the next page, locally or from the remote store
    ///
    /// Refusals (machine not idle, nothing more to load, initial load running,
    /// reentrant call) are errors. A failed fetch is a normal outcome with
    /// `success == false`, after which the feed is in `Failed` and a new call
    /// retries.
    pub async fn load_more(&self) -> Result<LoadMoreOutcome, ManagerError> {
        self.ensure_not_notifying("load_more")?;
        let current = self.get_state();
        if current.fetch_in_flight {
            tracing::warn!("load-more rejected: initial load in flight");
            return Err(ManagerError::InitialLoadInFlight);
        }
        self.update_machine(Message::LoadRequested {
            has_more_items: current.has_more_items,
        })
        .map_err(|reason| {
            let phase = self.load_more_phase();
            tracing::warn!(%phase, %reason, "load-more rejected");
            ManagerError::LoadMoreRejected { phase, reason }
        })?;

        match resolver::resolve(&current) {
            Some(Strategy::ClientPaginate) => self.client_paginate(&current),
            Some(Strategy::ServerFetch) => self.server_fetch(&current).await,
            None => {
                let _ = self.update_machine(Message::LoadCancelled);
                Err(ManagerError::LoadMoreRejected {
                    phase: self.load_more_phase(),
                    reason: Rejection::NothingMoreToLoad,
                })
            }
        }
    }

    /// Ask the repository for ranked results and install them
    ///
    /// Returns `Ok(false)` when a newer intent arrived while the search was
    /// outstanding; the results are dropped in that case.
    pub async fn search(&self, query: &str) -> Result<bool, ManagerError> {
        self.ensure_not_notifying("search")?;
        if query.trim().is_empty() {
            return self.clear_search().map(|()| true);
        }
        let current = self.get_state();
        let issued = current.generation;
        let results = self
            .inner
            .repository
            .search(query, &current.filter_state)
            .await
            .map_err(|e| {
                tracing::warn!(query, "search failed: {e}");
                ManagerError::Fetch(e)
            })?;

        let latest = self.get_state().generation;
        if latest != issued {
            tracing::warn!(issued, latest, "discarding stale search results");
            return Ok(false);
        }
        self.update_search(query, Some(results)).map(|()| true)
    }

    fn client_paginate(&self, current: &PaginationState) -> Result<LoadMoreOutcome, ManagerError> {
        match resolver::client_paginate(current, overlay_reference(current, Utc::now())) {
            Ok((next, outcome)) => {
                let _ = self.update_machine(Message::LoadSucceeded {
                    has_more_items: outcome.has_more_items,
                });
                self.publish("load_more", next);
                Ok(outcome)
            }
            Err(e) => {
                let _ = self.update_machine(Message::LoadFailed);
                tracing::warn!("client pagination aborted: {e}");
                Err(e.into())
            }
        }
    }

    async fn server_fetch(
        &self,
        current: &PaginationState,
    ) -> Result<LoadMoreOutcome, ManagerError> {
        let issued = current.generation;
        let request = resolver::page_request(current);
        let mut loading = current.clone();
        loading.load_more_in_flight = true;
        self.publish("load_more", loading);

        let response = resolver::server_fetch(self.inner.repository.as_ref(), request).await;
        self.settle_load_more(issued, response)
    }

    /// Apply a load-more response; always clears `load_more_in_flight` unless
    /// the response is stale
    fn settle_load_more(
        &self,
        issued: u64,
        response: Result<PageResponse, FetchError>,
    ) -> Result<LoadMoreOutcome, ManagerError> {
        let current = self.get_state();
        if let Some(stale) = Self::superseded(issued, &current) {
            return Ok(stale);
        }

        let now = Utc::now();
        let mut settled = (*current).clone();
        settled.load_more_in_flight = false;

        match response {
            Ok(page) => {
                let reference = overlay_reference(&settled, now);
                match resolver::merge_page(&settled, page, now, reference) {
                    Ok((next, outcome)) => {
                        let _ = self.update_machine(Message::LoadSucceeded {
                            has_more_items: outcome.has_more_items,
                        });
                        self.publish("load_more", next);
                        Ok(outcome)
                    }
                    Err(e) => {
                        let _ = self.update_machine(Message::LoadFailed);
                        tracing::warn!("merging fetched page aborted: {e}");
                        self.publish("load_more", settled);
                        Err(e.into())
                    }
                }
            }
            Err(error) => {
                let _ = self.update_machine(Message::LoadFailed);
                tracing::warn!("load-more fetch failed: {error}");
                let has_more_items = settled.has_more_items;
                self.publish("load_more", settled);
                Ok(LoadMoreOutcome::failed(
                    Strategy::ServerFetch,
                    has_more_items,
                    error.into(),
                ))
            }
        }
    }

    /// Apply an initial-load response; always clears `fetch_in_flight` unless
    /// the response is stale
    fn settle_initial_load(
        &self,
        issued: u64,
        response: Result<PageResponse, FetchError>,
    ) -> Result<LoadMoreOutcome, ManagerError> {
        let current = self.get_state();
        if let Some(stale) = Self::superseded(issued, &current) {
            return Ok(stale);
        }

        let now = Utc::now();
        let mut settled = (*current).clone();
        settled.fetch_in_flight = false;

        match response {
            Ok(page) => {
                let mut next = settled.clone();
                next.total_remote_count = page.total_count;
                next.remote_has_more = page.has_more;
                next.metadata.loaded_remote_count = page.items.len();
                next.metadata.current_batch_number = 1;
                next.metadata.last_fetch_timestamp = Some(now);
                next.canonical_items = page.items;
                next.pagination_mode = self.inner.config.preferred_mode(next.known_result_count());

                match overlay::recompute(next, overlay_reference(&settled, now)) {
                    Ok(next) => {
                        let outcome = LoadMoreOutcome::succeeded(
                            Strategy::ServerFetch,
                            next.canonical_items.clone(),
                            next.has_more_items,
                        );
                        self.publish("load_initial", next);
                        Ok(outcome)
                    }
                    Err(e) => {
                        tracing::warn!("initial load aborted: {e}");
                        self.publish("load_initial", settled);
                        Err(e.into())
                    }
                }
            }
            Err(error) => {
                tracing::warn!("initial load failed: {error}");
                let has_more_items = settled.has_more_items;
                self.publish("load_initial", settled);
                Ok(LoadMoreOutcome::failed(
                    Strategy::ServerFetch,
                    has_more_items,
                    error.into(),
                ))
            }
        }
    }

    fn superseded(issued: u64, current: &PaginationState) -> Option<LoadMoreOutcome> {
        if current.generation == issued {
            return None;
        }
        tracing::warn!(
            issued,
            current = current.generation,
            "discarding stale fetch response"
        );
        Some(LoadMoreOutcome::failed(
            Strategy::ServerFetch,
            current.has_more_items,
            ErrorKind::Superseded {
                issued,
                current: current.generation,
            },
        ))
    }

    fn ensure_not_notifying(&self, intent: &'static str) -> Result<(), ManagerError> {
        if self.inner.subscribers.is_notifying() {
            tracing::warn!(intent, "rejecting call made from a subscriber notification");
            return Err(ManagerError::Reentrant { intent });
        }
        Ok(())
    }

    fn reconfigure_machine(&self) {
        let mut machine = self.inner.machine.get();
        machine.reconfigure();
        self.inner.machine.set(machine);
    }

    fn update_machine(&self, message: Message) -> Result<LoadMorePhase, Rejection> {
        let mut machine = self.inner.machine.get();
        let result = machine.update(message);
        self.inner.machine.set(machine);
        result
    }

    /// Run a synchronous intent
    ///
    /// `build` derives the next snapshot from the current one; on error the
    /// current snapshot stays in place. `reconfigures` returns the load-more
    /// machine to `Idle`.
    fn transition(
        &self,
        intent: &'static str,
        reconfigures: bool,
        build: impl FnOnce(&PaginationState, DateTime<Utc>) -> Result<PaginationState, ManagerError>,
    ) -> Result<(), ManagerError> {
        self.ensure_not_notifying(intent)?;
        let current = self.get_state();
        let next = build(current.as_ref(), Utc::now()).map_err(|e| {
            tracing::warn!(intent, "transition aborted: {e}");
            e
        })?;
        if reconfigures {
            self.reconfigure_machine();
        }
        self.publish(intent, next);
        Ok(())
    }

    /// Replace the snapshot and notify; unchanged snapshots are not published
    fn publish(&self, intent: &'static str, next: PaginationState) -> bool {
        let snapshot = {
            let mut slot = self.inner.state.borrow_mut();
            if **slot == next {
                tracing::debug!(intent, "transition left the state unchanged");
                return false;
            }
            let snapshot = Arc::new(next);
            *slot = Arc::clone(&snapshot);
            snapshot
        };
        tracing::debug!(
            intent,
            generation = snapshot.generation,
            page = snapshot.current_page_index,
            items = snapshot.canonical_items.len(),
            "state published"
        );
        self.inner.subscribers.notify(&snapshot);
        true
    }
}
