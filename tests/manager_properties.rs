use std::{cell::RefCell, collections::HashSet, rc::Rc, sync::Arc};

use pretty_assertions::assert_eq;
use rstest::rstest;

use feedpager::{
    core::{
        error::ManagerError,
        feed_config::FeedConfig,
        manager::PaginationManager,
        subscription::Subscription,
        validator::{validate_with_timeout, ValidationOutcome},
    },
    domain::{
        filter::{FilterState, SortBy, TimeWindow},
        item::ContentKind,
        search::ResultSet,
    },
    model::{
        load_more::{LoadMorePhase, Rejection},
        pagination::{LoadingFlag, PaginationMode, PaginationState},
    },
    repositories::content::InMemoryRepository,
    test_helpers::fixture_items,
};

fn manager_over(count: usize) -> PaginationManager {
    let repository = Arc::new(InMemoryRepository::new(fixture_items(count)));
    PaginationManager::new(FeedConfig::default(), repository)
        .unwrap_or_else(|e| panic!("manager: {e}"))
}

type Recorded = Rc<RefCell<Vec<Arc<PaginationState>>>>;

/// Collect every published snapshot
fn record(manager: &PaginationManager) -> (Subscription, Recorded) {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    let subscription = manager.subscribe(move |state| sink.borrow_mut().push(Arc::clone(state)));
    (subscription, seen)
}

fn assert_invariants(state: &PaginationState) {
    assert!(state.page_items.len() <= state.page_size);
    assert!(!(state.fetch_in_flight && state.load_more_in_flight));
    assert_eq!(state.metadata.visible_filtered_count, state.page_items.len());
    assert_eq!(state.metadata.total_filtered_count, state.display_items.len());
    assert!(state.current_page_index >= 1);

    let held: HashSet<_> = state.canonical_items.iter().map(|item| &item.id).collect();
    assert!(state.display_items.iter().all(|item| held.contains(&item.id)));
    assert!(state
        .page_items
        .iter()
        .all(|item| state.display_items.contains(item)));
}

#[tokio::test]
async fn test_every_published_snapshot_is_consistent() -> Result<(), ManagerError> {
    let manager = manager_over(120);
    let (_subscription, seen) = record(&manager);

    manager.load_initial().await?;
    manager.load_more().await?;
    manager.update_filters(FilterState::default().with_kind(ContentKind::Post))?;
    manager.load_more().await?;
    manager.search("post item-1").await?;
    manager.update_filters(
        FilterState::default()
            .with_sort(SortBy::MostLiked)
            .with_time_window(TimeWindow::Day),
    )?;
    manager.clear_search()?;
    manager.set_loading_state(LoadingFlag::LoadMore, true)?;
    assert!(manager.set_loading_state(LoadingFlag::Fetch, true).is_err());
    manager.set_loading_state(LoadingFlag::LoadMore, false)?;
    manager.update_total_remote_count(90)?;
    manager.reconcile()?;
    manager.reset()?;

    let seen = seen.borrow();
    assert!(seen.len() > 10);
    for state in seen.iter() {
        assert_invariants(state);
    }
    let generations: Vec<u64> = seen.iter().map(|state| state.generation).collect();
    assert!(generations.windows(2).all(|w| w[0] <= w[1]));

    Ok(())
}

#[rstest]
#[case(FilterState::default().with_kind(ContentKind::Track))]
#[case(FilterState::default().with_sort(SortBy::Oldest))]
#[case(FilterState::default().with_time_window(TimeWindow::Day).with_sort(SortBy::MostPlayed))]
fn test_filter_round_trip_restores_display(#[case] filters: FilterState) -> Result<(), ManagerError> {
    let manager = manager_over(0);
    manager.update_items(fixture_items(60), PaginationMode::Client)?;
    let original = manager.get_state();

    manager.update_filters(filters)?;
    manager.update_filters(original.filter_state.clone())?;

    let restored = manager.get_state();
    assert_eq!(restored.display_items, original.display_items);
    assert_eq!(restored.page_items, original.page_items);
    assert_eq!(restored.current_page_index, 1);

    Ok(())
}

#[test]
fn test_reconcile_is_idempotent() -> Result<(), ManagerError> {
    let manager = manager_over(0);
    manager.update_items(fixture_items(33), PaginationMode::Client)?;
    manager.update_search(
        "q",
        Some(ResultSet::new(
            fixture_items(33).into_iter().rev().map(|item| item.id).collect(),
        )),
    )?;
    let (_subscription, seen) = record(&manager);

    manager.reconcile()?;
    let once = manager.get_state();
    manager.reconcile()?;
    let twice = manager.get_state();

    assert!(Arc::ptr_eq(&once, &twice));
    assert!(seen.borrow().is_empty());
    assert_eq!(
        once.display_items.first().map(|item| item.id.to_string()),
        Some("item-32".to_string())
    );

    Ok(())
}

#[tokio::test]
async fn test_load_more_terminates() -> Result<(), ManagerError> {
    let manager = manager_over(100);
    manager.load_initial().await?;
    assert_eq!(manager.get_state().pagination_mode, PaginationMode::Server);

    let mut accepted = 0;
    let rejection = loop {
        match manager.load_more().await {
            Ok(outcome) => {
                assert!(outcome.success);
                accepted += 1;
                assert!(accepted <= 10, "load-more never stopped");
            }
            Err(e) => break e,
        }
    };

    assert_eq!(accepted, 6);
    assert!(matches!(
        rejection,
        ManagerError::LoadMoreRejected {
            reason: Rejection::NothingMoreToLoad,
            ..
        }
    ));
    assert_eq!(manager.load_more_phase(), LoadMorePhase::Exhausted);
    let state = manager.get_state();
    assert_eq!(state.canonical_items.len(), 100);
    assert!(!state.has_more_items);
    assert!(manager.validate().is_healthy());

    Ok(())
}

fn page_ids(state: &PaginationState) -> impl Iterator<Item = String> + '_ {
    state.page_items.iter().map(|item| item.id.to_string())
}

/// Load more until the feed refuses, returning every id shown on some page
async fn page_through(manager: &PaginationManager) -> HashSet<String> {
    let mut shown: HashSet<String> = page_ids(&manager.get_state()).collect();
    let mut accepted = 0;
    while let Ok(outcome) = manager.load_more().await {
        assert!(outcome.success);
        shown.extend(page_ids(&manager.get_state()));
        accepted += 1;
        assert!(accepted <= 40, "load-more never stopped");
    }
    shown
}

fn ids_of_kind(count: usize, kind: ContentKind) -> HashSet<String> {
    fixture_items(count)
        .into_iter()
        .filter(|item| item.kind == kind)
        .map(|item| item.id.to_string())
        .collect()
}

#[tokio::test]
async fn test_filtered_server_feed_pages_completely() -> Result<(), ManagerError> {
    let manager = manager_over(300);
    manager.load_initial().await?;
    manager.load_more().await?;
    assert_eq!(manager.get_state().pagination_mode, PaginationMode::Server);

    manager.update_filters(FilterState::default().with_kind(ContentKind::Track))?;
    let state = manager.get_state();
    assert!(state.canonical_items.is_empty());
    assert_eq!(state.metadata.loaded_remote_count, 0);
    assert!(manager.can_load_more());

    let shown = page_through(&manager).await;

    assert_eq!(shown, ids_of_kind(300, ContentKind::Track));
    assert_eq!(manager.load_more_phase(), LoadMorePhase::Exhausted);
    let state = manager.get_state();
    assert_eq!(state.canonical_items.len(), 100);
    assert_eq!(state.current_page_index, 7);
    assert!(manager.validate().is_healthy());

    Ok(())
}

#[tokio::test]
async fn test_searched_server_feed_pages_completely() -> Result<(), ManagerError> {
    let manager = manager_over(300);
    manager.load_initial().await?;
    manager.load_more().await?;

    assert!(manager.search("track").await?);
    let state = manager.get_state();
    assert_eq!(state.pagination_mode, PaginationMode::Server);
    assert!(state.canonical_items.is_empty());

    let shown = page_through(&manager).await;

    assert_eq!(shown, ids_of_kind(300, ContentKind::Track));
    assert_eq!(manager.load_more_phase(), LoadMorePhase::Exhausted);
    assert_eq!(manager.get_state().search_query(), Some("track"));

    Ok(())
}

#[tokio::test]
async fn test_cleared_search_pages_whole_feed() -> Result<(), ManagerError> {
    let manager = manager_over(120);
    manager.load_initial().await?;
    assert!(manager.search("playlist").await?);
    manager.load_more().await?;

    manager.clear_search()?;
    let shown = page_through(&manager).await;

    let all: HashSet<String> = fixture_items(120)
        .into_iter()
        .map(|item| item.id.to_string())
        .collect();
    assert_eq!(shown, all);

    Ok(())
}

#[tokio::test]
async fn test_rejected_load_more_keeps_feed_idle() -> Result<(), ManagerError> {
    let manager = manager_over(500);
    manager.update_items(fixture_items(15), PaginationMode::Server)?;

    let rejection = manager.load_more().await;
    assert!(matches!(
        rejection,
        Err(ManagerError::LoadMoreRejected {
            phase: LoadMorePhase::Idle,
            reason: Rejection::NothingMoreToLoad,
        })
    ));
    assert_eq!(manager.load_more_phase(), LoadMorePhase::Idle);

    manager.update_total_remote_count(500)?;
    assert!(manager.can_load_more());

    let outcome = manager.load_more().await?;
    assert!(outcome.success);
    assert_eq!(outcome.new_items.len(), 15);
    assert_eq!(manager.get_state().current_page_index, 2);
    assert_eq!(manager.load_more_phase(), LoadMorePhase::Idle);

    Ok(())
}

#[tokio::test]
async fn test_new_total_reopens_exhausted_feed() -> Result<(), ManagerError> {
    let manager = manager_over(30);
    manager.load_initial().await?;
    manager.load_more().await?;
    assert_eq!(manager.load_more_phase(), LoadMorePhase::Exhausted);
    assert!(!manager.can_load_more());

    manager.update_total_remote_count(60)?;

    assert_eq!(manager.load_more_phase(), LoadMorePhase::Idle);
    assert!(manager.get_state().has_more_items);
    assert!(manager.can_load_more());

    Ok(())
}

#[tokio::test]
async fn test_retry_after_injected_failure() -> Result<(), ManagerError> {
    let repository = Arc::new(InMemoryRepository::new(fixture_items(60)).with_fail_every(2));
    let manager = PaginationManager::new(FeedConfig::default(), repository.clone())?;

    assert!(manager.load_initial().await?.success);
    let failed = manager.load_more().await?;
    assert!(!failed.success);
    assert_eq!(manager.load_more_phase(), LoadMorePhase::Failed);
    assert_eq!(manager.get_state().current_page_index, 1);

    let retried = manager.load_more().await?;
    assert!(retried.success);
    assert_eq!(manager.get_state().current_page_index, 2);
    assert_eq!(repository.fetch_count(), 3);

    Ok(())
}

#[tokio::test]
async fn test_search_then_initial_load() -> Result<(), ManagerError> {
    let manager = manager_over(40);

    assert!(manager.search("track").await?);
    manager.load_initial().await?;

    let state = manager.get_state();
    assert_eq!(state.search_query(), Some("track"));
    assert_eq!(state.display_items.len(), 13);
    assert_eq!(state.page_items.len(), 13);
    assert!(state
        .display_items
        .iter()
        .all(|item| item.kind == ContentKind::Track));
    assert!(!state.has_more_items);
    assert_eq!(state.pagination_mode, PaginationMode::Client);

    Ok(())
}

#[test]
fn test_feeds_are_independent() -> Result<(), ManagerError> {
    let left = manager_over(0);
    let right = manager_over(0);

    left.update_items(fixture_items(40), PaginationMode::Client)?;
    left.update_filters(FilterState::default().with_kind(ContentKind::Playlist))?;

    let untouched = right.get_state();
    assert_eq!(*untouched, PaginationState::new(15));
    assert_eq!(right.load_more_phase(), LoadMorePhase::Idle);
    assert_eq!(left.get_state().display_items.len(), 13);

    Ok(())
}

#[tokio::test]
async fn test_validation_with_budget_completes() -> Result<(), ManagerError> {
    let manager = manager_over(40);
    manager.load_initial().await?;

    match validate_with_timeout(Some(manager.get_state()), manager.config()).await {
        ValidationOutcome::Completed(diagnostics) => assert!(diagnostics.is_healthy()),
        ValidationOutcome::Inconclusive => panic!("validation did not finish"),
    }

    Ok(())
}
