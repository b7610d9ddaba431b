#![deny(warnings)]

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use clap::Parser;
use color_eyre::eyre::Result;
use thousands::Separable;

use feedpager::{
    core::{
        manager::PaginationManager,
        resolver::LoadMoreOutcome,
        validator::{validate_with_timeout, ValidationOutcome},
    },
    domain::filter::FilterState,
    infrastructure::{cli::Cli, config::Config, demo},
    repositories::content::InMemoryRepository,
    utils::{initialize_logging, initialize_panic_handler},
    PaginationState,
};

fn print_page(label: &str, state: &PaginationState) {
    println!(
        "{label}: page {} [{} mode] showing {} of {} matching, {} held, {} remote",
        state.current_page_index,
        state.pagination_mode,
        state.page_items.len(),
        state.metadata.total_filtered_count.separate_with_commas(),
        state.canonical_items.len().separate_with_commas(),
        state.total_remote_count.separate_with_commas(),
    );
    for item in &state.page_items {
        println!(
            "  {:<9} {:<28} {:<8} {:>5} likes {:>7} plays",
            item.kind.to_string(),
            item.title,
            item.author,
            item.like_count,
            item.play_count.separate_with_commas(),
        );
    }
}

fn print_outcome(outcome: &LoadMoreOutcome) {
    match &outcome.error {
        None => println!(
            "  -> {} added {} item(s), more: {}",
            outcome.strategy_used,
            outcome.new_items.len(),
            outcome.has_more_items
        ),
        Some(error) => println!("  -> {} failed: {error}", outcome.strategy_used),
    }
}

async fn tokio_main() -> Result<()> {
    initialize_logging()?;

    initialize_panic_handler()?;

    let args = <Cli as Parser>::parse();

    let config = Config::new()?;
    let mut feed = config.feed.clone();
    if let Some(page_size) = args.page_size {
        feed = feed.with_page_size(page_size);
    }

    let item_count = args.items.unwrap_or(config.demo.item_count);
    let repository = InMemoryRepository::new(demo::catalog(item_count, Utc::now()))
        .with_latency(Duration::from_millis(
            args.latency_ms.unwrap_or(config.demo.latency_ms),
        ))
        .with_fail_every(args.fail_every.unwrap_or(config.demo.fail_every));
    let manager = PaginationManager::new(feed.clone(), Arc::new(repository))?;
    let _subscription = manager.subscribe(|state| {
        tracing::debug!(
            generation = state.generation,
            page = state.current_page_index,
            loading = state.is_loading(),
            "snapshot received"
        );
    });

    let mut filters = FilterState::default();
    if let Some(kind) = args.kind {
        filters = filters.with_kind(kind);
    }
    if let Some(sort) = args.sort {
        filters = filters.with_sort(sort);
    }
    if let Some(window) = args.window {
        filters = filters.with_time_window(window);
    }
    if filters.is_active() {
        manager.update_filters(filters)?;
    }
    if let Some(query) = args.query.as_deref() {
        manager.search(query).await?;
    }

    let outcome = manager.load_initial().await?;
    print_outcome(&outcome);
    print_page("initial", &manager.get_state());

    let mut retried = false;
    while manager.get_state().current_page_index < args.pages {
        if !manager.can_load_more() {
            println!("nothing more to load");
            break;
        }
        let outcome = manager.load_more().await?;
        print_outcome(&outcome);
        match &outcome.error {
            Some(error) if error.is_retryable() && !retried => {
                retried = true;
                continue;
            }
            Some(_) => break,
            None => print_page("load more", &manager.get_state()),
        }
    }

    match validate_with_timeout(Some(manager.get_state()), &feed).await {
        ValidationOutcome::Completed(diagnostics) => {
            diagnostics.log();
            println!(
                "diagnostics: {} warning(s), {} error(s), {} critical, action: {}",
                diagnostics.summary.warnings,
                diagnostics.summary.errors,
                diagnostics.summary.criticals,
                diagnostics.recommended_action()
            );
        }
        ValidationOutcome::Inconclusive => println!("diagnostics: inconclusive"),
    }

    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    if let Err(e) = tokio_main().await {
        eprintln!("{} error: Something went wrong", env!("CARGO_PKG_NAME"));
        Err(e)
    } else {
        Ok(())
    }
}
