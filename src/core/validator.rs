//! State validator
//!
//! [`validate`] inspects a snapshot and reports what is wrong with it. It has
//! no access to the manager and takes the snapshot by shared reference, so
//! running it can never cause a transition. Callers decide what to do with
//! the result: log warnings, offer a manual reset for critical issues, and
//! never retry automatically because of a diagnostic.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

use crate::{
    core::feed_config::FeedConfig,
    model::pagination::{PaginationMode, PaginationState},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Display)]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Category {
    InfiniteLoopPrevention,
    Data,
    Configuration,
    Pagination,
    StateConsistency,
    Performance,
    Filter,
    Metadata,
    LoadingState,
}

/// Coarse classes of problems and the response each one calls for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
pub enum ErrorClass {
    /// Malformed snapshot; only a reset is safe
    Structural,
    /// Counts or pages disagree; recompute the overlay
    Consistency,
    /// Flag combination that would keep loading forever; needs the user
    InfiniteLoopRisk,
    PerformanceWarning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Display)]
pub enum RecommendedAction {
    None,
    Reconcile,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub message: String,
    pub severity: Severity,
    pub category: Category,
    pub requires_user_action: bool,
    pub timestamp: DateTime<Utc>,
}

impl Issue {
    fn new(
        severity: Severity,
        category: Category,
        message: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            message: message.into(),
            severity,
            category,
            requires_user_action: severity == Severity::Critical,
            timestamp,
        }
    }

    pub fn class(&self) -> ErrorClass {
        match (self.severity, self.category) {
            (_, Category::InfiniteLoopPrevention) => ErrorClass::InfiniteLoopRisk,
            (Severity::Critical, Category::Data) => ErrorClass::Structural,
            (Severity::Warning, Category::Performance) => ErrorClass::PerformanceWarning,
            _ => ErrorClass::Consistency,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub warnings: usize,
    pub errors: usize,
    pub criticals: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub issues: Vec<Issue>,
    pub summary: Summary,
}

impl Diagnostics {
    fn push(&mut self, issue: Issue) {
        match issue.severity {
            Severity::Warning => self.summary.warnings += 1,
            Severity::Error => self.summary.errors += 1,
            Severity::Critical => self.summary.criticals += 1,
        }
        self.issues.push(issue);
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    /// No errors and no critical issues; warnings are allowed
    pub fn is_healthy(&self) -> bool {
        self.summary.errors == 0 && self.summary.criticals == 0
    }

    pub fn has_blocking_issues(&self) -> bool {
        self.summary.criticals > 0
    }

    pub fn count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Warning => self.summary.warnings,
            Severity::Error => self.summary.errors,
            Severity::Critical => self.summary.criticals,
        }
    }

    pub fn with_severity(&self, severity: Severity) -> impl Iterator<Item = &Issue> + '_ {
        self.issues
            .iter()
            .filter(move |issue| issue.severity == severity)
    }

    pub fn in_category(&self, category: Category) -> impl Iterator<Item = &Issue> + '_ {
        self.issues
            .iter()
            .filter(move |issue| issue.category == category)
    }

    /// Strongest response any issue calls for
    pub fn recommended_action(&self) -> RecommendedAction {
        if self.summary.criticals > 0 {
            RecommendedAction::Reset
        } else if self.summary.errors > 0 {
            RecommendedAction::Reconcile
        } else {
            RecommendedAction::None
        }
    }

    /// Emit every issue as a tracing event at a matching level
    pub fn log(&self) {
        for issue in &self.issues {
            match issue.severity {
                Severity::Warning => tracing::warn!(category = %issue.category, "{}", issue.message),
                Severity::Error | Severity::Critical => tracing::error!(
                    category = %issue.category,
                    severity = %issue.severity,
                    "{}",
                    issue.message
                ),
            }
        }
    }
}

/// Validate `state` against `config`, stamping issues with the current time
pub fn validate(state: Option<&PaginationState>, config: &FeedConfig) -> Diagnostics {
    validate_at(state, config, Utc::now())
}

/// [`validate`] with an explicit timestamp
///
/// Checks run in a fixed order. Null and malformed snapshots end validation
/// immediately; every later check would only repeat the same problem.
pub fn validate_at(
    state: Option<&PaginationState>,
    config: &FeedConfig,
    now: DateTime<Utc>,
) -> Diagnostics {
    let mut diagnostics = Diagnostics::default();
    let mut report = |severity, category, message: String| {
        diagnostics.push(Issue::new(severity, category, message, now));
    };

    let Some(state) = state else {
        report(
            Severity::Critical,
            Category::InfiniteLoopPrevention,
            "pagination state is missing".to_string(),
        );
        return diagnostics;
    };

    if let Some(problem) = shape_problem(state) {
        report(Severity::Critical, Category::Data, problem);
        return diagnostics;
    }

    let canonical = state.canonical_items.len();
    let display = state.display_items.len();
    let page = state.page_items.len();

    if state.fetch_in_flight && canonical > 0 && !state.load_more_in_flight {
        report(
            Severity::Critical,
            Category::InfiniteLoopPrevention,
            format!("initial fetch flagged in flight while {canonical} items are already held"),
        );
    }

    if state.page_size != config.page_size {
        report(
            Severity::Error,
            Category::Configuration,
            format!(
                "page size {} does not match configured page size {}",
                state.page_size, config.page_size
            ),
        );
    }

    if state.current_page_index < 1 {
        report(
            Severity::Critical,
            Category::Pagination,
            format!("current page index {} is below 1", state.current_page_index),
        );
    } else if let Some(total_pages) = state.total_pages() {
        if state.current_page_index > total_pages {
            report(
                Severity::Error,
                Category::Pagination,
                format!(
                    "current page {} exceeds total pages {total_pages} ({} items, page size {})",
                    state.current_page_index, state.total_remote_count, state.page_size
                ),
            );
        }
    }

    if let Some(search) = state.search_state.as_ref().filter(|search| search.active) {
        match &search.results {
            None => report(
                Severity::Error,
                Category::StateConsistency,
                format!("search '{}' is active without results", search.query),
            ),
            Some(results) if results.is_empty() && display > 0 => report(
                Severity::Warning,
                Category::StateConsistency,
                format!(
                    "search '{}' has no results but {display} items are displayed",
                    search.query
                ),
            ),
            Some(_) => {}
        }
    }

    let validation = &config.validation;
    if canonical > validation.large_dataset_error_threshold {
        report(
            Severity::Error,
            Category::Performance,
            format!(
                "{canonical} items held, above the {} item limit",
                validation.large_dataset_error_threshold
            ),
        );
    } else if canonical > validation.large_dataset_warn_threshold {
        report(
            Severity::Warning,
            Category::Performance,
            format!(
                "{canonical} items held, above the {} item warning threshold",
                validation.large_dataset_warn_threshold
            ),
        );
    }

    if state.load_more_in_flight && !state.has_more_items {
        report(
            Severity::Critical,
            Category::InfiniteLoopPrevention,
            "load-more in flight although no more items exist".to_string(),
        );
    }

    if page == 0 && display > 0 && !state.is_loading() {
        report(
            Severity::Error,
            Category::Pagination,
            format!(
                "page {} is empty while {display} items are displayable",
                state.current_page_index
            ),
        );
    }

    let overlay_active = state.filter_state.is_active() || state.is_search_active();
    if overlay_active && canonical > 0 && state.display_items == state.canonical_items {
        report(
            Severity::Warning,
            Category::Filter,
            "active filters or search left the item set unchanged".to_string(),
        );
    }

    if state.metadata.visible_filtered_count != page {
        report(
            Severity::Warning,
            Category::Metadata,
            format!(
                "visible count {} disagrees with {page} page items",
                state.metadata.visible_filtered_count
            ),
        );
    }

    if state.pagination_mode == PaginationMode::Client
        && canonical > 0
        && canonical < validation.inefficient_client_mode_below
    {
        report(
            Severity::Warning,
            Category::Performance,
            format!("client pagination over only {canonical} items"),
        );
    }

    if state.fetch_in_flight && state.load_more_in_flight {
        report(
            Severity::Error,
            Category::LoadingState,
            "initial fetch and load-more are both in flight".to_string(),
        );
    }

    diagnostics
}

/// Length relations every snapshot must satisfy
fn shape_problem(state: &PaginationState) -> Option<String> {
    if state.page_size == 0 {
        return Some("page size is zero".to_string());
    }
    if state.page_items.len() > state.page_size {
        return Some(format!(
            "page holds {} items, more than the page size {}",
            state.page_items.len(),
            state.page_size
        ));
    }
    if state.page_items.len() > state.display_items.len() {
        return Some(format!(
            "page holds {} items but only {} are displayable",
            state.page_items.len(),
            state.display_items.len()
        ));
    }
    if state.display_items.len() > state.canonical_items.len() {
        return Some(format!(
            "{} displayed items exceed {} held items",
            state.display_items.len(),
            state.canonical_items.len()
        ));
    }
    None
}

/// Result of [`validate_with_timeout`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Completed(Diagnostics),
    /// The validation did not finish within the budget
    Inconclusive,
}

/// Run [`validate`] on a blocking worker, giving up after the configured timeout
pub async fn validate_with_timeout(
    state: Option<Arc<PaginationState>>,
    config: &FeedConfig,
) -> ValidationOutcome {
    let budget = config.validation.timeout();
    let worker_config = config.clone();
    let task = tokio::task::spawn_blocking(move || validate(state.as_deref(), &worker_config));

    match tokio::time::timeout(budget, task).await {
        Ok(Ok(diagnostics)) => ValidationOutcome::Completed(diagnostics),
        Ok(Err(e)) => {
            tracing::warn!("validation worker failed: {e}");
            ValidationOutcome::Inconclusive
        }
        Err(_) => {
            tracing::warn!(
                timeout_ms = config.validation.validation_timeout_ms,
                "validation timed out, treating result as inconclusive"
            );
            ValidationOutcome::Inconclusive
        }
    }
}
