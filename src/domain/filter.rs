//! Filter options applied to a feed
//!
//! Predicates run in a fixed order (content kind, then time window) and the
//! surviving items are then ordered by [`SortBy`]. The same functions are used
//! by the local overlay and by [`InMemoryRepository`](crate::repositories::content::InMemoryRepository),
//! so a server page and its local re-filtering always agree.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::item::{ContentKind, Item};

/// How far back in time items are kept
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TimeWindow {
    #[default]
    All,
    Day,
    Week,
    Month,
    Year,
}

impl TimeWindow {
    fn duration(self) -> Option<Duration> {
        match self {
            TimeWindow::All => None,
            TimeWindow::Day => Some(Duration::days(1)),
            TimeWindow::Week => Some(Duration::weeks(1)),
            TimeWindow::Month => Some(Duration::days(30)),
            TimeWindow::Year => Some(Duration::days(365)),
        }
    }

    /// Oldest creation time that still passes this window
    ///
    /// Returns `Ok(None)` for [`TimeWindow::All`], and an error when the cutoff
    /// cannot be represented relative to `reference`.
    pub fn cutoff(self, reference: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, FilterError> {
        match self.duration() {
            None => Ok(None),
            Some(span) => reference
                .checked_sub_signed(span)
                .map(Some)
                .ok_or(FilterError::CutoffOutOfRange {
                    window: self,
                    reference,
                }),
        }
    }
}

/// Order of the filtered items
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum SortBy {
    /// Keep the order the remote store returned
    #[default]
    Relevance,
    Newest,
    Oldest,
    MostLiked,
    MostPlayed,
}

impl SortBy {
    /// Stable sort, so ties keep server order
    pub fn sort(self, items: &mut [Item]) {
        match self {
            SortBy::Relevance => {}
            SortBy::Newest => items.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            SortBy::Oldest => items.sort_by(|a, b| a.created_at.cmp(&b.created_at)),
            SortBy::MostLiked => items.sort_by(|a, b| b.like_count.cmp(&a.like_count)),
            SortBy::MostPlayed => items.sort_by(|a, b| b.play_count.cmp(&a.play_count)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    CutoffOutOfRange {
        window: TimeWindow,
        reference: DateTime<Utc>,
    },
}

impl std::fmt::Display for FilterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterError::CutoffOutOfRange { window, reference } => write!(
                f,
                "time window '{window}' cannot be applied relative to {reference}"
            ),
        }
    }
}

impl std::error::Error for FilterError {}

/// Recognized filter options of a feed
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterState {
    /// Only keep items of this kind; `None` keeps every kind
    #[serde(default)]
    pub kind: Option<ContentKind>,
    #[serde(default)]
    pub time_window: TimeWindow,
    #[serde(default)]
    pub sort_by: SortBy,
}

impl FilterState {
    pub fn with_kind(mut self, kind: ContentKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_time_window(mut self, time_window: TimeWindow) -> Self {
        self.time_window = time_window;
        self
    }

    pub fn with_sort(mut self, sort_by: SortBy) -> Self {
        self.sort_by = sort_by;
        self
    }

    /// Whether any option differs from the unfiltered default
    pub fn is_active(&self) -> bool {
        *self != Self::default()
    }

    /// Apply predicates then sort order to `items`
    pub fn apply(&self, items: &[Item], reference: DateTime<Utc>) -> Result<Vec<Item>, FilterError> {
        let cutoff = self.time_window.cutoff(reference)?;
        let mut kept: Vec<Item> = items
            .iter()
            .filter(|item| self.kind.is_none() || self.kind == Some(item.kind))
            .filter(|item| match cutoff {
                Some(cutoff) => item.created_at >= cutoff,
                None => true,
            })
            .cloned()
            .collect();
        self.sort_by.sort(&mut kept);
        Ok(kept)
    }
}
