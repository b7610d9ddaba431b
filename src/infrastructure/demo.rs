use chrono::{DateTime, Duration, Utc};

use crate::domain::item::{ContentKind, Item};

const WORDS: [&str; 8] = [
    "midnight", "harbor", "static", "velvet", "northern", "signal", "ember", "tidal",
];
const AUTHORS: [&str; 5] = ["ayumi", "bastien", "carmen", "dmitri", "eun-ji"];

/// Deterministic catalog of `count` items, newest first
///
/// Items are spread three hours apart starting at `now`, so every time window
/// of the filter bar keeps a different share of the catalog.
pub fn catalog(count: usize, now: DateTime<Utc>) -> Vec<Item> {
    (0..count)
        .map(|i| {
            let kind = match i % 4 {
                0 | 1 => ContentKind::Post,
                2 => ContentKind::Track,
                _ => ContentKind::Playlist,
            };
            let title = format!(
                "{} {} #{i}",
                WORDS[i % WORDS.len()],
                WORDS[(i / WORDS.len()) % WORDS.len()]
            );
            let hours = i64::try_from(i).unwrap_or(i64::MAX / 4).saturating_mul(3);
            let created_at = now
                .checked_sub_signed(Duration::hours(hours))
                .unwrap_or(now);
            Item::new(
                format!("demo-{i}"),
                kind,
                title,
                AUTHORS[i % AUTHORS.len()],
                created_at,
            )
            .with_likes(((i * 37) % 101) as u64)
            .with_plays(((i * 53) % 997) as u64)
        })
        .collect()
}
