use chrono::{DateTime, Utc};
use derive_deref::Deref;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifier assigned to an item by the remote store
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Deref)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Kinds of content a feed can hold
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ContentKind {
    Post,
    Track,
    Playlist,
}

/// A single entry of a feed
///
/// Items are opaque to the pagination machinery apart from the fields the
/// filter and sort overlay read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub kind: ContentKind,
    pub title: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub play_count: u64,
}

impl Item {
    pub fn new(
        id: impl Into<ItemId>,
        kind: ContentKind,
        title: impl Into<String>,
        author: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            title: title.into(),
            author: author.into(),
            created_at,
            like_count: 0,
            play_count: 0,
        }
    }

    pub fn with_likes(mut self, like_count: u64) -> Self {
        self.like_count = like_count;
        self
    }

    pub fn with_plays(mut self, play_count: u64) -> Self {
        self.play_count = play_count;
        self
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}
