//! Domain layer
//!
//! Plain data describing feed content and the overlays applied to it:
//! - Feed items and their identifiers
//! - Filter options (content kind, time window, sort order)
//! - Search state and ranked result sets

pub mod filter;
pub mod item;
pub mod search;
