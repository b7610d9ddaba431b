//! Remote content sources

pub mod content;
