//! # feedpager - paginated feed state
//!
//! A feed instance owns one immutable [`PaginationState`] snapshot that is
//! replaced on every transition. The snapshot is produced by a
//! [`PaginationManager`] which composes the pieces of this crate:
//!
//! - **Model** (`model`): the snapshot itself, the overlay recomputation and
//!   the load-more state machine
//! - **Resolver** (`core::resolver`): picks client-side slicing or a remote
//!   fetch for the next page
//! - **Validator** (`core::validator`): pure diagnostics over any snapshot
//! - **Manager** (`core::manager`): accepts intents, stores snapshots and
//!   notifies subscribers
//!
//! ## Example Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use feedpager::{
//!     core::{feed_config::FeedConfig, manager::PaginationManager},
//!     model::pagination::PaginationMode,
//!     repositories::content::InMemoryRepository,
//!     test_helpers::fixture_items,
//! };
//!
//! let repository = Arc::new(InMemoryRepository::new(fixture_items(40)));
//! let manager = PaginationManager::new(FeedConfig::default(), repository).unwrap();
//!
//! manager
//!     .update_items(fixture_items(40), PaginationMode::Client)
//!     .unwrap();
//! assert_eq!(manager.get_state().page_items.len(), 15);
//! ```
//!
//! ## Modules
//!
//! - [`domain`] - Items, filters and search results
//! - [`model`] - Snapshot types and the load-more state machine
//! - [`core`] - Manager, resolver, validator, subscriptions and errors
//! - [`repositories`] - Remote content source abstraction
//! - [`infrastructure`] - CLI and configuration loading for the binary
//! - [`utils`] - Logging, panic handling and paths

pub mod core;
pub mod domain;
pub mod infrastructure;
pub mod model;
pub mod repositories;
pub mod test_helpers;
pub mod utils;

// Re-exports for convenience
pub use crate::core::{
    feed_config::FeedConfig,
    manager::PaginationManager,
    validator::{validate, Diagnostics},
};
pub use model::pagination::PaginationState;

/// Result type used by the binary
pub type Result<T> = color_eyre::eyre::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
