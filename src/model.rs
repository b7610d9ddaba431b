//! Feed state model
//!
//! This module follows the Elm Architecture pattern:
//! - Snapshots are values; every transition builds a new one
//! - The load-more state machine changes only through its `update` function
//! - Neither module knows about the manager that drives it

pub mod load_more;
pub mod pagination;
