//! Infrastructure layer
//!
//! This module handles what the demo binary needs around the library:
//! - CLI argument processing
//! - Layered configuration loading
//! - The demo catalog served by the in-memory repository

pub mod cli;
pub mod config;
pub mod demo;
