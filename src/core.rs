//! Core pagination machinery
//!
//! This module contains the parts that turn intents into snapshots:
//! - Typed errors and library configuration
//! - The load-more strategy resolver
//! - The side-effect-free state validator
//! - Subscriber registry with its reentrancy guard
//! - The pagination manager facade

pub mod error;
pub mod feed_config;
pub mod manager;
pub mod resolver;
pub mod subscription;
pub mod validator;
