//! # bazaar-common
//!
//! Shared types, configuration, error handling, and utilities used across all Bazaar crates.
//! This is the foundation layer: no delivery logic, just primitives and contracts.

pub mod any_row;
pub mod config;
pub mod error;
pub mod models;
pub mod notification;
pub mod validation;

pub use error::{BazaarError, BazaarResult};
