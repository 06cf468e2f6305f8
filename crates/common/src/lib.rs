//! Shared utilities, configuration, and error handling for Asset Depot
//!
//! This crate provides common functionality used across the depot services:
//! - Configuration management following 12-factor principles
//! - The error taxonomy and its HTTP mapping
//! - Repository and state machine error types
//! - Request extractors

pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod state;

pub use config::{Config, LockPolicy, StoreBackend};
pub use db::RepositoryError;
pub use error::{Error, Result};
pub use extractors::ValidatedJson;
pub use state::StateError;
