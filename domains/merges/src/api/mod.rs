//! API layer for the Merges domain
//!
//! Contains HTTP handlers, routes, and domain state definition.

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use middleware::MergesState;
pub use routes::routes;
