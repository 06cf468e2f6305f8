//! API layer for the Changelists domain
//!
//! Contains HTTP handlers, routes, and domain state definition.

pub mod handlers;
pub mod middleware;
pub mod routes;

pub use middleware::ChangelistsState;
pub use routes::routes;
