//! Authorization context for the Asset Depot API
//!
//! Provides JWT validation, the per-call [`AuthContext`] (actor id + role),
//! and axum extractors that work with any domain state implementing
//! `FromRef<S>` for `AuthBackend`.

mod backend;
mod claims;
mod config;
mod context;
mod error;
mod extractors;
mod jwt;
mod types;

pub use backend::AuthBackend;
pub use claims::DepotClaims;
pub use config::AuthConfig;
pub use context::AuthContext;
pub use error::AuthError;
pub use extractors::{AdminUser, AuthUser};
pub use types::ActorRole;
