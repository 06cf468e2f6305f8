//! Concrete authentication backend
//!
//! The identity provider is trusted as given: a valid token yields the
//! actor id and role without any store lookup.

use uuid::Uuid;

use crate::config::AuthConfig;
use crate::context::AuthContext;
use crate::error::AuthError;
use crate::jwt::validate_jwt_token;
use crate::types::ActorRole;

/// Concrete authentication backend.
///
/// Domain states expose this via `FromRef`:
/// ```ignore
/// impl FromRef<MyDomainState> for AuthBackend {
///     fn from_ref(state: &MyDomainState) -> Self {
///         state.auth.clone()
///     }
/// }
/// ```
#[derive(Clone, Debug)]
pub struct AuthBackend {
    config: AuthConfig,
}

impl AuthBackend {
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    /// Authenticate a bearer token into an [`AuthContext`]
    pub fn authenticate_jwt(&self, token: &str) -> Result<AuthContext, AuthError> {
        let claims = validate_jwt_token(token, &self.config)?;

        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidUserId)?;
        let mut context = AuthContext::new(user_id, ActorRole::from_claim(&claims.role));
        if let Some(username) = claims.username {
            context = context.with_username(username);
        }

        tracing::debug!(user_id = %user_id, role = %context.role, "Authenticated actor");
        Ok(context)
    }
}
