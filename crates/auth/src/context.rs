//! Authorization context for the calling actor
//!
//! One context is bound to every unit of work. Ownership checks and
//! admin-only gates are expressed here so every domain applies them
//! the same way.

use depot_common::{Error, Result};
use uuid::Uuid;

use crate::types::ActorRole;

/// Identity of the principal an operation runs as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub username: Option<String>,
    pub role: ActorRole,
}

impl AuthContext {
    pub fn new(user_id: Uuid, role: ActorRole) -> Self {
        Self {
            user_id,
            username: None,
            role,
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Identity for out-of-band job execution.
    ///
    /// Runs with the admin role. Falls back to the nil UUID when no
    /// automation user is configured.
    pub fn automation(user_id: Option<Uuid>) -> Self {
        Self {
            user_id: user_id.unwrap_or_else(Uuid::nil),
            username: Some("merge-automation".to_string()),
            role: ActorRole::Admin,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == ActorRole::Admin
    }

    /// Owner of the resource, or an admin
    pub fn can_manage(&self, owner_id: Uuid) -> bool {
        self.user_id == owner_id || self.is_admin()
    }

    pub fn require_admin(&self) -> Result<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::PermissionDenied("Admin role required".to_string()))
        }
    }

    pub fn require_owner_or_admin(&self, owner_id: Uuid, what: &str) -> Result<()> {
        if self.can_manage(owner_id) {
            Ok(())
        } else {
            Err(Error::PermissionDenied(format!(
                "Cannot modify {} you do not own",
                what
            )))
        }
    }
}
