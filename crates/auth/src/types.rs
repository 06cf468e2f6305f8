//! Actor role types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Role of the calling actor, as asserted by the identity provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Admin,
    #[default]
    Member,
}

impl ActorRole {
    /// Map a role claim onto a depot role. Anything but `admin` is a plain member.
    pub fn from_claim(role: &str) -> Self {
        if role.eq_ignore_ascii_case("admin") {
            ActorRole::Admin
        } else {
            ActorRole::Member
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Admin => "admin",
            ActorRole::Member => "member",
        }
    }
}

impl fmt::Display for ActorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
