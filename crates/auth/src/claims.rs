//! JWT claims types

use serde::{Deserialize, Serialize};

/// JWT claims asserted by the depot identity provider
#[derive(Debug, Serialize, Deserialize)]
pub struct DepotClaims {
    /// Subject (user ID)
    pub sub: String,
    /// Display name
    #[serde(default)]
    pub username: Option<String>,
    /// Role claim, `admin` or anything else
    #[serde(default)]
    pub role: String,
    /// Issued at
    #[serde(default)]
    pub iat: Option<u64>,
    /// Expires at
    pub exp: u64,
}
