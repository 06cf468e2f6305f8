//! Merges domain state and auth backend integration

use axum::extract::FromRef;
use depot_auth::AuthBackend;

use crate::service::MergeService;

/// Application state for the Merges domain
#[derive(Clone)]
pub struct MergesState {
    pub merges: MergeService,
    pub auth: AuthBackend,
}

impl FromRef<MergesState> for AuthBackend {
    fn from_ref(state: &MergesState) -> Self {
        state.auth.clone()
    }
}
