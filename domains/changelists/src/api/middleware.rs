//! Changelists domain state and auth backend integration

use axum::extract::FromRef;
use depot_auth::AuthBackend;

use crate::service::ChangelistService;

/// Application state for the Changelists domain
#[derive(Clone)]
pub struct ChangelistsState {
    pub changelists: ChangelistService,
    pub auth: AuthBackend,
}

impl FromRef<ChangelistsState> for AuthBackend {
    fn from_ref(state: &ChangelistsState) -> Self {
        state.auth.clone()
    }
}
