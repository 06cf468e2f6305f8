//! Route definitions for Changelists domain API

use axum::{
    routing::{delete, get, post},
    Router,
};

use super::handlers::{changelists, shelves};
use super::middleware::ChangelistsState;

/// Create all Changelists domain API routes
pub fn routes() -> Router<ChangelistsState> {
    Router::new()
        .route("/v1/projects/{id}/shelves", get(shelves::list_shelves))
        .route("/v1/shelves", post(shelves::create_shelf))
        .route("/v1/shelves/{id}", delete(shelves::delete_shelf))
        .route(
            "/v1/projects/{id}/changelists",
            get(changelists::list_changelists),
        )
        .route("/v1/changelists", post(changelists::create_changelist))
        .route(
            "/v1/changelists/{id}",
            get(changelists::get_changelist).patch(changelists::update_changelist),
        )
        .route(
            "/v1/changelists/{id}/cancel",
            post(changelists::cancel_changelist),
        )
        .route("/v1/changelists/{id}/items", post(changelists::add_item))
        .route(
            "/v1/changelists/{id}/items/{item_id}",
            delete(changelists::remove_item),
        )
        .route(
            "/v1/changelists/{id}/submit",
            post(changelists::submit_changelist),
        )
}
