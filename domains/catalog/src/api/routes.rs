//! Route definitions for Catalog domain API

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use super::handlers::{assets, branches, locks, permissions, projects, reviews, workspaces};
use super::middleware::CatalogState;

/// Create all Catalog domain API routes
pub fn routes() -> Router<CatalogState> {
    Router::new()
        // Projects
        .route(
            "/v1/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/v1/projects/{id}",
            get(projects::get_project).patch(projects::update_project),
        )
        // Branches
        .route(
            "/v1/projects/{id}/branches",
            get(branches::list_branches).post(branches::create_branch),
        )
        .route("/v1/branches/{id}", patch(branches::update_branch))
        // Workspaces
        .route(
            "/v1/projects/{id}/workspaces",
            get(workspaces::list_workspaces),
        )
        .route("/v1/workspaces", post(workspaces::create_workspace))
        .route("/v1/workspaces/{id}", get(workspaces::get_workspace))
        // Assets and versions
        .route("/v1/projects/{id}/assets", get(assets::list_assets))
        .route("/v1/assets", post(assets::create_asset))
        .route("/v1/assets/{id}", get(assets::get_asset))
        .route("/v1/assets/{id}/versions", post(assets::create_version))
        .route(
            "/v1/assets/{id}/versions/upload",
            post(assets::upload_version),
        )
        // Permissions
        .route(
            "/v1/projects/{id}/permissions",
            get(permissions::list_permissions).post(permissions::create_permission),
        )
        .route(
            "/v1/permissions/{id}",
            put(permissions::update_permission).delete(permissions::delete_permission),
        )
        // Locks
        .route("/v1/projects/{id}/locks", get(locks::list_locks))
        .route("/v1/locks", post(locks::lock_asset))
        .route("/v1/locks/{asset_id}", delete(locks::release_lock))
        // Reviews
        .route(
            "/v1/asset-versions/{id}/reviews",
            post(reviews::request_review),
        )
        .route("/v1/reviews/pending", get(reviews::list_pending_reviews))
        .route("/v1/reviews/{id}", patch(reviews::update_review))
}
