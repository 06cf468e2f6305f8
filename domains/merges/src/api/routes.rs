//! Route definitions for Merges domain API

use axum::{
    routing::{get, patch},
    Router,
};

use super::handlers::{conflicts, jobs, merges};
use super::middleware::MergesState;

/// Create all Merges domain API routes
pub fn routes() -> Router<MergesState> {
    Router::new()
        .route(
            "/v1/projects/{id}/branch-merges",
            get(merges::list_merges).post(merges::create_merge),
        )
        .route(
            "/v1/branch-merges/{id}",
            get(merges::get_merge).patch(merges::update_merge),
        )
        .route(
            "/v1/branch-merges/{id}/conflicts",
            get(conflicts::list_conflicts).post(conflicts::create_conflict),
        )
        .route("/v1/merge-conflicts/{id}", patch(conflicts::update_conflict))
        .route(
            "/v1/branch-merges/{id}/jobs",
            get(jobs::list_jobs).post(jobs::create_job),
        )
        .route(
            "/v1/merge-jobs/{id}",
            get(jobs::get_job).patch(jobs::update_job),
        )
}
