//! Merge job API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use depot_auth::AuthUser;
use depot_common::{Result, ValidatedJson};
use depot_domain::entities::MergeJob;
use uuid::Uuid;

use crate::api::middleware::MergesState;
use crate::service::{CreateJobRequest, UpdateJobRequest};

/// Jobs of a merge in creation order
pub async fn list_jobs(
    AuthUser(ctx): AuthUser,
    State(state): State<MergesState>,
    Path(merge_id): Path<Uuid>,
) -> Result<Json<Vec<MergeJob>>> {
    let jobs = state.merges.list_jobs(&ctx, merge_id).await?;
    Ok(Json(jobs))
}

pub async fn create_job(
    AuthUser(ctx): AuthUser,
    State(state): State<MergesState>,
    Path(merge_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateJobRequest>,
) -> Result<(StatusCode, Json<MergeJob>)> {
    let job = state.merges.create_job(&ctx, merge_id, req).await?;
    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn get_job(
    AuthUser(ctx): AuthUser,
    State(state): State<MergesState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MergeJob>> {
    let job = state.merges.get_job(&ctx, id).await?;
    Ok(Json(job))
}

/// Operator settlement or controlled re-run of a job
pub async fn update_job(
    AuthUser(ctx): AuthUser,
    State(state): State<MergesState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateJobRequest>,
) -> Result<Json<MergeJob>> {
    let job = state.merges.update_job(&ctx, id, req).await?;
    Ok(Json(job))
}
