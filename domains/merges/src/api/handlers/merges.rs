//! Branch merge API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use depot_auth::AuthUser;
use depot_common::{Result, ValidatedJson};
use depot_domain::entities::BranchMerge;
use uuid::Uuid;

use crate::api::middleware::MergesState;
use crate::service::{CreateMergeRequest, UpdateMergeRequest};

/// List the merges of a project, newest first
pub async fn list_merges(
    AuthUser(ctx): AuthUser,
    State(state): State<MergesState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<BranchMerge>>> {
    let merges = state.merges.list_merges(&ctx, project_id).await?;
    Ok(Json(merges))
}

/// Open a branch merge and seed its jobs
pub async fn create_merge(
    AuthUser(ctx): AuthUser,
    State(state): State<MergesState>,
    Path(project_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateMergeRequest>,
) -> Result<(StatusCode, Json<BranchMerge>)> {
    let merge = state.merges.create_merge(&ctx, project_id, req).await?;
    Ok((StatusCode::CREATED, Json(merge)))
}

pub async fn get_merge(
    AuthUser(ctx): AuthUser,
    State(state): State<MergesState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BranchMerge>> {
    let merge = state.merges.get_merge(&ctx, id).await?;
    Ok(Json(merge))
}

/// Update a merge; completion goes through the submit gate
pub async fn update_merge(
    AuthUser(ctx): AuthUser,
    State(state): State<MergesState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateMergeRequest>,
) -> Result<Json<BranchMerge>> {
    let merge = state.merges.update_merge(&ctx, id, req).await?;
    Ok(Json(merge))
}
