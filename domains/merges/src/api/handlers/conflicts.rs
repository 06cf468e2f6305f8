//! Merge conflict API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use depot_auth::AuthUser;
use depot_common::{Result, ValidatedJson};
use depot_domain::entities::MergeConflict;
use uuid::Uuid;

use crate::api::middleware::MergesState;
use crate::service::{CreateConflictRequest, UpdateConflictRequest};

pub async fn list_conflicts(
    AuthUser(ctx): AuthUser,
    State(state): State<MergesState>,
    Path(merge_id): Path<Uuid>,
) -> Result<Json<Vec<MergeConflict>>> {
    let conflicts = state.merges.list_conflicts(&ctx, merge_id).await?;
    Ok(Json(conflicts))
}

pub async fn create_conflict(
    AuthUser(ctx): AuthUser,
    State(state): State<MergesState>,
    Path(merge_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateConflictRequest>,
) -> Result<(StatusCode, Json<MergeConflict>)> {
    let conflict = state.merges.create_conflict(&ctx, merge_id, req).await?;
    Ok((StatusCode::CREATED, Json(conflict)))
}

pub async fn update_conflict(
    AuthUser(ctx): AuthUser,
    State(state): State<MergesState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateConflictRequest>,
) -> Result<Json<MergeConflict>> {
    let conflict = state.merges.update_conflict(&ctx, id, req).await?;
    Ok(Json(conflict))
}
