//! Branch API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use depot_auth::AuthUser;
use depot_common::{Result, ValidatedJson};
use depot_domain::entities::Branch;
use uuid::Uuid;

use crate::api::middleware::CatalogState;
use crate::service::{CreateBranchRequest, UpdateBranchRequest};

pub async fn list_branches(
    AuthUser(ctx): AuthUser,
    State(state): State<CatalogState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<Branch>>> {
    let branches = state.catalog.list_branches(&ctx, project_id).await?;
    Ok(Json(branches))
}

pub async fn create_branch(
    AuthUser(ctx): AuthUser,
    State(state): State<CatalogState>,
    Path(project_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateBranchRequest>,
) -> Result<(StatusCode, Json<Branch>)> {
    let branch = state.catalog.create_branch(&ctx, project_id, req).await?;
    Ok((StatusCode::CREATED, Json(branch)))
}

pub async fn update_branch(
    AuthUser(ctx): AuthUser,
    State(state): State<CatalogState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateBranchRequest>,
) -> Result<Json<Branch>> {
    let branch = state.catalog.update_branch(&ctx, id, req).await?;
    Ok(Json(branch))
}
