//! Workspace API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use depot_auth::AuthUser;
use depot_common::{Result, ValidatedJson};
use depot_domain::entities::Workspace;
use uuid::Uuid;

use crate::api::middleware::CatalogState;
use crate::service::CreateWorkspaceRequest;

/// Workspaces visible to the caller
pub async fn list_workspaces(
    AuthUser(ctx): AuthUser,
    State(state): State<CatalogState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<Workspace>>> {
    let workspaces = state.catalog.list_workspaces(&ctx, project_id).await?;
    Ok(Json(workspaces))
}

pub async fn create_workspace(
    AuthUser(ctx): AuthUser,
    State(state): State<CatalogState>,
    ValidatedJson(req): ValidatedJson<CreateWorkspaceRequest>,
) -> Result<(StatusCode, Json<Workspace>)> {
    let workspace = state.catalog.create_workspace(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(workspace)))
}

pub async fn get_workspace(
    AuthUser(ctx): AuthUser,
    State(state): State<CatalogState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Workspace>> {
    let workspace = state.catalog.get_workspace(&ctx, id).await?;
    Ok(Json(workspace))
}
