//! Shelf API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use depot_auth::AuthUser;
use depot_common::{Result, ValidatedJson};
use depot_domain::entities::Shelf;
use uuid::Uuid;

use crate::api::middleware::ChangelistsState;
use crate::service::CreateShelfRequest;

pub async fn list_shelves(
    AuthUser(ctx): AuthUser,
    State(state): State<ChangelistsState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<Shelf>>> {
    let shelves = state.changelists.list_shelves(&ctx, project_id).await?;
    Ok(Json(shelves))
}

pub async fn create_shelf(
    AuthUser(ctx): AuthUser,
    State(state): State<ChangelistsState>,
    ValidatedJson(req): ValidatedJson<CreateShelfRequest>,
) -> Result<(StatusCode, Json<Shelf>)> {
    let shelf = state.changelists.create_shelf(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(shelf)))
}

/// Delete a shelf (creator or admin)
pub async fn delete_shelf(
    AuthUser(ctx): AuthUser,
    State(state): State<ChangelistsState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.changelists.delete_shelf(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
