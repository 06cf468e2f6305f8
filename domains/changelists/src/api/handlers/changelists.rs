//! Changelist API handlers
//!
//! Every response is the resolved changelist view.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use depot_auth::AuthUser;
use depot_common::{Result, ValidatedJson};
use depot_domain::entities::ChangelistView;
use uuid::Uuid;

use crate::api::middleware::ChangelistsState;
use crate::service::{
    AddItemRequest, CreateChangelistRequest, SubmitChangelistRequest, UpdateChangelistRequest,
};

pub async fn list_changelists(
    AuthUser(ctx): AuthUser,
    State(state): State<ChangelistsState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<ChangelistView>>> {
    let views = state.changelists.list_changelists(&ctx, project_id).await?;
    Ok(Json(views))
}

pub async fn create_changelist(
    AuthUser(ctx): AuthUser,
    State(state): State<ChangelistsState>,
    ValidatedJson(req): ValidatedJson<CreateChangelistRequest>,
) -> Result<(StatusCode, Json<ChangelistView>)> {
    let view = state.changelists.create_changelist(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn get_changelist(
    AuthUser(ctx): AuthUser,
    State(state): State<ChangelistsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChangelistView>> {
    let view = state.changelists.get_changelist(&ctx, id).await?;
    Ok(Json(view))
}

pub async fn update_changelist(
    AuthUser(ctx): AuthUser,
    State(state): State<ChangelistsState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateChangelistRequest>,
) -> Result<Json<ChangelistView>> {
    let view = state.changelists.update_changelist(&ctx, id, req).await?;
    Ok(Json(view))
}

pub async fn cancel_changelist(
    AuthUser(ctx): AuthUser,
    State(state): State<ChangelistsState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ChangelistView>> {
    let view = state.changelists.cancel_changelist(&ctx, id).await?;
    Ok(Json(view))
}

/// Add or replace an item; upserts on the asset version
pub async fn add_item(
    AuthUser(ctx): AuthUser,
    State(state): State<ChangelistsState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<AddItemRequest>,
) -> Result<Json<ChangelistView>> {
    let view = state.changelists.add_item(&ctx, id, req).await?;
    Ok(Json(view))
}

pub async fn remove_item(
    AuthUser(ctx): AuthUser,
    State(state): State<ChangelistsState>,
    Path((id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<ChangelistView>> {
    let view = state.changelists.remove_item(&ctx, id, item_id).await?;
    Ok(Json(view))
}

pub async fn submit_changelist(
    AuthUser(ctx): AuthUser,
    State(state): State<ChangelistsState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<SubmitChangelistRequest>,
) -> Result<Json<ChangelistView>> {
    let view = state.changelists.submit_changelist(&ctx, id, req).await?;
    Ok(Json(view))
}
