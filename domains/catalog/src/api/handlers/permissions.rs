//! Permission API handlers (admin only)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use depot_auth::AdminUser;
use depot_common::{Result, ValidatedJson};
use depot_domain::entities::Permission;
use uuid::Uuid;

use crate::api::middleware::CatalogState;
use crate::service::{CreatePermissionRequest, UpdatePermissionRequest};

pub async fn list_permissions(
    AdminUser(ctx): AdminUser,
    State(state): State<CatalogState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<Permission>>> {
    let permissions = state.catalog.list_permissions(&ctx, project_id).await?;
    Ok(Json(permissions))
}

pub async fn create_permission(
    AdminUser(ctx): AdminUser,
    State(state): State<CatalogState>,
    Path(project_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreatePermissionRequest>,
) -> Result<(StatusCode, Json<Permission>)> {
    let permission = state
        .catalog
        .create_permission(&ctx, project_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(permission)))
}

pub async fn update_permission(
    AdminUser(ctx): AdminUser,
    State(state): State<CatalogState>,
    Path(id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdatePermissionRequest>,
) -> Result<Json<Permission>> {
    let permission = state.catalog.update_permission(&ctx, id, req).await?;
    Ok(Json(permission))
}

pub async fn delete_permission(
    AdminUser(ctx): AdminUser,
    State(state): State<CatalogState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.catalog.delete_permission(&ctx, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
