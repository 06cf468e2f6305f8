//! Asset lock API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use depot_auth::AuthUser;
use depot_common::{Result, ValidatedJson};
use depot_domain::entities::{AssetLock, LockOutcome};
use uuid::Uuid;

use crate::api::middleware::CatalogState;
use crate::service::LockRequest;

pub async fn list_locks(
    AuthUser(ctx): AuthUser,
    State(state): State<CatalogState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<AssetLock>>> {
    let locks = state.catalog.list_locks(&ctx, project_id).await?;
    Ok(Json(locks))
}

/// Lock an asset; `previous_holder` is set on takeover
pub async fn lock_asset(
    AuthUser(ctx): AuthUser,
    State(state): State<CatalogState>,
    ValidatedJson(req): ValidatedJson<LockRequest>,
) -> Result<(StatusCode, Json<LockOutcome>)> {
    let outcome = state.catalog.lock_asset(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// Release a lock (holder or admin)
pub async fn release_lock(
    AuthUser(ctx): AuthUser,
    State(state): State<CatalogState>,
    Path(asset_id): Path<Uuid>,
) -> Result<StatusCode> {
    state.catalog.release_lock(&ctx, asset_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
