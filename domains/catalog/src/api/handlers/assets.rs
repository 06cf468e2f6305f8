//! Asset and asset version API handlers

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use depot_auth::AuthUser;
use depot_common::{Error, Result, ValidatedJson};
use depot_domain::entities::{AssetVersion, AssetWithVersions};
use uuid::Uuid;
use validator::Validate;

use crate::api::middleware::CatalogState;
use crate::service::{CreateAssetRequest, CreateVersionRequest, UploadVersionParams};

pub async fn list_assets(
    AuthUser(ctx): AuthUser,
    State(state): State<CatalogState>,
    Path(project_id): Path<Uuid>,
) -> Result<Json<Vec<AssetWithVersions>>> {
    let assets = state.catalog.list_assets(&ctx, project_id).await?;
    Ok(Json(assets))
}

pub async fn create_asset(
    AuthUser(ctx): AuthUser,
    State(state): State<CatalogState>,
    ValidatedJson(req): ValidatedJson<CreateAssetRequest>,
) -> Result<(StatusCode, Json<AssetWithVersions>)> {
    let asset = state.catalog.create_asset(&ctx, req).await?;
    Ok((StatusCode::CREATED, Json(asset)))
}

/// Asset with versions, newest version first
pub async fn get_asset(
    AuthUser(ctx): AuthUser,
    State(state): State<CatalogState>,
    Path(id): Path<Uuid>,
) -> Result<Json<AssetWithVersions>> {
    let asset = state.catalog.get_asset(&ctx, id).await?;
    Ok(Json(asset))
}

pub async fn create_version(
    AuthUser(ctx): AuthUser,
    State(state): State<CatalogState>,
    Path(asset_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<CreateVersionRequest>,
) -> Result<(StatusCode, Json<AssetVersion>)> {
    let version = state
        .catalog
        .create_asset_version(&ctx, asset_id, req)
        .await?;
    Ok((StatusCode::CREATED, Json(version)))
}

/// Multipart upload: the `file` field carries the content, version
/// fields come from the query string
pub async fn upload_version(
    AuthUser(ctx): AuthUser,
    State(state): State<CatalogState>,
    Path(asset_id): Path<Uuid>,
    Query(params): Query<UploadVersionParams>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<AssetVersion>)> {
    params
        .validate()
        .map_err(|e| Error::InvalidArgument(format!("Validation failed: {}", e)))?;

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidArgument(e.body_text()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or("upload").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidArgument(e.body_text()))?;
        upload = Some((filename, bytes));
        break;
    }
    let (filename, bytes) =
        upload.ok_or_else(|| Error::InvalidArgument("Missing 'file' field".to_string()))?;

    let version = state
        .catalog
        .upload_asset_version(&ctx, asset_id, params, &filename, &bytes)
        .await?;
    Ok((StatusCode::CREATED, Json(version)))
}
