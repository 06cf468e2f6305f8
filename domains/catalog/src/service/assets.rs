//! Assets and their versions
//!
//! Uploaded content goes through the [`BlobStore`](crate::blob::BlobStore);
//! the version row only keeps the returned locator in `file_path`.

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use depot_auth::AuthContext;
use depot_common::{Error, Result, RepositoryError};
use depot_db::UnitOfWork;
use depot_domain::entities::{Asset, AssetVersion, AssetWithVersions};

use super::{require_asset, require_branch_in, require_project, CatalogService};

fn empty_metadata() -> Value {
    serde_json::json!({})
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateAssetRequest {
    pub project_id: Uuid,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 64))]
    pub asset_type: String,
    #[serde(default = "empty_metadata")]
    pub metadata: Value,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateVersionRequest {
    #[validate(range(min = 1))]
    pub version_number: i32,
    pub branch_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Query parameters accompanying a multipart upload
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UploadVersionParams {
    #[validate(range(min = 1))]
    pub version_number: i32,
    pub branch_id: Option<Uuid>,
    pub notes: Option<String>,
}

async fn with_versions(
    uow: &mut dyn UnitOfWork,
    asset: Asset,
    newest_first: bool,
) -> Result<AssetWithVersions> {
    let mut versions = uow.list_asset_versions(asset.id).await?;
    if newest_first {
        versions.reverse();
    }
    Ok(AssetWithVersions { asset, versions })
}

impl CatalogService {
    pub async fn list_assets(
        &self,
        actor: &AuthContext,
        project_id: Uuid,
    ) -> Result<Vec<AssetWithVersions>> {
        let mut uow = self.store.begin(actor).await?;
        let assets = uow.list_assets(project_id).await?;
        let mut resolved = Vec::with_capacity(assets.len());
        for asset in assets {
            resolved.push(with_versions(uow.as_mut(), asset, false).await?);
        }
        uow.commit().await?;
        Ok(resolved)
    }

    /// Versions newest first
    pub async fn get_asset(
        &self,
        actor: &AuthContext,
        asset_id: Uuid,
    ) -> Result<AssetWithVersions> {
        let mut uow = self.store.begin(actor).await?;
        let asset = require_asset(uow.as_mut(), asset_id).await?;
        let resolved = with_versions(uow.as_mut(), asset, true).await?;
        uow.commit().await?;
        Ok(resolved)
    }

    pub async fn create_asset(
        &self,
        actor: &AuthContext,
        request: CreateAssetRequest,
    ) -> Result<AssetWithVersions> {
        let asset = Asset::new(
            request.project_id,
            request.name,
            request.asset_type,
            request.metadata,
            actor.user_id,
        )?;

        let mut uow = self.store.begin(actor).await?;
        require_project(uow.as_mut(), asset.project_id).await?;
        uow.insert_asset(&asset).await?;
        uow.commit().await?;

        tracing::info!(asset_id = %asset.id, project_id = %asset.project_id, "Asset created");
        Ok(AssetWithVersions {
            asset,
            versions: Vec::new(),
        })
    }

    pub async fn create_asset_version(
        &self,
        actor: &AuthContext,
        asset_id: Uuid,
        request: CreateVersionRequest,
    ) -> Result<AssetVersion> {
        let version = AssetVersion::new(
            asset_id,
            request.version_number,
            request.branch_id,
            None,
            request.notes,
        )?;

        let mut uow = self.store.begin(actor).await?;
        let asset = require_asset(uow.as_mut(), asset_id).await?;
        if let Some(branch_id) = version.branch_id {
            require_branch_in(uow.as_mut(), branch_id, asset.project_id).await?;
        }
        uow.insert_asset_version(&version).await.map_err(|e| match e {
            RepositoryError::AlreadyExists => Error::InvalidArgument(format!(
                "Version {} already exists for this asset",
                version.version_number
            )),
            other => other.into(),
        })?;
        uow.commit().await?;
        Ok(version)
    }

    /// Store the bytes, then upsert the (asset, version_number) row with
    /// the returned locator
    pub async fn upload_asset_version(
        &self,
        actor: &AuthContext,
        asset_id: Uuid,
        params: UploadVersionParams,
        filename: &str,
        bytes: &[u8],
    ) -> Result<AssetVersion> {
        let mut uow = self.store.begin(actor).await?;
        let asset = require_asset(uow.as_mut(), asset_id).await?;
        if let Some(branch_id) = params.branch_id {
            require_branch_in(uow.as_mut(), branch_id, asset.project_id).await?;
        }

        let locator = self
            .blobs
            .store(asset.project_id, asset.id, filename, bytes)
            .await?;
        let version = AssetVersion::new(
            asset.id,
            params.version_number,
            params.branch_id,
            Some(locator),
            params.notes,
        )?;
        let stored = uow.upsert_asset_version(&version).await?;
        uow.commit().await?;

        tracing::info!(
            asset_id = %asset.id,
            version_number = stored.version_number,
            bytes = bytes.len(),
            "Asset version uploaded"
        );
        Ok(stored)
    }
}
