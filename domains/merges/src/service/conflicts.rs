//! Merge conflict CRUD

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use depot_auth::AuthContext;
use depot_common::{Error, Result};
use depot_db::UnitOfWork;
use depot_domain::entities::MergeConflict;

use super::completion::lock_merge;
use super::MergeService;

async fn find_conflict(uow: &mut dyn UnitOfWork, conflict_id: Uuid) -> Result<MergeConflict> {
    uow.find_merge_conflict(conflict_id)
        .await?
        .ok_or_else(|| Error::NotFound("Merge conflict not found".to_string()))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateConflictRequest {
    pub asset_id: Option<Uuid>,
    pub asset_version_id: Option<Uuid>,
    #[validate(length(min = 1, max = 4000))]
    pub description: String,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateConflictRequest {
    #[validate(length(min = 1, max = 4000))]
    pub description: Option<String>,
    pub resolution: Option<String>,
    pub resolved: Option<bool>,
}

impl MergeService {
    pub async fn list_conflicts(
        &self,
        actor: &AuthContext,
        merge_id: Uuid,
    ) -> Result<Vec<MergeConflict>> {
        let mut uow = self.store.begin(actor).await?;
        uow.find_branch_merge(merge_id)
            .await?
            .ok_or_else(|| Error::NotFound("Branch merge not found".to_string()))?;
        let conflicts = uow.list_merge_conflicts(merge_id).await?;
        uow.commit().await?;
        Ok(conflicts)
    }

    pub async fn create_conflict(
        &self,
        actor: &AuthContext,
        merge_id: Uuid,
        request: CreateConflictRequest,
    ) -> Result<MergeConflict> {
        let mut uow = self.store.begin(actor).await?;
        let merge = lock_merge(uow.as_mut(), merge_id).await?;

        if let Some(asset_id) = request.asset_id {
            let asset = uow
                .find_asset(asset_id)
                .await?
                .ok_or_else(|| Error::NotFound("Asset not found".to_string()))?;
            if asset.project_id != merge.project_id {
                return Err(Error::InvalidArgument(
                    "Asset does not belong to the merge's project".to_string(),
                ));
            }
        }
        if let Some(version_id) = request.asset_version_id {
            let version = uow
                .find_asset_version(version_id)
                .await?
                .ok_or_else(|| Error::NotFound("Asset version not found".to_string()))?;
            if request.asset_id.is_some_and(|asset_id| asset_id != version.asset_id) {
                return Err(Error::InvalidArgument(
                    "Asset version does not belong to the given asset".to_string(),
                ));
            }
        }

        let conflict = MergeConflict::new(
            merge_id,
            request.asset_id,
            request.asset_version_id,
            request.description,
        )?;
        uow.insert_merge_conflict(&conflict).await?;
        uow.commit().await?;

        tracing::info!(merge_id = %merge_id, conflict_id = %conflict.id, "Merge conflict recorded");
        Ok(conflict)
    }

    /// `resolved=true` stamps resolved_at, `resolved=false` clears it
    pub async fn update_conflict(
        &self,
        actor: &AuthContext,
        conflict_id: Uuid,
        request: UpdateConflictRequest,
    ) -> Result<MergeConflict> {
        if request.description.is_none()
            && request.resolution.is_none()
            && request.resolved.is_none()
        {
            return Err(Error::InvalidArgument("No fields provided".to_string()));
        }

        let mut uow = self.store.begin(actor).await?;
        let merge_id = find_conflict(uow.as_mut(), conflict_id).await?.branch_merge_id;
        lock_merge(uow.as_mut(), merge_id).await?;
        let mut conflict = find_conflict(uow.as_mut(), conflict_id).await?;

        if let Some(description) = request.description {
            conflict.description = description;
        }
        if let Some(resolution) = request.resolution {
            conflict.resolution = Some(resolution);
        }
        if let Some(resolved) = request.resolved {
            conflict.set_resolved(resolved);
        }

        uow.update_merge_conflict(&conflict).await?;
        uow.commit().await?;
        Ok(conflict)
    }
}
