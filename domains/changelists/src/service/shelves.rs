//! Shelves: parked asset versions, optionally linked to a changelist

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use depot_auth::AuthContext;
use depot_common::{Error, Result};
use depot_domain::entities::Shelf;

use super::{require_owned_workspace, ChangelistService};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateShelfRequest {
    pub workspace_id: Uuid,
    pub asset_version_id: Uuid,
    pub changelist_id: Option<Uuid>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
}

impl ChangelistService {
    /// Shelves of every workspace in the project, newest first
    pub async fn list_shelves(&self, actor: &AuthContext, project_id: Uuid) -> Result<Vec<Shelf>> {
        let mut uow = self.store.begin(actor).await?;
        let shelves = uow.list_shelves(project_id).await?;
        uow.commit().await?;
        Ok(shelves)
    }

    /// Park a version of the workspace's project in a workspace the actor
    /// owns. Linking requires the changelist to share the workspace and
    /// still be editable.
    pub async fn create_shelf(
        &self,
        actor: &AuthContext,
        request: CreateShelfRequest,
    ) -> Result<Shelf> {
        let mut uow = self.store.begin(actor).await?;

        let workspace =
            require_owned_workspace(uow.as_mut(), actor, request.workspace_id).await?;
        let version = uow
            .find_asset_version(request.asset_version_id)
            .await?
            .ok_or_else(|| Error::NotFound("Asset version not found".to_string()))?;
        let asset = uow
            .find_asset(version.asset_id)
            .await?
            .ok_or_else(|| Error::NotFound("Asset version not found".to_string()))?;
        if asset.project_id != workspace.project_id {
            return Err(Error::InvalidArgument(
                "Asset version from different project".to_string(),
            ));
        }

        let linked = match request.changelist_id {
            Some(changelist_id) => {
                let mut changelist = uow
                    .find_changelist(changelist_id)
                    .await?
                    .ok_or_else(|| Error::NotFound("Changelist not found".to_string()))?;
                if changelist.workspace_id != workspace.id {
                    return Err(Error::InvalidArgument(
                        "Changelist workspace mismatch".to_string(),
                    ));
                }
                if !changelist.status.is_editable() {
                    return Err(Error::InvalidState(
                        "Changelist is not accepting shelves".to_string(),
                    ));
                }
                changelist.touch();
                Some(changelist)
            }
            None => None,
        };

        let shelf = Shelf::new(
            workspace.id,
            request.asset_version_id,
            request.changelist_id,
            request.description,
            actor.user_id,
        );
        uow.insert_shelf(&shelf).await?;
        if let Some(changelist) = &linked {
            uow.update_changelist(changelist).await?;
        }
        uow.commit().await?;

        tracing::info!(
            shelf_id = %shelf.id,
            workspace_id = %shelf.workspace_id,
            changelist_id = ?shelf.changelist_id,
            "Shelf created"
        );
        Ok(shelf)
    }

    /// Creator or admin only
    pub async fn delete_shelf(&self, actor: &AuthContext, shelf_id: Uuid) -> Result<()> {
        let mut uow = self.store.begin(actor).await?;
        let shelf = uow
            .find_shelf(shelf_id)
            .await?
            .ok_or_else(|| Error::NotFound("Shelf not found".to_string()))?;
        actor.require_owner_or_admin(shelf.created_by, "shelf")?;

        uow.delete_shelf(shelf_id).await?;
        uow.commit().await?;

        tracing::info!(shelf_id = %shelf_id, "Shelf deleted");
        Ok(())
    }
}
