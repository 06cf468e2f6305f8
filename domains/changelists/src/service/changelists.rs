//! Changelist create/read/update, items, submission

use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use depot_auth::AuthContext;
use depot_common::{Error, Result};
use depot_db::UnitOfWork;
use depot_domain::entities::{ChangeAction, Changelist, ChangelistItem, ChangelistView};
use depot_domain::state::ChangelistStatus;

use super::{require_owned_workspace, resolve_view, ChangelistService};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateChangelistRequest {
    pub project_id: Uuid,
    pub workspace_id: Uuid,
    pub target_branch_id: Option<Uuid>,
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub shelf_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateChangelistRequest {
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    pub target_branch_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddItemRequest {
    pub asset_version_id: Uuid,
    /// One of add, edit, delete, integrate
    pub action: String,
    pub target_branch_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct SubmitChangelistRequest {
    /// `submitted` (default) or `pending_review`
    pub status: Option<ChangelistStatus>,
    #[validate(length(max = 4000))]
    pub submitter_notes: Option<String>,
}

async fn find_changelist(uow: &mut dyn UnitOfWork, id: Uuid) -> Result<Changelist> {
    uow.find_changelist(id)
        .await?
        .ok_or_else(|| Error::NotFound("Changelist not found".to_string()))
}

/// The branch must exist and live in `project_id`
async fn require_project_branch(
    uow: &mut dyn UnitOfWork,
    branch_id: Uuid,
    project_id: Uuid,
) -> Result<()> {
    let branch = uow
        .find_branch(branch_id)
        .await?
        .ok_or_else(|| Error::NotFound("Target branch not found".to_string()))?;
    if !branch.belongs_to(project_id) {
        return Err(Error::InvalidArgument(
            "Target branch not in project".to_string(),
        ));
    }
    Ok(())
}

impl ChangelistService {
    pub async fn list_changelists(
        &self,
        actor: &AuthContext,
        project_id: Uuid,
    ) -> Result<Vec<ChangelistView>> {
        let mut uow = self.store.begin(actor).await?;
        let changelists = uow.list_changelists(project_id).await?;
        let mut views = Vec::with_capacity(changelists.len());
        for changelist in changelists {
            views.push(resolve_view(uow.as_mut(), changelist).await?);
        }
        uow.commit().await?;
        Ok(views)
    }

    pub async fn get_changelist(
        &self,
        actor: &AuthContext,
        changelist_id: Uuid,
    ) -> Result<ChangelistView> {
        let mut uow = self.store.begin(actor).await?;
        let changelist = find_changelist(uow.as_mut(), changelist_id).await?;
        let view = resolve_view(uow.as_mut(), changelist).await?;
        uow.commit().await?;
        Ok(view)
    }

    /// Open a changelist, optionally claiming an unlinked shelf
    pub async fn create_changelist(
        &self,
        actor: &AuthContext,
        request: CreateChangelistRequest,
    ) -> Result<ChangelistView> {
        let mut uow = self.store.begin(actor).await?;

        let workspace =
            require_owned_workspace(uow.as_mut(), actor, request.workspace_id).await?;
        if workspace.project_id != request.project_id {
            return Err(Error::InvalidArgument(
                "Workspace does not belong to project".to_string(),
            ));
        }
        if let Some(branch_id) = request.target_branch_id {
            require_project_branch(uow.as_mut(), branch_id, request.project_id).await?;
        }

        let shelf = match request.shelf_id {
            Some(shelf_id) => {
                let shelf = uow
                    .find_shelf(shelf_id)
                    .await?
                    .ok_or_else(|| Error::NotFound("Shelf not found".to_string()))?;
                if shelf.workspace_id != workspace.id {
                    return Err(Error::InvalidArgument("Shelf workspace mismatch".to_string()));
                }
                if shelf.changelist_id.is_some() {
                    return Err(Error::InvalidArgument(
                        "Shelf is already linked to a changelist".to_string(),
                    ));
                }
                Some(shelf)
            }
            None => None,
        };

        let changelist = Changelist::new(
            request.project_id,
            workspace.id,
            actor.user_id,
            request.target_branch_id,
            request.description,
        );
        uow.insert_changelist(&changelist).await?;
        if let Some(mut shelf) = shelf {
            shelf.changelist_id = Some(changelist.id);
            uow.update_shelf(&shelf).await?;
        }

        let view = resolve_view(uow.as_mut(), changelist).await?;
        uow.commit().await?;

        tracing::info!(
            changelist_id = %view.changelist.id,
            project_id = %view.changelist.project_id,
            shelf_id = ?view.shelf_id,
            "Changelist created"
        );
        Ok(view)
    }

    pub async fn update_changelist(
        &self,
        actor: &AuthContext,
        changelist_id: Uuid,
        request: UpdateChangelistRequest,
    ) -> Result<ChangelistView> {
        if request.description.is_none() && request.target_branch_id.is_none() {
            return Err(Error::InvalidArgument("No fields provided".to_string()));
        }

        let mut uow = self.store.begin(actor).await?;
        let mut changelist = find_changelist(uow.as_mut(), changelist_id).await?;
        require_owned_workspace(uow.as_mut(), actor, changelist.workspace_id).await?;
        changelist.ensure_editable()?;

        if let Some(branch_id) = request.target_branch_id {
            require_project_branch(uow.as_mut(), branch_id, changelist.project_id).await?;
            changelist.target_branch_id = Some(branch_id);
        }
        if let Some(description) = request.description {
            changelist.description = Some(description);
        }
        changelist.touch();

        uow.update_changelist(&changelist).await?;
        let view = resolve_view(uow.as_mut(), changelist).await?;
        uow.commit().await?;
        Ok(view)
    }

    /// `open|pending_review -> cancelled`
    pub async fn cancel_changelist(
        &self,
        actor: &AuthContext,
        changelist_id: Uuid,
    ) -> Result<ChangelistView> {
        let mut uow = self.store.begin(actor).await?;
        let mut changelist = find_changelist(uow.as_mut(), changelist_id).await?;
        require_owned_workspace(uow.as_mut(), actor, changelist.workspace_id).await?;
        changelist.cancel()?;
        uow.update_changelist(&changelist).await?;
        let view = resolve_view(uow.as_mut(), changelist).await?;
        uow.commit().await?;

        tracing::info!(changelist_id = %changelist_id, "Changelist cancelled");
        Ok(view)
    }

    /// Add an item, or replace action/target of the item for the same version
    pub async fn add_item(
        &self,
        actor: &AuthContext,
        changelist_id: Uuid,
        request: AddItemRequest,
    ) -> Result<ChangelistView> {
        let mut uow = self.store.begin(actor).await?;
        let mut changelist = find_changelist(uow.as_mut(), changelist_id).await?;
        require_owned_workspace(uow.as_mut(), actor, changelist.workspace_id).await?;
        changelist.ensure_editable()?;
        let action: ChangeAction = request.action.parse()?;

        let version = uow
            .find_asset_version(request.asset_version_id)
            .await?
            .ok_or_else(|| Error::NotFound("Asset version not found".to_string()))?;
        let asset = uow
            .find_asset(version.asset_id)
            .await?
            .ok_or_else(|| Error::NotFound("Asset version not found".to_string()))?;
        if asset.project_id != changelist.project_id {
            return Err(Error::InvalidArgument(
                "Asset version from different project".to_string(),
            ));
        }
        if let Some(branch_id) = request.target_branch_id {
            require_project_branch(uow.as_mut(), branch_id, changelist.project_id).await?;
        }

        let item = ChangelistItem::new(
            changelist.id,
            version.id,
            action,
            request.target_branch_id,
        );
        let stored = uow.upsert_changelist_item(&item).await?;
        changelist.touch();
        uow.update_changelist(&changelist).await?;

        let view = resolve_view(uow.as_mut(), changelist).await?;
        uow.commit().await?;

        tracing::debug!(
            changelist_id = %changelist_id,
            item_id = %stored.id,
            action = ?stored.action,
            "Changelist item stored"
        );
        Ok(view)
    }

    pub async fn remove_item(
        &self,
        actor: &AuthContext,
        changelist_id: Uuid,
        item_id: Uuid,
    ) -> Result<ChangelistView> {
        let mut uow = self.store.begin(actor).await?;
        let mut changelist = find_changelist(uow.as_mut(), changelist_id).await?;
        require_owned_workspace(uow.as_mut(), actor, changelist.workspace_id).await?;
        changelist.ensure_editable()?;

        if !uow.delete_changelist_item(changelist_id, item_id).await? {
            return Err(Error::NotFound("Changelist item not found".to_string()));
        }
        changelist.touch();
        uow.update_changelist(&changelist).await?;

        let view = resolve_view(uow.as_mut(), changelist).await?;
        uow.commit().await?;
        Ok(view)
    }

    /// Submit, or move to review. Requires a target branch and at least one item.
    pub async fn submit_changelist(
        &self,
        actor: &AuthContext,
        changelist_id: Uuid,
        request: SubmitChangelistRequest,
    ) -> Result<ChangelistView> {
        let desired = request.status.unwrap_or(ChangelistStatus::Submitted);

        let mut uow = self.store.begin(actor).await?;
        let mut changelist = find_changelist(uow.as_mut(), changelist_id).await?;
        require_owned_workspace(uow.as_mut(), actor, changelist.workspace_id).await?;
        let items = uow.list_changelist_items(changelist_id).await?;
        changelist.submit(desired, request.submitter_notes, items.len())?;
        uow.update_changelist(&changelist).await?;

        let view = resolve_view(uow.as_mut(), changelist).await?;
        uow.commit().await?;

        tracing::info!(
            changelist_id = %changelist_id,
            status = %view.changelist.status,
            items = view.items.len(),
            "Changelist submitted"
        );
        Ok(view)
    }
}
