use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use depot_auth::AuthContext;
use depot_common::{Error, Result};
use depot_domain::entities::Workspace;

use super::{require_branch_in, require_project, CatalogService};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateWorkspaceRequest {
    pub project_id: Uuid,
    pub branch_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
}

impl CatalogService {
    /// Admins see every workspace of the project, members only their own
    pub async fn list_workspaces(
        &self,
        actor: &AuthContext,
        project_id: Uuid,
    ) -> Result<Vec<Workspace>> {
        let mut uow = self.store.begin(actor).await?;
        let workspaces = uow.list_workspaces(project_id).await?;
        uow.commit().await?;

        Ok(workspaces
            .into_iter()
            .filter(|w| actor.can_manage(w.user_id))
            .collect())
    }

    pub async fn get_workspace(
        &self,
        actor: &AuthContext,
        workspace_id: Uuid,
    ) -> Result<Workspace> {
        let mut uow = self.store.begin(actor).await?;
        let workspace = uow
            .find_workspace(workspace_id)
            .await?
            .ok_or_else(|| Error::NotFound("Workspace not found".to_string()))?;
        uow.commit().await?;

        if !actor.can_manage(workspace.user_id) {
            return Err(Error::PermissionDenied(
                "Workspace belongs to another user".to_string(),
            ));
        }
        Ok(workspace)
    }

    /// The workspace is owned by the caller
    pub async fn create_workspace(
        &self,
        actor: &AuthContext,
        request: CreateWorkspaceRequest,
    ) -> Result<Workspace> {
        let workspace = Workspace::new(
            request.project_id,
            actor.user_id,
            request.branch_id,
            request.name,
            request.description,
        )?;

        let mut uow = self.store.begin(actor).await?;
        require_project(uow.as_mut(), workspace.project_id).await?;
        if let Some(branch_id) = workspace.branch_id {
            require_branch_in(uow.as_mut(), branch_id, workspace.project_id).await?;
        }
        uow.insert_workspace(&workspace).await?;
        uow.commit().await?;

        tracing::info!(
            workspace_id = %workspace.id,
            user_id = %workspace.user_id,
            "Workspace created"
        );
        Ok(workspace)
    }
}
