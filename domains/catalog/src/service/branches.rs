use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use depot_auth::AuthContext;
use depot_common::{Error, Result};
use depot_domain::entities::Branch;

use super::{require_branch_in, require_project, CatalogService};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBranchRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub description: Option<String>,
    pub parent_branch_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateBranchRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
}

impl CatalogService {
    pub async fn list_branches(
        &self,
        actor: &AuthContext,
        project_id: Uuid,
    ) -> Result<Vec<Branch>> {
        let mut uow = self.store.begin(actor).await?;
        let branches = uow.list_branches(project_id).await?;
        uow.commit().await?;
        Ok(branches)
    }

    /// A parent branch must come from the same project
    pub async fn create_branch(
        &self,
        actor: &AuthContext,
        project_id: Uuid,
        request: CreateBranchRequest,
    ) -> Result<Branch> {
        let branch = Branch::new(
            project_id,
            request.name,
            request.description,
            request.parent_branch_id,
            actor.user_id,
        )?;

        let mut uow = self.store.begin(actor).await?;
        require_project(uow.as_mut(), project_id).await?;
        if let Some(parent_id) = branch.parent_branch_id {
            require_branch_in(uow.as_mut(), parent_id, project_id).await?;
        }
        uow.insert_branch(&branch).await?;
        uow.commit().await?;

        tracing::info!(branch_id = %branch.id, project_id = %project_id, "Branch created");
        Ok(branch)
    }

    pub async fn update_branch(
        &self,
        actor: &AuthContext,
        branch_id: Uuid,
        request: UpdateBranchRequest,
    ) -> Result<Branch> {
        if request.name.is_none() && request.description.is_none() {
            return Err(Error::InvalidArgument("No fields provided".to_string()));
        }

        let mut uow = self.store.begin(actor).await?;
        let mut branch = uow
            .find_branch(branch_id)
            .await?
            .ok_or_else(|| Error::NotFound("Branch not found".to_string()))?;
        if let Some(name) = request.name {
            branch.name = name;
        }
        if let Some(description) = request.description {
            branch.description = Some(description);
        }
        branch.updated_at = chrono::Utc::now();

        uow.update_branch(&branch).await?;
        uow.commit().await?;
        Ok(branch)
    }
}
