//! Project administration

use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use depot_auth::AuthContext;
use depot_common::{Error, Result};
use depot_domain::entities::{Project, ProjectStatus};

use super::{require_project, CatalogService};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub code: String,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub storage_quota_tb: Option<Decimal>,
    pub storage_provider: Option<String>,
    pub storage_location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateProjectRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<ProjectStatus>,
    pub storage_quota_tb: Option<Decimal>,
    pub storage_provider: Option<String>,
    pub storage_location: Option<String>,
    pub archived: Option<bool>,
}

impl UpdateProjectRequest {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.storage_quota_tb.is_none()
            && self.storage_provider.is_none()
            && self.storage_location.is_none()
            && self.archived.is_none()
    }
}

impl CatalogService {
    pub async fn list_projects(
        &self,
        actor: &AuthContext,
        include_archived: bool,
    ) -> Result<Vec<Project>> {
        let mut uow = self.store.begin(actor).await?;
        let projects = uow.list_projects(include_archived).await?;
        uow.commit().await?;
        Ok(projects)
    }

    pub async fn get_project(&self, actor: &AuthContext, project_id: Uuid) -> Result<Project> {
        let mut uow = self.store.begin(actor).await?;
        let project = require_project(uow.as_mut(), project_id).await?;
        uow.commit().await?;
        Ok(project)
    }

    pub async fn create_project(
        &self,
        actor: &AuthContext,
        request: CreateProjectRequest,
    ) -> Result<Project> {
        actor.require_admin()?;

        let mut project = Project::new(request.name, request.code, request.description)?;
        if let Some(status) = request.status {
            project.status = status;
        }
        if let Some(quota) = request.storage_quota_tb {
            project.set_quota(quota)?;
        }
        project.storage_provider = request.storage_provider;
        project.storage_location = request.storage_location;

        let mut uow = self.store.begin(actor).await?;
        uow.insert_project(&project).await?;
        uow.commit().await?;

        tracing::info!(project_id = %project.id, code = %project.code, "Project created");
        Ok(project)
    }

    /// `archived=true` stamps archived_at once and records the actor
    pub async fn update_project(
        &self,
        actor: &AuthContext,
        project_id: Uuid,
        request: UpdateProjectRequest,
    ) -> Result<Project> {
        actor.require_admin()?;
        if request.is_empty() {
            return Err(Error::InvalidArgument("No fields provided".to_string()));
        }

        let mut uow = self.store.begin(actor).await?;
        let mut project = require_project(uow.as_mut(), project_id).await?;

        if let Some(name) = request.name {
            project.name = name;
        }
        if let Some(description) = request.description {
            project.description = Some(description);
        }
        if let Some(status) = request.status {
            project.status = status;
        }
        if let Some(quota) = request.storage_quota_tb {
            project.set_quota(quota)?;
        }
        if let Some(provider) = request.storage_provider {
            project.storage_provider = Some(provider);
        }
        if let Some(location) = request.storage_location {
            project.storage_location = Some(location);
        }
        match request.archived {
            Some(true) => project.archive(actor.user_id),
            Some(false) => project.unarchive(),
            None => {}
        }
        project.updated_at = chrono::Utc::now();

        uow.update_project(&project).await?;
        uow.commit().await?;
        Ok(project)
    }
}
