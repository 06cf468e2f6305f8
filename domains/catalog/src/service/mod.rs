//! Catalog operations
//!
//! Project administration is admin-only, like permission management.
//! Locks follow the configured [`LockPolicy`]. Reviews answer to their
//! assigned reviewer.

pub mod assets;
pub mod branches;
pub mod locks;
pub mod permissions;
pub mod projects;
pub mod reviews;
pub mod workspaces;

use std::sync::Arc;

use uuid::Uuid;

use depot_common::{Error, LockPolicy, Result};
use depot_db::{EntityStore, UnitOfWork};
use depot_domain::entities::{Asset, Project};

use crate::blob::BlobStore;

pub use assets::{CreateAssetRequest, CreateVersionRequest, UploadVersionParams};
pub use branches::{CreateBranchRequest, UpdateBranchRequest};
pub use locks::LockRequest;
pub use permissions::{CreatePermissionRequest, UpdatePermissionRequest};
pub use projects::{CreateProjectRequest, UpdateProjectRequest};
pub use reviews::{RequestReviewRequest, UpdateReviewRequest};
pub use workspaces::CreateWorkspaceRequest;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn EntityStore>,
    blobs: Arc<dyn BlobStore>,
    lock_policy: LockPolicy,
}

impl CatalogService {
    pub fn new(store: Arc<dyn EntityStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            store,
            blobs,
            lock_policy: LockPolicy::default(),
        }
    }

    pub fn with_lock_policy(mut self, policy: LockPolicy) -> Self {
        self.lock_policy = policy;
        self
    }

    pub fn lock_policy(&self) -> LockPolicy {
        self.lock_policy
    }
}

pub(crate) async fn require_project(uow: &mut dyn UnitOfWork, id: Uuid) -> Result<Project> {
    uow.find_project(id)
        .await?
        .ok_or_else(|| Error::NotFound("Project not found".to_string()))
}

pub(crate) async fn require_asset(uow: &mut dyn UnitOfWork, id: Uuid) -> Result<Asset> {
    uow.find_asset(id)
        .await?
        .ok_or_else(|| Error::NotFound("Asset not found".to_string()))
}

/// The branch must exist (NotFound) and live in `project_id` (InvalidArgument)
pub(crate) async fn require_branch_in(
    uow: &mut dyn UnitOfWork,
    branch_id: Uuid,
    project_id: Uuid,
) -> Result<()> {
    let branch = uow
        .find_branch(branch_id)
        .await?
        .ok_or_else(|| Error::NotFound("Branch not found".to_string()))?;
    if !branch.belongs_to(project_id) {
        return Err(Error::InvalidArgument(
            "Branch does not belong to the project".to_string(),
        ));
    }
    Ok(())
}
