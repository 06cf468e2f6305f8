//! Changelist Engine
//!
//! Changelists, their items and the shelves linked to them. Every read
//! returns the resolved view: the latest linked shelf and the items in
//! creation order. Writes are limited to the workspace owner and admins.

pub mod changelists;
pub mod shelves;

use std::sync::Arc;

use uuid::Uuid;

use depot_auth::AuthContext;
use depot_common::{Error, Result};
use depot_db::{EntityStore, UnitOfWork};
use depot_domain::entities::{Changelist, ChangelistView, Workspace};

pub use changelists::{
    AddItemRequest, CreateChangelistRequest, SubmitChangelistRequest, UpdateChangelistRequest,
};
pub use shelves::CreateShelfRequest;

#[derive(Clone)]
pub struct ChangelistService {
    store: Arc<dyn EntityStore>,
}

impl ChangelistService {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }
}

/// The workspace must exist (NotFound) and belong to the actor, unless
/// the actor is an admin (PermissionDenied)
pub(crate) async fn require_owned_workspace(
    uow: &mut dyn UnitOfWork,
    actor: &AuthContext,
    workspace_id: Uuid,
) -> Result<Workspace> {
    let workspace = uow
        .find_workspace(workspace_id)
        .await?
        .ok_or_else(|| Error::NotFound("Workspace not found".to_string()))?;
    actor.require_owner_or_admin(workspace.user_id, "workspace")?;
    Ok(workspace)
}

/// Resolve shelf link and items for a changelist
pub(crate) async fn resolve_view(
    uow: &mut dyn UnitOfWork,
    changelist: Changelist,
) -> Result<ChangelistView> {
    let shelf_id = uow.latest_shelf_for_changelist(changelist.id).await?;
    let items = uow.list_changelist_items(changelist.id).await?;
    Ok(ChangelistView {
        changelist,
        shelf_id,
        items,
    })
}
