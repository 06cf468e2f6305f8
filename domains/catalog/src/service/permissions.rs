use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use depot_auth::AuthContext;
use depot_common::{Error, Result};
use depot_domain::entities::Permission;

use super::{require_asset, require_project, CatalogService};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePermissionRequest {
    pub project_id: Uuid,
    pub asset_id: Option<Uuid>,
    pub user_id: Uuid,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub write: bool,
    #[serde(default)]
    pub delete: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePermissionRequest {
    pub read: Option<bool>,
    pub write: Option<bool>,
    pub delete: Option<bool>,
}

impl CatalogService {
    pub async fn list_permissions(
        &self,
        actor: &AuthContext,
        project_id: Uuid,
    ) -> Result<Vec<Permission>> {
        actor.require_admin()?;
        let mut uow = self.store.begin(actor).await?;
        let permissions = uow.list_permissions(project_id).await?;
        uow.commit().await?;
        Ok(permissions)
    }

    /// An asset-scoped override must name an asset of the same project
    pub async fn create_permission(
        &self,
        actor: &AuthContext,
        project_id: Uuid,
        request: CreatePermissionRequest,
    ) -> Result<Permission> {
        actor.require_admin()?;
        if request.project_id != project_id {
            return Err(Error::InvalidArgument("Project mismatch".to_string()));
        }

        let mut uow = self.store.begin(actor).await?;
        require_project(uow.as_mut(), project_id).await?;
        if let Some(asset_id) = request.asset_id {
            let asset = require_asset(uow.as_mut(), asset_id).await?;
            if asset.project_id != project_id {
                return Err(Error::InvalidArgument(
                    "Asset does not belong to the project".to_string(),
                ));
            }
        }

        let permission = Permission::new(
            project_id,
            request.asset_id,
            request.user_id,
            request.read,
            request.write,
            request.delete,
        );
        uow.insert_permission(&permission).await?;
        uow.commit().await?;

        tracing::info!(
            permission_id = %permission.id,
            user_id = %permission.user_id,
            asset_scoped = permission.is_asset_scoped(),
            "Permission granted"
        );
        Ok(permission)
    }

    pub async fn update_permission(
        &self,
        actor: &AuthContext,
        permission_id: Uuid,
        request: UpdatePermissionRequest,
    ) -> Result<Permission> {
        actor.require_admin()?;
        if request.read.is_none() && request.write.is_none() && request.delete.is_none() {
            return Err(Error::InvalidArgument("No fields provided".to_string()));
        }

        let mut uow = self.store.begin(actor).await?;
        let mut permission = uow
            .find_permission(permission_id)
            .await?
            .ok_or_else(|| Error::NotFound("Permission not found".to_string()))?;
        if let Some(read) = request.read {
            permission.read = read;
        }
        if let Some(write) = request.write {
            permission.write = write;
        }
        if let Some(delete) = request.delete {
            permission.delete = delete;
        }

        uow.update_permission(&permission).await?;
        uow.commit().await?;
        Ok(permission)
    }

    pub async fn delete_permission(&self, actor: &AuthContext, permission_id: Uuid) -> Result<()> {
        actor.require_admin()?;
        let mut uow = self.store.begin(actor).await?;
        if !uow.delete_permission(permission_id).await? {
            return Err(Error::NotFound("Permission not found".to_string()));
        }
        uow.commit().await?;

        tracing::info!(permission_id = %permission_id, "Permission revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::{fixture, Fixture};
    use super::*;

    fn grant(fx: &Fixture, user_id: Uuid) -> CreatePermissionRequest {
        CreatePermissionRequest {
            project_id: fx.project.id,
            asset_id: None,
            user_id,
            read: true,
            write: false,
            delete: false,
        }
    }

    #[tokio::test]
    async fn test_permissions_are_admin_only() {
        let fx = fixture().await;
        let err = fx
            .service
            .create_permission(&fx.member, fx.project.id, grant(&fx, fx.member.user_id))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));

        let err = fx
            .service
            .list_permissions(&fx.member, fx.project.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn test_payload_project_must_match_path() {
        let fx = fixture().await;
        let err = fx
            .service
            .create_permission(&fx.admin, Uuid::new_v4(), grant(&fx, fx.member.user_id))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_grant_update_and_revoke() {
        let fx = fixture().await;
        let asset = fx.asset("door").await;
        let mut request = grant(&fx, fx.member.user_id);
        request.asset_id = Some(asset.id);
        let permission = fx
            .service
            .create_permission(&fx.admin, fx.project.id, request)
            .await
            .unwrap();
        assert!(permission.is_asset_scoped());

        let updated = fx
            .service
            .update_permission(
                &fx.admin,
                permission.id,
                UpdatePermissionRequest {
                    write: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.read);
        assert!(updated.write);
        assert!(!updated.delete);

        let err = fx
            .service
            .update_permission(&fx.admin, permission.id, UpdatePermissionRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));

        fx.service.delete_permission(&fx.admin, permission.id).await.unwrap();
        let err = fx
            .service
            .delete_permission(&fx.admin, permission.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(fx
            .service
            .list_permissions(&fx.admin, fx.project.id)
            .await
            .unwrap()
            .is_empty());
    }
}
