//! Asset locks
//!
//! One lock per asset. Under [`LockPolicy::LastWriterWins`] re-locking
//! takes ownership and reports the previous holder; under
//! [`LockPolicy::RejectLive`] a live lock of another user blocks it.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use depot_auth::AuthContext;
use depot_common::{Error, LockPolicy, Result};
use depot_domain::entities::{AssetLock, LockOutcome};

use super::{require_asset, CatalogService};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LockRequest {
    pub asset_id: Uuid,
    pub workspace_id: Option<Uuid>,
    pub expires_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl CatalogService {
    pub async fn list_locks(
        &self,
        actor: &AuthContext,
        project_id: Uuid,
    ) -> Result<Vec<AssetLock>> {
        let mut uow = self.store.begin(actor).await?;
        let locks = uow.list_locks(project_id).await?;
        uow.commit().await?;
        Ok(locks)
    }

    pub async fn lock_asset(
        &self,
        actor: &AuthContext,
        request: LockRequest,
    ) -> Result<LockOutcome> {
        let mut uow = self.store.begin(actor).await?;
        require_asset(uow.as_mut(), request.asset_id).await?;

        let existing = uow.find_lock(request.asset_id).await?;
        let previous_holder = existing
            .as_ref()
            .filter(|lock| lock.locked_by != actor.user_id)
            .map(|lock| lock.locked_by);

        if let (Some(current), LockPolicy::RejectLive) = (&existing, self.lock_policy) {
            if current.locked_by != actor.user_id && current.is_live(Utc::now()) {
                return Err(Error::FailedPrecondition {
                    reason: "Asset is locked by another user".to_string(),
                    details: serde_json::json!({
                        "asset_id": current.asset_id,
                        "locked_by": current.locked_by,
                        "expires_at": current.expires_at,
                    }),
                });
            }
        }

        let lock = AssetLock::new(
            request.asset_id,
            actor.user_id,
            request.workspace_id,
            request.expires_at,
            request.notes,
        );
        let lock = uow.upsert_lock(&lock).await?;
        uow.commit().await?;

        match previous_holder {
            Some(previous) => tracing::warn!(
                asset_id = %lock.asset_id,
                previous_holder = %previous,
                locked_by = %lock.locked_by,
                "Asset lock taken over"
            ),
            None => tracing::info!(
                asset_id = %lock.asset_id,
                locked_by = %lock.locked_by,
                "Asset locked"
            ),
        }
        Ok(LockOutcome {
            lock,
            previous_holder,
        })
    }

    /// Holder or admin only
    pub async fn release_lock(&self, actor: &AuthContext, asset_id: Uuid) -> Result<()> {
        let mut uow = self.store.begin(actor).await?;
        let lock = uow
            .find_lock(asset_id)
            .await?
            .ok_or_else(|| Error::NotFound("Lock not found".to_string()))?;
        actor.require_owner_or_admin(lock.locked_by, "lock")?;

        uow.delete_lock(asset_id).await?;
        uow.commit().await?;

        tracing::info!(asset_id = %asset_id, "Asset lock released");
        Ok(())
    }
}
