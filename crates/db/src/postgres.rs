//! PostgreSQL Entity Store
//!
//! Every unit of work is one transaction. The actor is published to the
//! transaction through `app.current_user_id` / `app.current_user_role` so
//! row-level policies can see it.

use chrono::Utc;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use depot_auth::AuthContext;
use depot_common::RepositoryError;
use depot_domain::entities::{
    Asset, AssetLock, AssetReview, AssetVersion, Branch, BranchMerge, Changelist,
    ChangelistItem, MergeConflict, MergeJob, Permission, Project, Shelf, Workspace,
};

use crate::store::{EntityStore, StoreResult, UnitOfWork};

pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

const PROJECT_COLUMNS: &str = "id, name, code, description, status, storage_quota_tb, \
    storage_provider, storage_location, archived_at, archived_by, created_at, updated_at";
const BRANCH_COLUMNS: &str =
    "id, project_id, name, description, parent_branch_id, created_by, created_at, updated_at";
const WORKSPACE_COLUMNS: &str =
    "id, project_id, user_id, branch_id, name, description, created_at, last_synced_at";
const ASSET_COLUMNS: &str =
    "id, project_id, name, asset_type, metadata, created_by, created_at";
const ASSET_VERSION_COLUMNS: &str =
    "id, asset_id, version_number, branch_id, file_path, notes, created_at";
const SHELF_COLUMNS: &str =
    "id, workspace_id, asset_version_id, changelist_id, created_by, description, created_at";
const CHANGELIST_COLUMNS: &str = "id, project_id, workspace_id, created_by, target_branch_id, \
    status, description, submitter_notes, submitted_at, created_at, updated_at";
const CHANGELIST_ITEM_COLUMNS: &str =
    "id, changelist_id, asset_version_id, action, target_branch_id, created_at";
const MERGE_COLUMNS: &str = "id, project_id, source_branch_id, target_branch_id, initiated_by, \
    status, conflict_summary, notes, created_at, updated_at, completed_at";
const CONFLICT_COLUMNS: &str = "id, branch_merge_id, asset_id, asset_version_id, description, \
    resolution, resolved_at, created_at";
const JOB_COLUMNS: &str = "id, branch_merge_id, job_type, status, conflict_snapshot, \
    submit_gate_passed, logs, started_at, completed_at, created_at, updated_at";
const PERMISSION_COLUMNS: &str =
    "id, project_id, asset_id, user_id, can_read, can_write, can_delete, created_at";
const LOCK_COLUMNS: &str =
    "id, asset_id, locked_by, workspace_id, locked_at, expires_at, notes";
const REVIEW_COLUMNS: &str = "id, asset_version_id, requested_by, reviewer_id, status, \
    comments, reviewed_at, created_at";

/// Map unique violations to `AlreadyExists`
fn map_write_error(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            RepositoryError::AlreadyExists
        }
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => {
            RepositoryError::InvalidData(db_err.message().to_string())
        }
        other => RepositoryError::from(other),
    }
}

fn expect_one(rows_affected: u64) -> StoreResult<()> {
    if rows_affected == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

/// Postgres-backed Entity Store
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        tracing::info!(max_connections, "Connected to Postgres");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        MIGRATOR.run(&self.pool).await
    }

    /// Open a transaction with the actor published as transaction-local settings
    async fn open(&self, actor: &AuthContext) -> StoreResult<PgUnitOfWork> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "SELECT set_config('app.current_user_id', $1, true), \
                    set_config('app.current_user_role', $2, true)",
        )
        .bind(actor.user_id.to_string())
        .bind(actor.role.as_str())
        .execute(&mut *tx)
        .await?;

        Ok(PgUnitOfWork {
            tx,
            actor: actor.clone(),
        })
    }
}

#[async_trait::async_trait]
impl EntityStore for PgStore {
    async fn begin(&self, actor: &AuthContext) -> StoreResult<Box<dyn UnitOfWork>> {
        Ok(Box::new(self.open(actor).await?))
    }
}

struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
    actor: AuthContext,
}

#[async_trait::async_trait]
impl UnitOfWork for PgUnitOfWork {
    fn actor(&self) -> &AuthContext {
        &self.actor
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        self.tx.rollback().await?;
        Ok(())
    }

    // =========================================================================
    // Projects, branches, workspaces
    // =========================================================================

    async fn list_projects(&mut self, include_archived: bool) -> StoreResult<Vec<Project>> {
        let query = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects \
             WHERE ($1 OR archived_at IS NULL) \
             ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Project>(&query)
            .bind(include_archived)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn find_project(&mut self, id: Uuid) -> StoreResult<Option<Project>> {
        let query = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1");
        Ok(sqlx::query_as::<_, Project>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_project(&mut self, project: &Project) -> StoreResult<()> {
        let query = format!(
            "INSERT INTO projects ({PROJECT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
        );
        sqlx::query(&query)
            .bind(project.id)
            .bind(&project.name)
            .bind(&project.code)
            .bind(&project.description)
            .bind(project.status)
            .bind(project.storage_quota_tb)
            .bind(&project.storage_provider)
            .bind(&project.storage_location)
            .bind(project.archived_at)
            .bind(project.archived_by)
            .bind(project.created_at)
            .bind(project.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn update_project(&mut self, project: &Project) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE projects SET \
                name = $2, code = $3, description = $4, status = $5, \
                storage_quota_tb = $6, storage_provider = $7, storage_location = $8, \
                archived_at = $9, archived_by = $10, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(project.id)
        .bind(&project.name)
        .bind(&project.code)
        .bind(&project.description)
        .bind(project.status)
        .bind(project.storage_quota_tb)
        .bind(&project.storage_provider)
        .bind(&project.storage_location)
        .bind(project.archived_at)
        .bind(project.archived_by)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        expect_one(result.rows_affected())
    }

    async fn list_branches(&mut self, project_id: Uuid) -> StoreResult<Vec<Branch>> {
        let query = format!(
            "SELECT {BRANCH_COLUMNS} FROM branches WHERE project_id = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Branch>(&query)
            .bind(project_id)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn find_branch(&mut self, id: Uuid) -> StoreResult<Option<Branch>> {
        let query = format!("SELECT {BRANCH_COLUMNS} FROM branches WHERE id = $1");
        Ok(sqlx::query_as::<_, Branch>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_branch(&mut self, branch: &Branch) -> StoreResult<()> {
        let query = format!(
            "INSERT INTO branches ({BRANCH_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        );
        sqlx::query(&query)
            .bind(branch.id)
            .bind(branch.project_id)
            .bind(&branch.name)
            .bind(&branch.description)
            .bind(branch.parent_branch_id)
            .bind(branch.created_by)
            .bind(branch.created_at)
            .bind(branch.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn update_branch(&mut self, branch: &Branch) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE branches SET \
                name = $2, description = $3, parent_branch_id = $4, updated_at = NOW() \
             WHERE id = $1",
        )
        .bind(branch.id)
        .bind(&branch.name)
        .bind(&branch.description)
        .bind(branch.parent_branch_id)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        expect_one(result.rows_affected())
    }

    async fn list_workspaces(&mut self, project_id: Uuid) -> StoreResult<Vec<Workspace>> {
        let query = format!(
            "SELECT {WORKSPACE_COLUMNS} FROM workspaces WHERE project_id = $1 \
             ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Workspace>(&query)
            .bind(project_id)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn find_workspace(&mut self, id: Uuid) -> StoreResult<Option<Workspace>> {
        let query = format!("SELECT {WORKSPACE_COLUMNS} FROM workspaces WHERE id = $1");
        Ok(sqlx::query_as::<_, Workspace>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_workspace(&mut self, workspace: &Workspace) -> StoreResult<()> {
        let query = format!(
            "INSERT INTO workspaces ({WORKSPACE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        );
        sqlx::query(&query)
            .bind(workspace.id)
            .bind(workspace.project_id)
            .bind(workspace.user_id)
            .bind(workspace.branch_id)
            .bind(&workspace.name)
            .bind(&workspace.description)
            .bind(workspace.created_at)
            .bind(workspace.last_synced_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    // =========================================================================
    // Assets
    // =========================================================================

    async fn list_assets(&mut self, project_id: Uuid) -> StoreResult<Vec<Asset>> {
        let query = format!(
            "SELECT {ASSET_COLUMNS} FROM assets WHERE project_id = $1 ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Asset>(&query)
            .bind(project_id)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn find_asset(&mut self, id: Uuid) -> StoreResult<Option<Asset>> {
        let query = format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = $1");
        Ok(sqlx::query_as::<_, Asset>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_asset(&mut self, asset: &Asset) -> StoreResult<()> {
        let query =
            format!("INSERT INTO assets ({ASSET_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)");
        sqlx::query(&query)
            .bind(asset.id)
            .bind(asset.project_id)
            .bind(&asset.name)
            .bind(&asset.asset_type)
            .bind(&asset.metadata)
            .bind(asset.created_by)
            .bind(asset.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn list_asset_versions(&mut self, asset_id: Uuid) -> StoreResult<Vec<AssetVersion>> {
        let query = format!(
            "SELECT {ASSET_VERSION_COLUMNS} FROM asset_versions WHERE asset_id = $1 \
             ORDER BY version_number ASC"
        );
        Ok(sqlx::query_as::<_, AssetVersion>(&query)
            .bind(asset_id)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn find_asset_version(&mut self, id: Uuid) -> StoreResult<Option<AssetVersion>> {
        let query = format!("SELECT {ASSET_VERSION_COLUMNS} FROM asset_versions WHERE id = $1");
        Ok(sqlx::query_as::<_, AssetVersion>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_asset_version(&mut self, version: &AssetVersion) -> StoreResult<()> {
        let query = format!(
            "INSERT INTO asset_versions ({ASSET_VERSION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)"
        );
        sqlx::query(&query)
            .bind(version.id)
            .bind(version.asset_id)
            .bind(version.version_number)
            .bind(version.branch_id)
            .bind(&version.file_path)
            .bind(&version.notes)
            .bind(version.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn upsert_asset_version(
        &mut self,
        version: &AssetVersion,
    ) -> StoreResult<AssetVersion> {
        let query = format!(
            "INSERT INTO asset_versions ({ASSET_VERSION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (asset_id, version_number) DO UPDATE SET \
                branch_id = EXCLUDED.branch_id, \
                file_path = EXCLUDED.file_path, \
                notes = EXCLUDED.notes, \
                created_at = NOW() \
             RETURNING {ASSET_VERSION_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, AssetVersion>(&query)
            .bind(version.id)
            .bind(version.asset_id)
            .bind(version.version_number)
            .bind(version.branch_id)
            .bind(&version.file_path)
            .bind(&version.notes)
            .bind(version.created_at)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_write_error)?)
    }

    // =========================================================================
    // Shelves and changelists
    // =========================================================================

    async fn list_shelves(&mut self, project_id: Uuid) -> StoreResult<Vec<Shelf>> {
        let query = format!(
            "SELECT {} FROM shelves s \
             JOIN workspaces w ON w.id = s.workspace_id \
             WHERE w.project_id = $1 \
             ORDER BY s.created_at DESC",
            prefixed("s", SHELF_COLUMNS)
        );
        Ok(sqlx::query_as::<_, Shelf>(&query)
            .bind(project_id)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn find_shelf(&mut self, id: Uuid) -> StoreResult<Option<Shelf>> {
        let query = format!("SELECT {SHELF_COLUMNS} FROM shelves WHERE id = $1");
        Ok(sqlx::query_as::<_, Shelf>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_shelf(&mut self, shelf: &Shelf) -> StoreResult<()> {
        let query =
            format!("INSERT INTO shelves ({SHELF_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7)");
        sqlx::query(&query)
            .bind(shelf.id)
            .bind(shelf.workspace_id)
            .bind(shelf.asset_version_id)
            .bind(shelf.changelist_id)
            .bind(shelf.created_by)
            .bind(&shelf.description)
            .bind(shelf.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn update_shelf(&mut self, shelf: &Shelf) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE shelves SET asset_version_id = $2, changelist_id = $3, description = $4 \
             WHERE id = $1",
        )
        .bind(shelf.id)
        .bind(shelf.asset_version_id)
        .bind(shelf.changelist_id)
        .bind(&shelf.description)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        expect_one(result.rows_affected())
    }

    async fn delete_shelf(&mut self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM shelves WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn latest_shelf_for_changelist(
        &mut self,
        changelist_id: Uuid,
    ) -> StoreResult<Option<Uuid>> {
        Ok(sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM shelves WHERE changelist_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(changelist_id)
        .fetch_optional(&mut *self.tx)
        .await?)
    }

    async fn list_changelists(&mut self, project_id: Uuid) -> StoreResult<Vec<Changelist>> {
        let query = format!(
            "SELECT {CHANGELIST_COLUMNS} FROM changelists WHERE project_id = $1 \
             ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, Changelist>(&query)
            .bind(project_id)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn find_changelist(&mut self, id: Uuid) -> StoreResult<Option<Changelist>> {
        let query = format!("SELECT {CHANGELIST_COLUMNS} FROM changelists WHERE id = $1");
        Ok(sqlx::query_as::<_, Changelist>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_changelist(&mut self, changelist: &Changelist) -> StoreResult<()> {
        let query = format!(
            "INSERT INTO changelists ({CHANGELIST_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        sqlx::query(&query)
            .bind(changelist.id)
            .bind(changelist.project_id)
            .bind(changelist.workspace_id)
            .bind(changelist.created_by)
            .bind(changelist.target_branch_id)
            .bind(changelist.status)
            .bind(&changelist.description)
            .bind(&changelist.submitter_notes)
            .bind(changelist.submitted_at)
            .bind(changelist.created_at)
            .bind(changelist.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn update_changelist(&mut self, changelist: &Changelist) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE changelists SET \
                target_branch_id = $2, status = $3, description = $4, \
                submitter_notes = $5, submitted_at = $6, updated_at = $7 \
             WHERE id = $1",
        )
        .bind(changelist.id)
        .bind(changelist.target_branch_id)
        .bind(changelist.status)
        .bind(&changelist.description)
        .bind(&changelist.submitter_notes)
        .bind(changelist.submitted_at)
        .bind(changelist.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        expect_one(result.rows_affected())
    }

    async fn list_changelist_items(
        &mut self,
        changelist_id: Uuid,
    ) -> StoreResult<Vec<ChangelistItem>> {
        let query = format!(
            "SELECT {CHANGELIST_ITEM_COLUMNS} FROM changelist_items WHERE changelist_id = $1 \
             ORDER BY created_at ASC"
        );
        Ok(sqlx::query_as::<_, ChangelistItem>(&query)
            .bind(changelist_id)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn upsert_changelist_item(
        &mut self,
        item: &ChangelistItem,
    ) -> StoreResult<ChangelistItem> {
        let query = format!(
            "INSERT INTO changelist_items ({CHANGELIST_ITEM_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             ON CONFLICT (changelist_id, asset_version_id) DO UPDATE SET \
                action = EXCLUDED.action, \
                target_branch_id = EXCLUDED.target_branch_id, \
                created_at = NOW() \
             RETURNING {CHANGELIST_ITEM_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, ChangelistItem>(&query)
            .bind(item.id)
            .bind(item.changelist_id)
            .bind(item.asset_version_id)
            .bind(item.action)
            .bind(item.target_branch_id)
            .bind(item.created_at)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_write_error)?)
    }

    async fn delete_changelist_item(
        &mut self,
        changelist_id: Uuid,
        item_id: Uuid,
    ) -> StoreResult<bool> {
        let result =
            sqlx::query("DELETE FROM changelist_items WHERE id = $1 AND changelist_id = $2")
                .bind(item_id)
                .bind(changelist_id)
                .execute(&mut *self.tx)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Branch merges, conflicts, jobs
    // =========================================================================

    async fn list_branch_merges(&mut self, project_id: Uuid) -> StoreResult<Vec<BranchMerge>> {
        let query = format!(
            "SELECT {MERGE_COLUMNS} FROM branch_merges WHERE project_id = $1 \
             ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, BranchMerge>(&query)
            .bind(project_id)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn find_branch_merge(&mut self, id: Uuid) -> StoreResult<Option<BranchMerge>> {
        let query = format!("SELECT {MERGE_COLUMNS} FROM branch_merges WHERE id = $1");
        Ok(sqlx::query_as::<_, BranchMerge>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn lock_branch_merge(&mut self, id: Uuid) -> StoreResult<Option<BranchMerge>> {
        let query = format!("SELECT {MERGE_COLUMNS} FROM branch_merges WHERE id = $1 FOR UPDATE");
        Ok(sqlx::query_as::<_, BranchMerge>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_branch_merge(&mut self, merge: &BranchMerge) -> StoreResult<()> {
        let query = format!(
            "INSERT INTO branch_merges ({MERGE_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        sqlx::query(&query)
            .bind(merge.id)
            .bind(merge.project_id)
            .bind(merge.source_branch_id)
            .bind(merge.target_branch_id)
            .bind(merge.initiated_by)
            .bind(merge.status)
            .bind(&merge.conflict_summary)
            .bind(&merge.notes)
            .bind(merge.created_at)
            .bind(merge.updated_at)
            .bind(merge.completed_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn update_branch_merge(&mut self, merge: &BranchMerge) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE branch_merges SET \
                status = $2, conflict_summary = $3, notes = $4, \
                updated_at = $5, completed_at = $6 \
             WHERE id = $1",
        )
        .bind(merge.id)
        .bind(merge.status)
        .bind(&merge.conflict_summary)
        .bind(&merge.notes)
        .bind(merge.updated_at)
        .bind(merge.completed_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        expect_one(result.rows_affected())
    }

    async fn list_merge_conflicts(&mut self, merge_id: Uuid) -> StoreResult<Vec<MergeConflict>> {
        let query = format!(
            "SELECT {CONFLICT_COLUMNS} FROM merge_conflicts WHERE branch_merge_id = $1 \
             ORDER BY created_at DESC"
        );
        Ok(sqlx::query_as::<_, MergeConflict>(&query)
            .bind(merge_id)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn find_merge_conflict(&mut self, id: Uuid) -> StoreResult<Option<MergeConflict>> {
        let query = format!("SELECT {CONFLICT_COLUMNS} FROM merge_conflicts WHERE id = $1");
        Ok(sqlx::query_as::<_, MergeConflict>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_merge_conflict(&mut self, conflict: &MergeConflict) -> StoreResult<()> {
        let query = format!(
            "INSERT INTO merge_conflicts ({CONFLICT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        );
        sqlx::query(&query)
            .bind(conflict.id)
            .bind(conflict.branch_merge_id)
            .bind(conflict.asset_id)
            .bind(conflict.asset_version_id)
            .bind(&conflict.description)
            .bind(&conflict.resolution)
            .bind(conflict.resolved_at)
            .bind(conflict.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn update_merge_conflict(&mut self, conflict: &MergeConflict) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE merge_conflicts SET description = $2, resolution = $3, resolved_at = $4 \
             WHERE id = $1",
        )
        .bind(conflict.id)
        .bind(&conflict.description)
        .bind(&conflict.resolution)
        .bind(conflict.resolved_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        expect_one(result.rows_affected())
    }

    async fn count_unresolved_conflicts(&mut self, merge_id: Uuid) -> StoreResult<usize> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM merge_conflicts \
             WHERE branch_merge_id = $1 AND resolved_at IS NULL",
        )
        .bind(merge_id)
        .fetch_one(&mut *self.tx)
        .await?;
        usize::try_from(count).map_err(|e| RepositoryError::InvalidData(e.to_string()))
    }

    async fn list_merge_jobs(&mut self, merge_id: Uuid) -> StoreResult<Vec<MergeJob>> {
        let query = format!(
            "SELECT {JOB_COLUMNS} FROM merge_jobs WHERE branch_merge_id = $1 \
             ORDER BY created_at ASC"
        );
        Ok(sqlx::query_as::<_, MergeJob>(&query)
            .bind(merge_id)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn find_merge_job(&mut self, id: Uuid) -> StoreResult<Option<MergeJob>> {
        let query = format!("SELECT {JOB_COLUMNS} FROM merge_jobs WHERE id = $1");
        Ok(sqlx::query_as::<_, MergeJob>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn lock_merge_job(&mut self, id: Uuid) -> StoreResult<Option<MergeJob>> {
        let query = format!("SELECT {JOB_COLUMNS} FROM merge_jobs WHERE id = $1 FOR UPDATE");
        Ok(sqlx::query_as::<_, MergeJob>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_merge_job(&mut self, job: &MergeJob) -> StoreResult<()> {
        let query = format!(
            "INSERT INTO merge_jobs ({JOB_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        );
        sqlx::query(&query)
            .bind(job.id)
            .bind(job.branch_merge_id)
            .bind(job.job_type)
            .bind(job.status)
            .bind(&job.conflict_snapshot)
            .bind(job.submit_gate_passed)
            .bind(&job.logs)
            .bind(job.started_at)
            .bind(job.completed_at)
            .bind(job.created_at)
            .bind(job.updated_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn update_merge_job(&mut self, job: &MergeJob) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE merge_jobs SET \
                status = $2, conflict_snapshot = $3, submit_gate_passed = $4, logs = $5, \
                started_at = $6, completed_at = $7, updated_at = $8 \
             WHERE id = $1",
        )
        .bind(job.id)
        .bind(job.status)
        .bind(&job.conflict_snapshot)
        .bind(job.submit_gate_passed)
        .bind(&job.logs)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(job.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        expect_one(result.rows_affected())
    }

    async fn settle_merge_job(
        &mut self,
        job: &MergeJob,
        appended_logs: &str,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE merge_jobs SET \
                status = $2, submit_gate_passed = $3, completed_at = $4, \
                logs = logs || $5, updated_at = $6 \
             WHERE id = $1 AND status = 'running'",
        )
        .bind(job.id)
        .bind(job.status)
        .bind(job.submit_gate_passed)
        .bind(job.completed_at)
        .bind(appended_logs)
        .bind(job.updated_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;
        Ok(result.rows_affected() == 1)
    }

    async fn claim_merge_job(&mut self, id: Uuid) -> StoreResult<Option<MergeJob>> {
        // Compare-and-set: concurrent claimers serialise on the row lock and
        // all but one see a non-queued status.
        let query = format!(
            "UPDATE merge_jobs SET \
                status = 'running', \
                started_at = COALESCE(started_at, $2), \
                updated_at = $2 \
             WHERE id = $1 AND status = 'queued' \
             RETURNING {JOB_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, MergeJob>(&query)
            .bind(id)
            .bind(Utc::now())
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    // =========================================================================
    // Permissions and locks
    // =========================================================================

    async fn list_permissions(&mut self, project_id: Uuid) -> StoreResult<Vec<Permission>> {
        let query = format!(
            "SELECT {PERMISSION_COLUMNS} FROM permissions WHERE project_id = $1 \
             ORDER BY user_id ASC"
        );
        Ok(sqlx::query_as::<_, Permission>(&query)
            .bind(project_id)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn find_permission(&mut self, id: Uuid) -> StoreResult<Option<Permission>> {
        let query = format!("SELECT {PERMISSION_COLUMNS} FROM permissions WHERE id = $1");
        Ok(sqlx::query_as::<_, Permission>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_permission(&mut self, permission: &Permission) -> StoreResult<()> {
        let query = format!(
            "INSERT INTO permissions ({PERMISSION_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        );
        sqlx::query(&query)
            .bind(permission.id)
            .bind(permission.project_id)
            .bind(permission.asset_id)
            .bind(permission.user_id)
            .bind(permission.read)
            .bind(permission.write)
            .bind(permission.delete)
            .bind(permission.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn update_permission(&mut self, permission: &Permission) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE permissions SET can_read = $2, can_write = $3, can_delete = $4 WHERE id = $1",
        )
        .bind(permission.id)
        .bind(permission.read)
        .bind(permission.write)
        .bind(permission.delete)
        .execute(&mut *self.tx)
        .await?;
        expect_one(result.rows_affected())
    }

    async fn delete_permission(&mut self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM permissions WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_locks(&mut self, project_id: Uuid) -> StoreResult<Vec<AssetLock>> {
        let query = format!(
            "SELECT {} FROM asset_locks l \
             JOIN assets a ON a.id = l.asset_id \
             WHERE a.project_id = $1 \
             ORDER BY l.locked_at DESC",
            prefixed("l", LOCK_COLUMNS)
        );
        Ok(sqlx::query_as::<_, AssetLock>(&query)
            .bind(project_id)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn find_lock(&mut self, asset_id: Uuid) -> StoreResult<Option<AssetLock>> {
        let query = format!("SELECT {LOCK_COLUMNS} FROM asset_locks WHERE asset_id = $1");
        Ok(sqlx::query_as::<_, AssetLock>(&query)
            .bind(asset_id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn upsert_lock(&mut self, lock: &AssetLock) -> StoreResult<AssetLock> {
        let query = format!(
            "INSERT INTO asset_locks ({LOCK_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             ON CONFLICT (asset_id) DO UPDATE SET \
                locked_by = EXCLUDED.locked_by, \
                workspace_id = EXCLUDED.workspace_id, \
                locked_at = NOW(), \
                expires_at = EXCLUDED.expires_at, \
                notes = EXCLUDED.notes \
             RETURNING {LOCK_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, AssetLock>(&query)
            .bind(lock.id)
            .bind(lock.asset_id)
            .bind(lock.locked_by)
            .bind(lock.workspace_id)
            .bind(lock.locked_at)
            .bind(lock.expires_at)
            .bind(&lock.notes)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_write_error)?)
    }

    async fn delete_lock(&mut self, asset_id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM asset_locks WHERE asset_id = $1")
            .bind(asset_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Reviews
    // =========================================================================

    async fn list_pending_reviews(&mut self) -> StoreResult<Vec<AssetReview>> {
        let query = format!(
            "SELECT {REVIEW_COLUMNS} FROM asset_reviews WHERE status = 'pending' \
             ORDER BY reviewed_at DESC NULLS LAST, created_at DESC"
        );
        Ok(sqlx::query_as::<_, AssetReview>(&query)
            .fetch_all(&mut *self.tx)
            .await?)
    }

    async fn find_asset_review(&mut self, id: Uuid) -> StoreResult<Option<AssetReview>> {
        let query = format!("SELECT {REVIEW_COLUMNS} FROM asset_reviews WHERE id = $1");
        Ok(sqlx::query_as::<_, AssetReview>(&query)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?)
    }

    async fn insert_asset_review(&mut self, review: &AssetReview) -> StoreResult<()> {
        let query = format!(
            "INSERT INTO asset_reviews ({REVIEW_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        );
        sqlx::query(&query)
            .bind(review.id)
            .bind(review.asset_version_id)
            .bind(review.requested_by)
            .bind(review.reviewer_id)
            .bind(review.status)
            .bind(&review.comments)
            .bind(review.reviewed_at)
            .bind(review.created_at)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;
        Ok(())
    }

    async fn update_asset_review(&mut self, review: &AssetReview) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE asset_reviews SET reviewer_id = $2, status = $3, comments = $4, \
             reviewed_at = $5 WHERE id = $1",
        )
        .bind(review.id)
        .bind(review.reviewer_id)
        .bind(review.status)
        .bind(&review.comments)
        .bind(review.reviewed_at)
        .execute(&mut *self.tx)
        .await?;
        expect_one(result.rows_affected())
    }
}

/// Qualify a column list with a table alias
fn prefixed(alias: &str, columns: &str) -> String {
    columns
        .split(',')
        .map(|column| format!("{}.{}", alias, column.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use depot_auth::ActorRole;
    use depot_domain::entities::ChangeAction;
    use depot_domain::state::{MergeJobStatus, MergeJobType};

    #[test]
    fn test_prefixed_columns() {
        assert_eq!(prefixed("s", "id, workspace_id"), "s.id, s.workspace_id");
    }

    #[test]
    fn test_column_lists_match_entity_arity() {
        assert_eq!(JOB_COLUMNS.split(',').count(), 11);
        assert_eq!(CHANGELIST_COLUMNS.split(',').count(), 11);
        assert_eq!(PROJECT_COLUMNS.split(',').count(), 12);
        assert_eq!(REVIEW_COLUMNS.split(',').count(), 8);
    }

    #[test]
    fn test_migrations_are_embedded() {
        assert!(MIGRATOR.iter().count() >= 2);
    }

    async fn setup_test_store(max_connections: u32) -> PgStore {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "postgresql://localhost/depot_test".to_string());
        let store = PgStore::connect(&url, max_connections).await.unwrap();
        store.migrate().await.unwrap();
        store
    }

    fn admin() -> AuthContext {
        AuthContext::new(Uuid::new_v4(), ActorRole::Admin)
    }

    /// Committed rows every test builds on: a project with two branches,
    /// a workspace, one asset at version 1, and a merge between the branches
    struct Seed {
        workspace: Workspace,
        asset: Asset,
        version: AssetVersion,
        merge: BranchMerge,
    }

    async fn seed(store: &PgStore, actor: &AuthContext) -> Seed {
        let code = format!("T{}", &Uuid::new_v4().simple().to_string()[..12]);
        let project = Project::new("Harbor".to_string(), code, None).unwrap();
        let main = Branch::new(project.id, "main".to_string(), None, None, actor.user_id).unwrap();
        let feature = Branch::new(
            project.id,
            "feature".to_string(),
            None,
            Some(main.id),
            actor.user_id,
        )
        .unwrap();
        let workspace = Workspace::new(
            project.id,
            actor.user_id,
            Some(feature.id),
            "ws".to_string(),
            None,
        )
        .unwrap();
        let asset = Asset::new(
            project.id,
            "hero".to_string(),
            "model".to_string(),
            serde_json::json!({}),
            actor.user_id,
        )
        .unwrap();
        let version = AssetVersion::new(asset.id, 1, Some(feature.id), None, None).unwrap();
        let merge = BranchMerge::new(project.id, feature.id, main.id, actor.user_id, None).unwrap();

        let mut uow = store.begin(actor).await.unwrap();
        uow.insert_project(&project).await.unwrap();
        uow.insert_branch(&main).await.unwrap();
        uow.insert_branch(&feature).await.unwrap();
        uow.insert_workspace(&workspace).await.unwrap();
        uow.insert_asset(&asset).await.unwrap();
        uow.insert_asset_version(&version).await.unwrap();
        uow.insert_branch_merge(&merge).await.unwrap();
        uow.commit().await.unwrap();

        Seed {
            workspace,
            asset,
            version,
            merge,
        }
    }

    async fn queued_job(store: &PgStore, actor: &AuthContext, merge_id: Uuid) -> MergeJob {
        let job =
            MergeJob::new(merge_id, MergeJobType::SubmitGate, MergeJobStatus::Queued).unwrap();
        let mut uow = store.begin(actor).await.unwrap();
        uow.insert_merge_job(&job).await.unwrap();
        uow.commit().await.unwrap();
        job
    }

    async fn claim_and_commit(store: &PgStore, actor: &AuthContext, id: Uuid) -> Option<MergeJob> {
        let mut uow = store.begin(actor).await.unwrap();
        let claimed = uow.claim_merge_job(id).await.unwrap();
        uow.commit().await.unwrap();
        claimed
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_claim_is_compare_and_set() {
        let store = setup_test_store(2).await;
        let actor = admin();
        let seed = seed(&store, &actor).await;
        let job = queued_job(&store, &actor, seed.merge.id).await;

        let claimed = claim_and_commit(&store, &actor, job.id).await.unwrap();
        assert_eq!(claimed.status, MergeJobStatus::Running);
        assert!(claimed.started_at.is_some());
        assert!(claim_and_commit(&store, &actor, job.id).await.is_none());
        assert!(claim_and_commit(&store, &actor, Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_concurrent_claims_have_one_winner() {
        let store = setup_test_store(4).await;
        let actor = admin();
        let seed = seed(&store, &actor).await;
        let job = queued_job(&store, &actor, seed.merge.id).await;

        let (first, second) = tokio::join!(
            claim_and_commit(&store, &actor, job.id),
            claim_and_commit(&store, &actor, job.id)
        );
        assert_eq!(
            [first.is_some(), second.is_some()]
                .iter()
                .filter(|won| **won)
                .count(),
            1
        );
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_settle_is_conditional_and_appends() {
        let store = setup_test_store(2).await;
        let actor = admin();
        let seed = seed(&store, &actor).await;
        let job = queued_job(&store, &actor, seed.merge.id).await;
        let mut claimed = claim_and_commit(&store, &actor, job.id).await.unwrap();

        // An operator note lands between claim and settlement
        let mut uow = store.begin(&actor).await.unwrap();
        let mut noted = uow.lock_merge_job(job.id).await.unwrap().unwrap();
        noted.logs.push_str("operator note\n");
        uow.update_merge_job(&noted).await.unwrap();
        uow.commit().await.unwrap();

        claimed.succeed(true).unwrap();
        let mut uow = store.begin(&actor).await.unwrap();
        assert!(uow.settle_merge_job(&claimed, "gate passed\n").await.unwrap());
        assert!(!uow.settle_merge_job(&claimed, "again\n").await.unwrap());
        let stored = uow.find_merge_job(job.id).await.unwrap().unwrap();
        uow.commit().await.unwrap();

        assert_eq!(stored.status, MergeJobStatus::Completed);
        assert!(stored.submit_gate_passed);
        assert!(stored.logs.ends_with("operator note\ngate passed\n"));
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_merge_lock_blocks_second_writer() {
        let store = setup_test_store(2).await;
        let actor = admin();
        let seed = seed(&store, &actor).await;

        let mut holder = store.begin(&actor).await.unwrap();
        holder.lock_branch_merge(seed.merge.id).await.unwrap().unwrap();

        let contender = {
            let store = store.clone();
            let actor = actor.clone();
            let merge_id = seed.merge.id;
            tokio::spawn(async move {
                let mut uow = store.begin(&actor).await.unwrap();
                let merge = uow.lock_branch_merge(merge_id).await.unwrap();
                uow.commit().await.unwrap();
                merge
            })
        };

        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
        assert!(!contender.is_finished());

        holder.commit().await.unwrap();
        assert!(contender.await.unwrap().is_some());
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_upserts_keep_one_row_per_key() {
        let store = setup_test_store(2).await;
        let actor = admin();
        let seed = seed(&store, &actor).await;
        let mut uow = store.begin(&actor).await.unwrap();

        // (asset_id, version_number)
        let mut again = AssetVersion::new(
            seed.asset.id,
            1,
            None,
            Some("blobs/hero".to_string()),
            None,
        )
        .unwrap();
        again.notes = Some("re-upload".to_string());
        let stored = uow.upsert_asset_version(&again).await.unwrap();
        assert_eq!(stored.id, seed.version.id);
        assert_eq!(stored.file_path.as_deref(), Some("blobs/hero"));
        assert_eq!(uow.list_asset_versions(seed.asset.id).await.unwrap().len(), 1);

        // (changelist_id, asset_version_id)
        let changelist = Changelist::new(
            seed.workspace.project_id,
            seed.workspace.id,
            actor.user_id,
            None,
            None,
        );
        uow.insert_changelist(&changelist).await.unwrap();
        let add = ChangelistItem::new(changelist.id, seed.version.id, ChangeAction::Add, None);
        let edit = ChangelistItem::new(changelist.id, seed.version.id, ChangeAction::Edit, None);
        let first = uow.upsert_changelist_item(&add).await.unwrap();
        let second = uow.upsert_changelist_item(&edit).await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.action, ChangeAction::Edit);
        assert_eq!(uow.list_changelist_items(changelist.id).await.unwrap().len(), 1);

        // asset_id
        let holder = Uuid::new_v4();
        let taker = Uuid::new_v4();
        let first = uow
            .upsert_lock(&AssetLock::new(seed.asset.id, holder, None, None, None))
            .await
            .unwrap();
        let second = uow
            .upsert_lock(&AssetLock::new(seed.asset.id, taker, None, None, None))
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.locked_by, taker);

        uow.rollback().await.unwrap();
    }

    #[tokio::test]
    #[ignore] // Requires database setup
    async fn test_actor_settings_are_transaction_local() {
        let store = setup_test_store(1).await;
        let actor = AuthContext::new(Uuid::new_v4(), ActorRole::Member);

        let mut uow = store.open(&actor).await.unwrap();
        let (user_id, role): (String, String) = sqlx::query_as(
            "SELECT current_setting('app.current_user_id', true), \
                    current_setting('app.current_user_role', true)",
        )
        .fetch_one(&mut *uow.tx)
        .await
        .unwrap();
        assert_eq!(user_id, actor.user_id.to_string());
        assert_eq!(role, actor.role.as_str());
        Box::new(uow).commit().await.unwrap();

        // One pooled connection, so this reuses the session above
        let leaked: Option<String> =
            sqlx::query_scalar("SELECT current_setting('app.current_user_id', true)")
                .fetch_one(store.pool())
                .await
                .unwrap();
        assert!(leaked.is_none_or(|value| value.is_empty()));
    }
}
