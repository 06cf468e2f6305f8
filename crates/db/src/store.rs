//! Store traits

use depot_auth::AuthContext;
use depot_common::RepositoryError;
use depot_domain::entities::{
    Asset, AssetLock, AssetReview, AssetVersion, Branch, BranchMerge, Changelist,
    ChangelistItem, MergeConflict, MergeJob, Permission, Project, Shelf, Workspace,
};
use uuid::Uuid;

pub type StoreResult<T> = Result<T, RepositoryError>;

/// Opens units of work bound to an actor
#[async_trait::async_trait]
pub trait EntityStore: Send + Sync {
    async fn begin(&self, actor: &AuthContext) -> StoreResult<Box<dyn UnitOfWork>>;
}

/// One atomic unit of work.
///
/// List operations return rows newest first unless noted.
#[async_trait::async_trait]
pub trait UnitOfWork: Send {
    /// Actor this unit of work is bound to
    fn actor(&self) -> &AuthContext;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;

    // =========================================================================
    // Projects, branches, workspaces
    // =========================================================================

    async fn list_projects(&mut self, include_archived: bool) -> StoreResult<Vec<Project>>;
    async fn find_project(&mut self, id: Uuid) -> StoreResult<Option<Project>>;
    async fn insert_project(&mut self, project: &Project) -> StoreResult<()>;
    async fn update_project(&mut self, project: &Project) -> StoreResult<()>;

    async fn list_branches(&mut self, project_id: Uuid) -> StoreResult<Vec<Branch>>;
    async fn find_branch(&mut self, id: Uuid) -> StoreResult<Option<Branch>>;
    async fn insert_branch(&mut self, branch: &Branch) -> StoreResult<()>;
    async fn update_branch(&mut self, branch: &Branch) -> StoreResult<()>;

    async fn list_workspaces(&mut self, project_id: Uuid) -> StoreResult<Vec<Workspace>>;
    async fn find_workspace(&mut self, id: Uuid) -> StoreResult<Option<Workspace>>;
    async fn insert_workspace(&mut self, workspace: &Workspace) -> StoreResult<()>;

    // =========================================================================
    // Assets
    // =========================================================================

    async fn list_assets(&mut self, project_id: Uuid) -> StoreResult<Vec<Asset>>;
    async fn find_asset(&mut self, id: Uuid) -> StoreResult<Option<Asset>>;
    async fn insert_asset(&mut self, asset: &Asset) -> StoreResult<()>;

    /// Versions of one asset, lowest version number first
    async fn list_asset_versions(&mut self, asset_id: Uuid) -> StoreResult<Vec<AssetVersion>>;
    async fn find_asset_version(&mut self, id: Uuid) -> StoreResult<Option<AssetVersion>>;
    /// Fails with `AlreadyExists` on a duplicate (asset_id, version_number)
    async fn insert_asset_version(&mut self, version: &AssetVersion) -> StoreResult<()>;
    /// Insert, or overwrite branch/file/notes of the existing (asset_id, version_number)
    async fn upsert_asset_version(&mut self, version: &AssetVersion)
        -> StoreResult<AssetVersion>;

    // =========================================================================
    // Shelves and changelists
    // =========================================================================

    /// Shelves of every workspace in the project
    async fn list_shelves(&mut self, project_id: Uuid) -> StoreResult<Vec<Shelf>>;
    async fn find_shelf(&mut self, id: Uuid) -> StoreResult<Option<Shelf>>;
    async fn insert_shelf(&mut self, shelf: &Shelf) -> StoreResult<()>;
    async fn update_shelf(&mut self, shelf: &Shelf) -> StoreResult<()>;
    async fn delete_shelf(&mut self, id: Uuid) -> StoreResult<bool>;
    /// Most recently created shelf linked to the changelist
    async fn latest_shelf_for_changelist(&mut self, changelist_id: Uuid)
        -> StoreResult<Option<Uuid>>;

    async fn list_changelists(&mut self, project_id: Uuid) -> StoreResult<Vec<Changelist>>;
    async fn find_changelist(&mut self, id: Uuid) -> StoreResult<Option<Changelist>>;
    async fn insert_changelist(&mut self, changelist: &Changelist) -> StoreResult<()>;
    async fn update_changelist(&mut self, changelist: &Changelist) -> StoreResult<()>;

    /// Items in creation order
    async fn list_changelist_items(&mut self, changelist_id: Uuid)
        -> StoreResult<Vec<ChangelistItem>>;
    /// Insert, or replace action/target of the existing (changelist_id, asset_version_id)
    async fn upsert_changelist_item(&mut self, item: &ChangelistItem)
        -> StoreResult<ChangelistItem>;
    async fn delete_changelist_item(&mut self, changelist_id: Uuid, item_id: Uuid)
        -> StoreResult<bool>;

    // =========================================================================
    // Branch merges, conflicts, jobs
    // =========================================================================

    async fn list_branch_merges(&mut self, project_id: Uuid) -> StoreResult<Vec<BranchMerge>>;
    async fn find_branch_merge(&mut self, id: Uuid) -> StoreResult<Option<BranchMerge>>;
    /// Read the merge and hold its row lock until the unit of work ends.
    ///
    /// Every write that feeds the completion decision (job settlement,
    /// conflict changes, gate checks) takes this lock first.
    async fn lock_branch_merge(&mut self, id: Uuid) -> StoreResult<Option<BranchMerge>>;
    async fn insert_branch_merge(&mut self, merge: &BranchMerge) -> StoreResult<()>;
    async fn update_branch_merge(&mut self, merge: &BranchMerge) -> StoreResult<()>;

    async fn list_merge_conflicts(&mut self, merge_id: Uuid) -> StoreResult<Vec<MergeConflict>>;
    async fn find_merge_conflict(&mut self, id: Uuid) -> StoreResult<Option<MergeConflict>>;
    async fn insert_merge_conflict(&mut self, conflict: &MergeConflict) -> StoreResult<()>;
    async fn update_merge_conflict(&mut self, conflict: &MergeConflict) -> StoreResult<()>;
    async fn count_unresolved_conflicts(&mut self, merge_id: Uuid) -> StoreResult<usize>;

    /// Jobs of one merge in creation order
    async fn list_merge_jobs(&mut self, merge_id: Uuid) -> StoreResult<Vec<MergeJob>>;
    async fn find_merge_job(&mut self, id: Uuid) -> StoreResult<Option<MergeJob>>;
    /// Read the job and hold its row lock. Take the merge lock first.
    async fn lock_merge_job(&mut self, id: Uuid) -> StoreResult<Option<MergeJob>>;
    async fn insert_merge_job(&mut self, job: &MergeJob) -> StoreResult<()>;
    async fn update_merge_job(&mut self, job: &MergeJob) -> StoreResult<()>;

    /// Conditional `running -> completed|failed`.
    ///
    /// Writes status, gate flag and completion time from `job` and appends
    /// `appended_logs` to the stored log. Returns `false` without writing
    /// when the stored job is no longer `running`.
    async fn settle_merge_job(&mut self, job: &MergeJob, appended_logs: &str)
        -> StoreResult<bool>;

    /// Conditional `queued -> running`.
    ///
    /// Returns the claimed job, or `None` when the job is not currently
    /// queued (or does not exist). This is the only guard against a job
    /// executing twice.
    async fn claim_merge_job(&mut self, id: Uuid) -> StoreResult<Option<MergeJob>>;

    // =========================================================================
    // Permissions and locks
    // =========================================================================

    /// Permissions of the project ordered by user
    async fn list_permissions(&mut self, project_id: Uuid) -> StoreResult<Vec<Permission>>;
    async fn find_permission(&mut self, id: Uuid) -> StoreResult<Option<Permission>>;
    async fn insert_permission(&mut self, permission: &Permission) -> StoreResult<()>;
    async fn update_permission(&mut self, permission: &Permission) -> StoreResult<()>;
    async fn delete_permission(&mut self, id: Uuid) -> StoreResult<bool>;

    /// Locks on assets of the project
    async fn list_locks(&mut self, project_id: Uuid) -> StoreResult<Vec<AssetLock>>;
    async fn find_lock(&mut self, asset_id: Uuid) -> StoreResult<Option<AssetLock>>;
    /// Insert, or take over the existing lock on the asset (last writer wins)
    async fn upsert_lock(&mut self, lock: &AssetLock) -> StoreResult<AssetLock>;
    async fn delete_lock(&mut self, asset_id: Uuid) -> StoreResult<bool>;

    // =========================================================================
    // Reviews
    // =========================================================================

    /// Pending reviews across all projects, latest verdict first, then newest
    async fn list_pending_reviews(&mut self) -> StoreResult<Vec<AssetReview>>;
    async fn find_asset_review(&mut self, id: Uuid) -> StoreResult<Option<AssetReview>>;
    async fn insert_asset_review(&mut self, review: &AssetReview) -> StoreResult<()>;
    async fn update_asset_review(&mut self, review: &AssetReview) -> StoreResult<()>;
}
