//! In-process Entity Store
//!
//! Units of work are serialised behind one async mutex. Each unit of work
//! mutates a private copy of the tables, which replaces the shared state on
//! commit and is discarded on drop. Rows are kept in insertion order, which
//! is creation order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use depot_auth::AuthContext;
use depot_common::RepositoryError;
use depot_domain::entities::{
    Asset, AssetLock, AssetReview, AssetVersion, Branch, BranchMerge, Changelist,
    ChangelistItem, MergeConflict, MergeJob, Permission, Project, Shelf, Workspace,
};
use depot_domain::state::MergeJobStatus;

use crate::store::{EntityStore, StoreResult, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct Tables {
    projects: Vec<Project>,
    branches: Vec<Branch>,
    workspaces: Vec<Workspace>,
    assets: Vec<Asset>,
    asset_versions: Vec<AssetVersion>,
    shelves: Vec<Shelf>,
    changelists: Vec<Changelist>,
    changelist_items: Vec<ChangelistItem>,
    branch_merges: Vec<BranchMerge>,
    merge_conflicts: Vec<MergeConflict>,
    merge_jobs: Vec<MergeJob>,
    permissions: Vec<Permission>,
    asset_locks: Vec<AssetLock>,
    asset_reviews: Vec<AssetReview>,
}

impl Tables {
    fn project_of_workspace(&self, workspace_id: Uuid) -> Option<Uuid> {
        self.workspaces
            .iter()
            .find(|w| w.id == workspace_id)
            .map(|w| w.project_id)
    }

    fn project_of_asset(&self, asset_id: Uuid) -> Option<Uuid> {
        self.assets
            .iter()
            .find(|a| a.id == asset_id)
            .map(|a| a.project_id)
    }
}

#[derive(Debug, Default)]
struct Faults {
    job_updates: AtomicBool,
}

/// In-memory Entity Store
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    faults: Arc<Faults>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every merge job write fail until reset
    pub fn set_fail_job_updates(&self, fail: bool) {
        self.faults.job_updates.store(fail, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl EntityStore for MemoryStore {
    async fn begin(&self, actor: &AuthContext) -> StoreResult<Box<dyn UnitOfWork>> {
        let guard = self.tables.clone().lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            working,
            actor: actor.clone(),
            faults: self.faults.clone(),
        }))
    }
}

struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
    actor: AuthContext,
    faults: Arc<Faults>,
}

impl MemoryUnitOfWork {
    fn check_job_fault(&self) -> StoreResult<()> {
        if self.faults.job_updates.load(Ordering::SeqCst) {
            return Err(RepositoryError::Backend(
                "injected merge job update failure".to_string(),
            ));
        }
        Ok(())
    }
}

fn newest_first<T>(rows: impl DoubleEndedIterator<Item = T>) -> Vec<T> {
    rows.rev().collect()
}

fn replace<T: Clone>(rows: &mut [T], matches: impl Fn(&T) -> bool, value: &T) -> StoreResult<()> {
    match rows.iter_mut().find(|row| matches(row)) {
        Some(row) => {
            *row = value.clone();
            Ok(())
        }
        None => Err(RepositoryError::NotFound),
    }
}

fn remove<T>(rows: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> bool {
    let before = rows.len();
    rows.retain(|row| !matches(row));
    rows.len() != before
}

#[async_trait::async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    fn actor(&self) -> &AuthContext {
        &self.actor
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryUnitOfWork {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }

    // Projects, branches, workspaces

    async fn list_projects(&mut self, include_archived: bool) -> StoreResult<Vec<Project>> {
        Ok(newest_first(
            self.working
                .projects
                .iter()
                .filter(|p| include_archived || p.archived_at.is_none())
                .cloned(),
        ))
    }

    async fn find_project(&mut self, id: Uuid) -> StoreResult<Option<Project>> {
        Ok(self.working.projects.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_project(&mut self, project: &Project) -> StoreResult<()> {
        if self.working.projects.iter().any(|p| p.code == project.code) {
            return Err(RepositoryError::AlreadyExists);
        }
        self.working.projects.push(project.clone());
        Ok(())
    }

    async fn update_project(&mut self, project: &Project) -> StoreResult<()> {
        let mut project = project.clone();
        project.updated_at = Utc::now();
        replace(&mut self.working.projects, |p| p.id == project.id, &project)
    }

    async fn list_branches(&mut self, project_id: Uuid) -> StoreResult<Vec<Branch>> {
        Ok(newest_first(
            self.working
                .branches
                .iter()
                .filter(|b| b.project_id == project_id)
                .cloned(),
        ))
    }

    async fn find_branch(&mut self, id: Uuid) -> StoreResult<Option<Branch>> {
        Ok(self.working.branches.iter().find(|b| b.id == id).cloned())
    }

    async fn insert_branch(&mut self, branch: &Branch) -> StoreResult<()> {
        self.working.branches.push(branch.clone());
        Ok(())
    }

    async fn update_branch(&mut self, branch: &Branch) -> StoreResult<()> {
        let mut branch = branch.clone();
        branch.updated_at = Utc::now();
        replace(&mut self.working.branches, |b| b.id == branch.id, &branch)
    }

    async fn list_workspaces(&mut self, project_id: Uuid) -> StoreResult<Vec<Workspace>> {
        Ok(newest_first(
            self.working
                .workspaces
                .iter()
                .filter(|w| w.project_id == project_id)
                .cloned(),
        ))
    }

    async fn find_workspace(&mut self, id: Uuid) -> StoreResult<Option<Workspace>> {
        Ok(self.working.workspaces.iter().find(|w| w.id == id).cloned())
    }

    async fn insert_workspace(&mut self, workspace: &Workspace) -> StoreResult<()> {
        self.working.workspaces.push(workspace.clone());
        Ok(())
    }

    // Assets

    async fn list_assets(&mut self, project_id: Uuid) -> StoreResult<Vec<Asset>> {
        Ok(newest_first(
            self.working
                .assets
                .iter()
                .filter(|a| a.project_id == project_id)
                .cloned(),
        ))
    }

    async fn find_asset(&mut self, id: Uuid) -> StoreResult<Option<Asset>> {
        Ok(self.working.assets.iter().find(|a| a.id == id).cloned())
    }

    async fn insert_asset(&mut self, asset: &Asset) -> StoreResult<()> {
        self.working.assets.push(asset.clone());
        Ok(())
    }

    async fn list_asset_versions(&mut self, asset_id: Uuid) -> StoreResult<Vec<AssetVersion>> {
        let mut versions: Vec<AssetVersion> = self
            .working
            .asset_versions
            .iter()
            .filter(|v| v.asset_id == asset_id)
            .cloned()
            .collect();
        versions.sort_by_key(|v| v.version_number);
        Ok(versions)
    }

    async fn find_asset_version(&mut self, id: Uuid) -> StoreResult<Option<AssetVersion>> {
        Ok(self
            .working
            .asset_versions
            .iter()
            .find(|v| v.id == id)
            .cloned())
    }

    async fn insert_asset_version(&mut self, version: &AssetVersion) -> StoreResult<()> {
        if self.working.asset_versions.iter().any(|v| {
            v.asset_id == version.asset_id && v.version_number == version.version_number
        }) {
            return Err(RepositoryError::AlreadyExists);
        }
        self.working.asset_versions.push(version.clone());
        Ok(())
    }

    async fn upsert_asset_version(
        &mut self,
        version: &AssetVersion,
    ) -> StoreResult<AssetVersion> {
        let existing = self.working.asset_versions.iter_mut().find(|v| {
            v.asset_id == version.asset_id && v.version_number == version.version_number
        });
        match existing {
            Some(row) => {
                row.branch_id = version.branch_id;
                row.file_path = version.file_path.clone();
                row.notes = version.notes.clone();
                row.created_at = Utc::now();
                Ok(row.clone())
            }
            None => {
                self.working.asset_versions.push(version.clone());
                Ok(version.clone())
            }
        }
    }

    // Shelves and changelists

    async fn list_shelves(&mut self, project_id: Uuid) -> StoreResult<Vec<Shelf>> {
        let tables = &self.working;
        Ok(newest_first(
            tables
                .shelves
                .iter()
                .filter(|s| tables.project_of_workspace(s.workspace_id) == Some(project_id))
                .cloned(),
        ))
    }

    async fn find_shelf(&mut self, id: Uuid) -> StoreResult<Option<Shelf>> {
        Ok(self.working.shelves.iter().find(|s| s.id == id).cloned())
    }

    async fn insert_shelf(&mut self, shelf: &Shelf) -> StoreResult<()> {
        self.working.shelves.push(shelf.clone());
        Ok(())
    }

    async fn update_shelf(&mut self, shelf: &Shelf) -> StoreResult<()> {
        replace(&mut self.working.shelves, |s| s.id == shelf.id, shelf)
    }

    async fn delete_shelf(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(remove(&mut self.working.shelves, |s| s.id == id))
    }

    async fn latest_shelf_for_changelist(
        &mut self,
        changelist_id: Uuid,
    ) -> StoreResult<Option<Uuid>> {
        Ok(self
            .working
            .shelves
            .iter()
            .filter(|s| s.changelist_id == Some(changelist_id))
            .max_by_key(|s| s.created_at)
            .map(|s| s.id))
    }

    async fn list_changelists(&mut self, project_id: Uuid) -> StoreResult<Vec<Changelist>> {
        Ok(newest_first(
            self.working
                .changelists
                .iter()
                .filter(|c| c.project_id == project_id)
                .cloned(),
        ))
    }

    async fn find_changelist(&mut self, id: Uuid) -> StoreResult<Option<Changelist>> {
        Ok(self.working.changelists.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_changelist(&mut self, changelist: &Changelist) -> StoreResult<()> {
        self.working.changelists.push(changelist.clone());
        Ok(())
    }

    async fn update_changelist(&mut self, changelist: &Changelist) -> StoreResult<()> {
        replace(
            &mut self.working.changelists,
            |c| c.id == changelist.id,
            changelist,
        )
    }

    async fn list_changelist_items(
        &mut self,
        changelist_id: Uuid,
    ) -> StoreResult<Vec<ChangelistItem>> {
        Ok(self
            .working
            .changelist_items
            .iter()
            .filter(|i| i.changelist_id == changelist_id)
            .cloned()
            .collect())
    }

    async fn upsert_changelist_item(
        &mut self,
        item: &ChangelistItem,
    ) -> StoreResult<ChangelistItem> {
        let items = &mut self.working.changelist_items;
        let stored = match items.iter().position(|i| {
            i.changelist_id == item.changelist_id && i.asset_version_id == item.asset_version_id
        }) {
            // Re-adding keeps the row id and moves it to the end of the order
            Some(index) => {
                let mut existing = items.remove(index);
                existing.action = item.action;
                existing.target_branch_id = item.target_branch_id;
                existing.created_at = Utc::now();
                existing
            }
            None => item.clone(),
        };
        items.push(stored.clone());
        Ok(stored)
    }

    async fn delete_changelist_item(
        &mut self,
        changelist_id: Uuid,
        item_id: Uuid,
    ) -> StoreResult<bool> {
        Ok(remove(&mut self.working.changelist_items, |i| {
            i.id == item_id && i.changelist_id == changelist_id
        }))
    }

    // Branch merges, conflicts, jobs

    async fn list_branch_merges(&mut self, project_id: Uuid) -> StoreResult<Vec<BranchMerge>> {
        Ok(newest_first(
            self.working
                .branch_merges
                .iter()
                .filter(|m| m.project_id == project_id)
                .cloned(),
        ))
    }

    async fn find_branch_merge(&mut self, id: Uuid) -> StoreResult<Option<BranchMerge>> {
        Ok(self.working.branch_merges.iter().find(|m| m.id == id).cloned())
    }

    async fn lock_branch_merge(&mut self, id: Uuid) -> StoreResult<Option<BranchMerge>> {
        // Units of work are already serialised
        self.find_branch_merge(id).await
    }

    async fn insert_branch_merge(&mut self, merge: &BranchMerge) -> StoreResult<()> {
        self.working.branch_merges.push(merge.clone());
        Ok(())
    }

    async fn update_branch_merge(&mut self, merge: &BranchMerge) -> StoreResult<()> {
        replace(&mut self.working.branch_merges, |m| m.id == merge.id, merge)
    }

    async fn list_merge_conflicts(&mut self, merge_id: Uuid) -> StoreResult<Vec<MergeConflict>> {
        Ok(newest_first(
            self.working
                .merge_conflicts
                .iter()
                .filter(|c| c.branch_merge_id == merge_id)
                .cloned(),
        ))
    }

    async fn find_merge_conflict(&mut self, id: Uuid) -> StoreResult<Option<MergeConflict>> {
        Ok(self
            .working
            .merge_conflicts
            .iter()
            .find(|c| c.id == id)
            .cloned())
    }

    async fn insert_merge_conflict(&mut self, conflict: &MergeConflict) -> StoreResult<()> {
        self.working.merge_conflicts.push(conflict.clone());
        Ok(())
    }

    async fn update_merge_conflict(&mut self, conflict: &MergeConflict) -> StoreResult<()> {
        replace(
            &mut self.working.merge_conflicts,
            |c| c.id == conflict.id,
            conflict,
        )
    }

    async fn count_unresolved_conflicts(&mut self, merge_id: Uuid) -> StoreResult<usize> {
        Ok(self
            .working
            .merge_conflicts
            .iter()
            .filter(|c| c.branch_merge_id == merge_id && c.resolved_at.is_none())
            .count())
    }

    async fn list_merge_jobs(&mut self, merge_id: Uuid) -> StoreResult<Vec<MergeJob>> {
        Ok(self
            .working
            .merge_jobs
            .iter()
            .filter(|j| j.branch_merge_id == merge_id)
            .cloned()
            .collect())
    }

    async fn find_merge_job(&mut self, id: Uuid) -> StoreResult<Option<MergeJob>> {
        Ok(self.working.merge_jobs.iter().find(|j| j.id == id).cloned())
    }

    async fn lock_merge_job(&mut self, id: Uuid) -> StoreResult<Option<MergeJob>> {
        self.find_merge_job(id).await
    }

    async fn insert_merge_job(&mut self, job: &MergeJob) -> StoreResult<()> {
        self.working.merge_jobs.push(job.clone());
        Ok(())
    }

    async fn update_merge_job(&mut self, job: &MergeJob) -> StoreResult<()> {
        self.check_job_fault()?;
        replace(&mut self.working.merge_jobs, |j| j.id == job.id, job)
    }

    async fn settle_merge_job(
        &mut self,
        job: &MergeJob,
        appended_logs: &str,
    ) -> StoreResult<bool> {
        self.check_job_fault()?;
        let Some(stored) = self
            .working
            .merge_jobs
            .iter_mut()
            .find(|j| j.id == job.id && j.status == MergeJobStatus::Running)
        else {
            return Ok(false);
        };

        stored.status = job.status;
        stored.submit_gate_passed = job.submit_gate_passed;
        stored.completed_at = job.completed_at;
        stored.logs.push_str(appended_logs);
        stored.updated_at = job.updated_at;
        Ok(true)
    }

    async fn claim_merge_job(&mut self, id: Uuid) -> StoreResult<Option<MergeJob>> {
        let Some(job) = self
            .working
            .merge_jobs
            .iter_mut()
            .find(|j| j.id == id && j.status == MergeJobStatus::Queued)
        else {
            return Ok(None);
        };

        let now = Utc::now();
        job.status = MergeJobStatus::Running;
        job.started_at.get_or_insert(now);
        job.updated_at = now;
        Ok(Some(job.clone()))
    }

    // Permissions and locks

    async fn list_permissions(&mut self, project_id: Uuid) -> StoreResult<Vec<Permission>> {
        let mut permissions: Vec<Permission> = self
            .working
            .permissions
            .iter()
            .filter(|p| p.project_id == project_id)
            .cloned()
            .collect();
        permissions.sort_by_key(|p| p.user_id);
        Ok(permissions)
    }

    async fn find_permission(&mut self, id: Uuid) -> StoreResult<Option<Permission>> {
        Ok(self.working.permissions.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_permission(&mut self, permission: &Permission) -> StoreResult<()> {
        self.working.permissions.push(permission.clone());
        Ok(())
    }

    async fn update_permission(&mut self, permission: &Permission) -> StoreResult<()> {
        replace(
            &mut self.working.permissions,
            |p| p.id == permission.id,
            permission,
        )
    }

    async fn delete_permission(&mut self, id: Uuid) -> StoreResult<bool> {
        Ok(remove(&mut self.working.permissions, |p| p.id == id))
    }

    async fn list_locks(&mut self, project_id: Uuid) -> StoreResult<Vec<AssetLock>> {
        let tables = &self.working;
        let mut locks: Vec<AssetLock> = tables
            .asset_locks
            .iter()
            .filter(|l| tables.project_of_asset(l.asset_id) == Some(project_id))
            .cloned()
            .collect();
        locks.sort_by(|a, b| b.locked_at.cmp(&a.locked_at));
        Ok(locks)
    }

    async fn find_lock(&mut self, asset_id: Uuid) -> StoreResult<Option<AssetLock>> {
        Ok(self
            .working
            .asset_locks
            .iter()
            .find(|l| l.asset_id == asset_id)
            .cloned())
    }

    async fn upsert_lock(&mut self, lock: &AssetLock) -> StoreResult<AssetLock> {
        match self
            .working
            .asset_locks
            .iter_mut()
            .find(|l| l.asset_id == lock.asset_id)
        {
            Some(row) => {
                row.locked_by = lock.locked_by;
                row.workspace_id = lock.workspace_id;
                row.expires_at = lock.expires_at;
                row.notes = lock.notes.clone();
                row.locked_at = Utc::now();
                Ok(row.clone())
            }
            None => {
                self.working.asset_locks.push(lock.clone());
                Ok(lock.clone())
            }
        }
    }

    async fn delete_lock(&mut self, asset_id: Uuid) -> StoreResult<bool> {
        Ok(remove(&mut self.working.asset_locks, |l| l.asset_id == asset_id))
    }

    async fn list_pending_reviews(&mut self) -> StoreResult<Vec<AssetReview>> {
        let mut reviews: Vec<AssetReview> = self
            .working
            .asset_reviews
            .iter()
            .filter(|r| r.is_pending())
            .cloned()
            .collect();
        // `None` sorts below `Some`, so unreviewed rows land last
        reviews.sort_by(|a, b| {
            b.reviewed_at
                .cmp(&a.reviewed_at)
                .then(b.created_at.cmp(&a.created_at))
        });
        Ok(reviews)
    }

    async fn find_asset_review(&mut self, id: Uuid) -> StoreResult<Option<AssetReview>> {
        Ok(self.working.asset_reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn insert_asset_review(&mut self, review: &AssetReview) -> StoreResult<()> {
        self.working.asset_reviews.push(review.clone());
        Ok(())
    }

    async fn update_asset_review(&mut self, review: &AssetReview) -> StoreResult<()> {
        replace(
            &mut self.working.asset_reviews,
            |r| r.id == review.id,
            review,
        )
    }
}
