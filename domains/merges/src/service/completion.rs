//! Merge-job completion reaction
//!
//! Runs inside the unit of work that changed a job. Reads every job of the
//! merge and decides again from scratch, so redundant or interleaved calls
//! converge on the same state. Writers that feed the decision hold the
//! merge row lock from [`lock_merge`] before touching jobs or conflicts,
//! so two jobs settling at once cannot each miss the other's write.

use uuid::Uuid;

use depot_common::{Error, Result};
use depot_db::UnitOfWork;
use depot_domain::entities::BranchMerge;
use depot_domain::gate::should_auto_finalize;
use depot_domain::state::{MergeEvent, MergeStatus};

/// Row-lock the merge for the rest of the unit of work
pub async fn lock_merge(uow: &mut dyn UnitOfWork, merge_id: Uuid) -> Result<BranchMerge> {
    uow.lock_branch_merge(merge_id)
        .await?
        .ok_or_else(|| Error::NotFound("Branch merge not found".to_string()))
}

/// Finalize the merge when all of its jobs are done and passing
pub async fn reconcile_merge(uow: &mut dyn UnitOfWork, merge_id: Uuid) -> Result<BranchMerge> {
    let mut merge = lock_merge(uow, merge_id).await?;

    if matches!(merge.status, MergeStatus::Cancelled | MergeStatus::Merged) {
        return Ok(merge);
    }

    let jobs = uow.list_merge_jobs(merge_id).await?;
    let unresolved = uow.count_unresolved_conflicts(merge_id).await?;
    if !should_auto_finalize(&jobs, unresolved) {
        return Ok(merge);
    }

    merge.apply(MergeEvent::Complete)?;
    uow.update_branch_merge(&merge).await?;
    tracing::info!(
        merge_id = %merge_id,
        jobs = jobs.len(),
        "Branch merge finalized by job completion"
    );
    Ok(merge)
}

/// Force the merge to `conflicted` unless it was cancelled
pub async fn mark_conflicted(uow: &mut dyn UnitOfWork, merge_id: Uuid) -> Result<BranchMerge> {
    let mut merge = lock_merge(uow, merge_id).await?;

    if merge.status == MergeStatus::Cancelled {
        return Ok(merge);
    }

    merge.apply(MergeEvent::Conflict)?;
    uow.update_branch_merge(&merge).await?;
    tracing::info!(merge_id = %merge_id, "Branch merge marked conflicted");
    Ok(merge)
}
