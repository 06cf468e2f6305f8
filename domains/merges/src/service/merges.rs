//! Branch merge create/read/update and the submit gate

use serde::Deserialize;
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

use depot_auth::AuthContext;
use depot_common::{Error, Result};
use depot_domain::entities::{BranchMerge, MergeJob};
use depot_domain::gate::GateReport;
use depot_domain::state::{MergeEvent, MergeJobStatus, MergeJobType, MergeStatus};

use super::completion::lock_merge;
use super::MergeService;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMergeRequest {
    pub source_branch_id: Uuid,
    pub target_branch_id: Uuid,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
    #[serde(default)]
    pub auto_integrate: bool,
    #[serde(default)]
    pub stage_conflicts: bool,
    #[serde(default)]
    pub requires_submit_gate: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateMergeRequest {
    pub status: Option<MergeStatus>,
    pub conflict_summary: Option<serde_json::Value>,
    #[validate(length(max = 4000))]
    pub notes: Option<String>,
    pub completed: Option<bool>,
}

impl UpdateMergeRequest {
    fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.conflict_summary.is_none()
            && self.notes.is_none()
            && self.completed.is_none()
    }

    /// Completing the merge by status or by flag goes through the gate
    fn requests_completion(&self) -> bool {
        self.status == Some(MergeStatus::Merged) || self.completed == Some(true)
    }
}

/// Jobs seeded at creation, in creation order
fn seed_jobs(merge_id: Uuid, request: &CreateMergeRequest) -> Result<Vec<MergeJob>> {
    let mut jobs = Vec::new();
    if request.auto_integrate {
        jobs.push(MergeJob::new(
            merge_id,
            MergeJobType::AutoIntegrate,
            MergeJobStatus::Queued,
        )?);
    }
    if request.stage_conflicts {
        jobs.push(MergeJob::new(
            merge_id,
            MergeJobType::ConflictStaging,
            MergeJobStatus::Staged,
        )?);
    }
    if request.requires_submit_gate {
        jobs.push(MergeJob::new(
            merge_id,
            MergeJobType::SubmitGate,
            MergeJobStatus::Queued,
        )?);
    }
    Ok(jobs)
}

impl MergeService {
    pub async fn list_merges(
        &self,
        actor: &AuthContext,
        project_id: Uuid,
    ) -> Result<Vec<BranchMerge>> {
        let mut uow = self.store.begin(actor).await?;
        let merges = uow.list_branch_merges(project_id).await?;
        uow.commit().await?;
        Ok(merges)
    }

    pub async fn get_merge(&self, actor: &AuthContext, merge_id: Uuid) -> Result<BranchMerge> {
        let mut uow = self.store.begin(actor).await?;
        let merge = uow
            .find_branch_merge(merge_id)
            .await?
            .ok_or_else(|| Error::NotFound("Branch merge not found".to_string()))?;
        uow.commit().await?;
        Ok(merge)
    }

    /// Create a merge and its seeded jobs atomically, then dispatch the
    /// queued ones.
    pub async fn create_merge(
        &self,
        actor: &AuthContext,
        project_id: Uuid,
        request: CreateMergeRequest,
    ) -> Result<BranchMerge> {
        let merge = BranchMerge::new(
            project_id,
            request.source_branch_id,
            request.target_branch_id,
            actor.user_id,
            request.notes.clone(),
        )?;

        let mut uow = self.store.begin(actor).await?;

        uow.find_project(project_id)
            .await?
            .ok_or_else(|| Error::NotFound("Project not found".to_string()))?;
        let source = uow
            .find_branch(request.source_branch_id)
            .await?
            .ok_or_else(|| Error::NotFound("Source branch not found".to_string()))?;
        let target = uow
            .find_branch(request.target_branch_id)
            .await?
            .ok_or_else(|| Error::NotFound("Target branch not found".to_string()))?;
        if !source.belongs_to(project_id) || !target.belongs_to(project_id) {
            return Err(Error::InvalidArgument(
                "Branches do not belong to project".to_string(),
            ));
        }

        let jobs = seed_jobs(merge.id, &request)?;

        uow.insert_branch_merge(&merge).await?;
        for job in &jobs {
            uow.insert_merge_job(job).await?;
        }
        uow.commit().await?;

        let queued: Vec<Uuid> = jobs
            .iter()
            .filter(|job| job.status == MergeJobStatus::Queued)
            .map(|job| job.id)
            .collect();

        tracing::info!(
            merge_id = %merge.id,
            project_id = %project_id,
            jobs = jobs.len(),
            queued = queued.len(),
            "Branch merge created"
        );

        self.dispatch(&queued).await;
        Ok(merge)
    }

    /// Update a merge. Completion (status=merged or completed=true) is
    /// rejected with `FailedPrecondition` while the submit gate is closed.
    pub async fn update_merge(
        &self,
        actor: &AuthContext,
        merge_id: Uuid,
        request: UpdateMergeRequest,
    ) -> Result<BranchMerge> {
        if request.is_empty() {
            return Err(Error::InvalidArgument("No fields provided".to_string()));
        }

        let mut uow = self.store.begin(actor).await?;
        // Held until commit, so the gate verdict and the status write agree
        let mut merge = lock_merge(uow.as_mut(), merge_id).await?;

        if request.requests_completion() {
            let jobs = uow.list_merge_jobs(merge_id).await?;
            let unresolved = uow.count_unresolved_conflicts(merge_id).await?;
            let report = GateReport::evaluate(&jobs, unresolved);
            if let Err(e) = report.check() {
                tracing::info!(
                    merge_id = %merge_id,
                    outstanding_jobs = report.outstanding_jobs,
                    unresolved_conflicts = report.unresolved_conflicts,
                    gate_passed = report.gate_passed,
                    "Merge completion blocked by submit gate"
                );
                return Err(e);
            }
        }

        if let Some(status) = request.status {
            merge.apply(MergeEvent::for_status(status))?;
        }
        if let Some(summary) = request.conflict_summary {
            merge.conflict_summary = Some(Json(summary));
        }
        if let Some(notes) = request.notes {
            merge.notes = Some(notes);
        }
        match request.completed {
            Some(true) => merge.mark_completed(),
            Some(false) => merge.clear_completed(),
            None => {}
        }
        merge.updated_at = chrono::Utc::now();

        uow.update_branch_merge(&merge).await?;
        uow.commit().await?;

        tracing::info!(merge_id = %merge_id, status = %merge.status, "Branch merge updated");
        Ok(merge)
    }
}
