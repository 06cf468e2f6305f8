//! Operator job CRUD
//!
//! Status changes follow the merge job state machine. `running` is never
//! operator-settable, and a stage/fail to `queued` is a controlled re-run
//! dispatched after commit.

use serde::Deserialize;
use sqlx::types::Json;
use uuid::Uuid;
use validator::Validate;

use depot_auth::AuthContext;
use depot_common::{Error, Result};
use depot_domain::entities::MergeJob;
use depot_domain::state::{MergeJobEvent, MergeJobStatus, MergeJobType};

use super::completion::{lock_merge, reconcile_merge};
use super::MergeService;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateJobRequest {
    pub job_type: MergeJobType,
    pub status: Option<MergeJobStatus>,
    pub conflict_snapshot: Option<serde_json::Value>,
    pub submit_gate_passed: Option<bool>,
    pub logs: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateJobRequest {
    pub status: Option<MergeJobStatus>,
    pub submit_gate_passed: Option<bool>,
    pub conflict_snapshot: Option<serde_json::Value>,
    pub logs: Option<String>,
}

impl UpdateJobRequest {
    fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.submit_gate_passed.is_none()
            && self.conflict_snapshot.is_none()
            && self.logs.is_none()
    }
}

fn apply_gate_flag(job: &mut MergeJob, passed: bool) -> Result<()> {
    // `false` on a non-gate job matches its stored value
    if !job.is_gate() && !passed {
        return Ok(());
    }
    job.set_gate_passed(passed)
}

impl MergeService {
    /// Jobs of a merge in creation order
    pub async fn list_jobs(&self, actor: &AuthContext, merge_id: Uuid) -> Result<Vec<MergeJob>> {
        let mut uow = self.store.begin(actor).await?;
        uow.find_branch_merge(merge_id)
            .await?
            .ok_or_else(|| Error::NotFound("Branch merge not found".to_string()))?;
        let jobs = uow.list_merge_jobs(merge_id).await?;
        uow.commit().await?;
        Ok(jobs)
    }

    pub async fn get_job(&self, actor: &AuthContext, job_id: Uuid) -> Result<MergeJob> {
        let mut uow = self.store.begin(actor).await?;
        let job = uow
            .find_merge_job(job_id)
            .await?
            .ok_or_else(|| Error::NotFound("Merge job not found".to_string()))?;
        uow.commit().await?;
        Ok(job)
    }

    pub async fn create_job(
        &self,
        actor: &AuthContext,
        merge_id: Uuid,
        request: CreateJobRequest,
    ) -> Result<MergeJob> {
        let mut job = MergeJob::new(
            merge_id,
            request.job_type,
            request.status.unwrap_or_default(),
        )?;
        if let Some(passed) = request.submit_gate_passed {
            apply_gate_flag(&mut job, passed)?;
        }
        job.conflict_snapshot = request.conflict_snapshot.map(Json);
        if let Some(logs) = request.logs {
            job.append_log(&logs);
        }

        let mut uow = self.store.begin(actor).await?;
        lock_merge(uow.as_mut(), merge_id).await?;
        uow.insert_merge_job(&job).await?;
        uow.commit().await?;

        tracing::info!(
            job_id = %job.id,
            merge_id = %merge_id,
            job_type = %job.job_type,
            status = %job.status,
            "Merge job created"
        );

        if job.status == MergeJobStatus::Queued {
            self.dispatch(&[job.id]).await;
        }
        Ok(job)
    }

    /// Operator update of a job. Any status change runs the completion
    /// reaction in the same unit of work.
    pub async fn update_job(
        &self,
        actor: &AuthContext,
        job_id: Uuid,
        request: UpdateJobRequest,
    ) -> Result<MergeJob> {
        if request.is_empty() {
            return Err(Error::InvalidArgument("No fields provided".to_string()));
        }

        let mut uow = self.store.begin(actor).await?;
        let merge_id = uow
            .find_merge_job(job_id)
            .await?
            .ok_or_else(|| Error::NotFound("Merge job not found".to_string()))?
            .branch_merge_id;
        // Merge first, then the job row: the same order the executor takes
        lock_merge(uow.as_mut(), merge_id).await?;
        let mut job = uow
            .lock_merge_job(job_id)
            .await?
            .ok_or_else(|| Error::NotFound("Merge job not found".to_string()))?;

        let previous = job.status;
        if let Some(status) = request.status.filter(|status| *status != previous) {
            let event = MergeJobEvent::for_status(status).ok_or_else(|| {
                Error::InvalidArgument(
                    "Status running is reserved for the job executor".to_string(),
                )
            })?;
            job.apply(event)?;
        }
        if let Some(passed) = request.submit_gate_passed {
            apply_gate_flag(&mut job, passed)?;
        }
        if let Some(snapshot) = request.conflict_snapshot {
            job.conflict_snapshot = Some(Json(snapshot));
        }
        if let Some(logs) = request.logs {
            job.append_log(&logs);
        }
        job.updated_at = chrono::Utc::now();

        uow.update_merge_job(&job).await?;
        let status_changed = job.status != previous;
        if status_changed {
            reconcile_merge(uow.as_mut(), job.branch_merge_id).await?;
        }
        uow.commit().await?;

        if status_changed {
            tracing::info!(
                job_id = %job_id,
                from = %previous,
                to = %job.status,
                "Merge job status changed by operator"
            );
        }
        if status_changed && job.status == MergeJobStatus::Queued {
            self.dispatch(&[job.id]).await;
        }
        Ok(job)
    }
}
