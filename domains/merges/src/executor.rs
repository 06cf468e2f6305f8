//! Merge Job Executor
//!
//! `run` has two commit points. The `queued -> running` claim commits on
//! its own, then the job-type work and the completion reaction run in a
//! second unit of work. A failure in the second leaves the job `running`.

use std::sync::Arc;

use uuid::Uuid;

use depot_auth::AuthContext;
use depot_common::{Error, Result};
use depot_db::EntityStore;
use depot_domain::entities::{JobOutcome, MergeJob};
use depot_domain::state::{MergeJobStatus, MergeJobType};
use depot_queue::JobRunner;

use crate::service::completion::{lock_merge, mark_conflicted, reconcile_merge};

#[derive(Clone)]
pub struct MergeJobExecutor {
    store: Arc<dyn EntityStore>,
    actor: AuthContext,
}

impl MergeJobExecutor {
    pub fn new(store: Arc<dyn EntityStore>, automation_user_id: Option<Uuid>) -> Self {
        Self {
            store,
            actor: AuthContext::automation(automation_user_id),
        }
    }

    pub async fn run(&self, job_id: Uuid) -> Result<JobOutcome> {
        let Some(job) = self.claim(job_id).await? else {
            return Ok(JobOutcome::Skipped);
        };

        tracing::info!(
            job_id = %job_id,
            merge_id = %job.branch_merge_id,
            job_type = %job.job_type,
            "Merge job started"
        );

        match self.execute(job).await {
            Ok(outcome) => {
                tracing::info!(job_id = %job_id, outcome = %outcome, "Merge job finished");
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!(
                    job_id = %job_id,
                    error = %e,
                    "Merge job failed; job left running"
                );
                Err(e)
            }
        }
    }

    /// First commit point: the conditional claim
    async fn claim(&self, job_id: Uuid) -> Result<Option<MergeJob>> {
        let mut uow = self.store.begin(&self.actor).await?;
        match uow.claim_merge_job(job_id).await? {
            Some(job) => {
                uow.commit().await?;
                Ok(Some(job))
            }
            None => {
                let current = uow.find_merge_job(job_id).await?;
                match current {
                    Some(job) => {
                        tracing::warn!(
                            job_id = %job_id,
                            status = %job.status,
                            "Merge job is not queued; skipping duplicate dispatch"
                        );
                        Ok(None)
                    }
                    None => Err(Error::NotFound("Merge job not found".to_string())),
                }
            }
        }
    }

    /// Second commit point: job-type work plus the completion reaction.
    ///
    /// The job is read again under the merge and job row locks. If an
    /// operator settled it after the claim, the run is skipped.
    async fn execute(&self, claimed: MergeJob) -> Result<JobOutcome> {
        let mut uow = self.store.begin(&self.actor).await?;
        let merge_id = claimed.branch_merge_id;
        lock_merge(uow.as_mut(), merge_id).await?;

        let current = uow.lock_merge_job(claimed.id).await?;
        let Some(mut job) = current.filter(|job| job.status == MergeJobStatus::Running) else {
            tracing::warn!(job_id = %claimed.id, "Merge job settled elsewhere; skipping");
            return Ok(JobOutcome::Skipped);
        };
        let logged = job.logs.len();

        let outcome = match job.job_type {
            MergeJobType::AutoIntegrate => {
                job.append_log("Executing automated integration pipeline");
                let unresolved = uow.count_unresolved_conflicts(merge_id).await?;
                if unresolved > 0 {
                    job.append_log(&format!(
                        "Detected {} unresolved conflicts during auto integrate",
                        unresolved
                    ));
                    job.fail()?;
                    JobOutcome::Failed
                } else {
                    job.append_log("Integration completed without conflicts");
                    job.succeed(false)?;
                    JobOutcome::Completed
                }
            }
            MergeJobType::SubmitGate => {
                job.append_log("Running submit gate validation");
                job.succeed(true)?;
                JobOutcome::Completed
            }
            other => {
                job.append_log(&format!(
                    "No-op handler for job type {}; marking completed",
                    other
                ));
                job.succeed(false)?;
                JobOutcome::Completed
            }
        };

        if !uow.settle_merge_job(&job, &job.logs[logged..]).await? {
            tracing::warn!(job_id = %job.id, "Merge job no longer running; skipping");
            return Ok(JobOutcome::Skipped);
        }
        reconcile_merge(uow.as_mut(), merge_id).await?;
        if outcome == JobOutcome::Failed {
            mark_conflicted(uow.as_mut(), merge_id).await?;
        }

        uow.commit().await?;
        Ok(outcome)
    }
}

#[async_trait::async_trait]
impl JobRunner for MergeJobExecutor {
    async fn run(&self, job_id: Uuid) -> Result<JobOutcome> {
        MergeJobExecutor::run(self, job_id).await
    }
}
