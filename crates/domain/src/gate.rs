//! Submit gate evaluation
//!
//! Pure read-and-decide over a merge's jobs and its unresolved conflict
//! count. Safe to evaluate redundantly and in any interleaving.

use serde::Serialize;
use serde_json::json;

use depot_common::{Error, Result};

use crate::entities::MergeJob;
use crate::state::MergeJobStatus;

/// Snapshot of everything the submit gate looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GateReport {
    pub has_gate_job: bool,
    pub gate_passed: bool,
    pub outstanding_jobs: usize,
    pub unresolved_conflicts: usize,
}

impl GateReport {
    pub fn evaluate(jobs: &[MergeJob], unresolved_conflicts: usize) -> Self {
        GateReport {
            has_gate_job: jobs.iter().any(MergeJob::is_gate),
            gate_passed: jobs.iter().any(|job| {
                job.is_gate() && job.status == MergeJobStatus::Completed && job.submit_gate_passed
            }),
            outstanding_jobs: jobs.iter().filter(|job| job.status.is_outstanding()).count(),
            unresolved_conflicts,
        }
    }

    /// Merges without a submit_gate job are not gated
    pub fn is_open(&self) -> bool {
        !self.has_gate_job
            || (self.gate_passed && self.outstanding_jobs == 0 && self.unresolved_conflicts == 0)
    }

    /// `FailedPrecondition` naming the first blocker, with all counts attached
    pub fn check(&self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }

        let reason = if !self.gate_passed {
            "Merge submit gate has not passed; ensure submit job completes successfully"
        } else if self.outstanding_jobs > 0 {
            "Merge jobs are still running; wait for orchestration to finish \
             before completing the merge"
        } else {
            "Unresolved merge conflicts remain; resolve or stage them before completing the merge"
        };

        Err(Error::FailedPrecondition {
            reason: format!(
                "{} ({} outstanding job(s), {} unresolved conflict(s))",
                reason, self.outstanding_jobs, self.unresolved_conflicts
            ),
            details: json!({
                "gate_passed": self.gate_passed,
                "outstanding_jobs": self.outstanding_jobs,
                "unresolved_conflicts": self.unresolved_conflicts,
            }),
        })
    }
}

/// Whether job completion alone finalizes the merge.
///
/// Every job completed, every gate job passed, and nothing unresolved.
pub fn should_auto_finalize(jobs: &[MergeJob], unresolved_conflicts: usize) -> bool {
    !jobs.is_empty()
        && unresolved_conflicts == 0
        && jobs.iter().all(|job| {
            job.status == MergeJobStatus::Completed && (!job.is_gate() || job.submit_gate_passed)
        })
}
