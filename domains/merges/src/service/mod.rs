//! Branch-merge orchestration
//!
//! Every operation runs in one unit of work bound to the caller. Job ids
//! left `queued` are handed to the dispatcher only after that unit of work
//! has committed.

pub mod completion;
pub mod conflicts;
pub mod jobs;
pub mod merges;

use std::sync::Arc;

use uuid::Uuid;

use depot_db::EntityStore;
use depot_queue::JobQueue;

pub use conflicts::{CreateConflictRequest, UpdateConflictRequest};
pub use jobs::{CreateJobRequest, UpdateJobRequest};
pub use merges::{CreateMergeRequest, UpdateMergeRequest};

#[derive(Clone)]
pub struct MergeService {
    store: Arc<dyn EntityStore>,
    queue: Arc<dyn JobQueue>,
}

impl MergeService {
    pub fn new(store: Arc<dyn EntityStore>, queue: Arc<dyn JobQueue>) -> Self {
        Self { store, queue }
    }

    /// Fire-and-forget hand-off; failures are logged, never returned
    async fn dispatch(&self, job_ids: &[Uuid]) {
        if job_ids.is_empty() {
            return;
        }
        if let Err(e) = self.queue.enqueue_many(job_ids).await {
            tracing::error!(error = %e, jobs = job_ids.len(), "Failed to enqueue merge jobs");
        }
    }
}
