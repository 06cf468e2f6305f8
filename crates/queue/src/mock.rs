//! Recording queue
//!
//! Stores enqueued job ids in memory for test assertions.
//! Thread-safe via `Arc<Mutex<>>`.

use std::sync::{Arc, Mutex};

use uuid::Uuid;

use crate::{JobQueue, QueueError};

/// Queue that records job ids without running them.
#[derive(Debug, Clone, Default)]
pub struct RecordingQueue {
    jobs: Arc<Mutex<Vec<Uuid>>>,
}

impl RecordingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded job ids in enqueue order.
    pub fn recorded(&self) -> Vec<Uuid> {
        self.jobs
            .lock()
            .map(|jobs| jobs.clone())
            .unwrap_or_default()
    }

    /// Remove and return the recorded job ids.
    pub fn drain(&self) -> Vec<Uuid> {
        self.jobs
            .lock()
            .map(|mut jobs| std::mem::take(&mut *jobs))
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl JobQueue for RecordingQueue {
    async fn enqueue(&self, job_id: Uuid) -> Result<(), QueueError> {
        tracing::debug!(job_id = %job_id, "Recording queue: recording job");
        self.jobs
            .lock()
            .map_err(|e| QueueError::Configuration(format!("jobs lock poisoned: {e}")))?
            .push(job_id);
        Ok(())
    }
}
