//! Synchronous dispatch: the job runs before `enqueue` returns.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::{run_with_retry, JobQueue, JobRunner, QueueError};

pub struct InlineQueue {
    runner: Arc<dyn JobRunner>,
    max_attempts: u32,
    retry_backoff: Duration,
}

impl InlineQueue {
    pub fn new(runner: Arc<dyn JobRunner>, max_attempts: u32, retry_backoff: Duration) -> Self {
        Self {
            runner,
            max_attempts: max_attempts.max(1),
            retry_backoff,
        }
    }
}

#[async_trait::async_trait]
impl JobQueue for InlineQueue {
    async fn enqueue(&self, job_id: Uuid) -> Result<(), QueueError> {
        tracing::debug!(job_id = %job_id, "Running merge job inline");
        run_with_retry(
            self.runner.as_ref(),
            job_id,
            self.max_attempts,
            self.retry_backoff,
        )
        .await
        .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::CountingRunner;

    #[tokio::test]
    async fn test_enqueue_many_runs_in_order() {
        let runner = Arc::new(CountingRunner::default());
        let queue = InlineQueue::new(runner.clone(), 1, Duration::ZERO);
        let ids = vec![Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];

        queue.enqueue_many(&ids).await.unwrap();
        assert_eq!(runner.seen(), ids);
    }

    #[tokio::test]
    async fn test_exhausted_runner_surfaces_error() {
        let runner = Arc::new(CountingRunner::failing(5));
        let queue = InlineQueue::new(runner, 2, Duration::ZERO);
        assert!(matches!(
            queue.enqueue(Uuid::new_v4()).await,
            Err(QueueError::Exhausted { .. })
        ));
    }
}
