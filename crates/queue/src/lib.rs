//! Asset Depot merge job dispatch
//!
//! Hands merge job ids to the Job Executor:
//! - Worker pool: bounded channel drained by independent tokio tasks
//! - Inline: runs the job before `enqueue` returns
//! - Recording: stores ids for test assertions

pub mod inline;
pub mod mock;
pub mod worker;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use uuid::Uuid;

use depot_domain::entities::JobOutcome;

pub use inline::InlineQueue;
pub use mock::RecordingQueue;
pub use worker::WorkerPoolQueue;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Queue configuration error: {0}")]
    Configuration(String),

    #[error("Queue is shut down")]
    Closed,

    #[error("Job {job_id} failed after {attempts} attempt(s): {reason}")]
    Exhausted {
        job_id: Uuid,
        attempts: u32,
        reason: String,
    },
}

/// Executes one merge job by id.
#[async_trait::async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, job_id: Uuid) -> depot_common::Result<JobOutcome>;
}

/// Fire-and-forget hand-off of merge job ids.
#[async_trait::async_trait]
pub trait JobQueue: Send + Sync {
    async fn enqueue(&self, job_id: Uuid) -> Result<(), QueueError>;

    async fn enqueue_many(&self, job_ids: &[Uuid]) -> Result<(), QueueError> {
        for job_id in job_ids {
            self.enqueue(*job_id).await?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueMode {
    Workers,
    Inline,
}

impl std::str::FromStr for QueueMode {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "workers" | "worker" => Ok(QueueMode::Workers),
            "inline" | "sync" => Ok(QueueMode::Inline),
            other => Err(QueueError::Configuration(format!(
                "Unknown queue mode: {}. Supported modes: workers, inline",
                other
            ))),
        }
    }
}

/// Dispatch configuration
#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub mode: QueueMode,
    pub worker_count: usize,
    pub capacity: usize,
    /// Attempts per job id, including the first
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            mode: QueueMode::Workers,
            worker_count: 4,
            capacity: 1024,
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

fn env_number<T: std::str::FromStr>(key: &str, default: T) -> Result<T, QueueError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| {
                QueueError::Configuration(format!("{} must be a number, got '{}'", key, raw))
            }),
        Err(_) => Ok(default),
    }
}

impl QueueConfig {
    /// Create queue config from environment variables.
    pub fn from_env() -> Result<Self, QueueError> {
        let defaults = Self::default();

        let automation_disabled = std::env::var("DISABLE_MERGE_AUTOMATION")
            .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false);

        let mode = if automation_disabled {
            QueueMode::Inline
        } else {
            match std::env::var("MERGE_QUEUE_MODE") {
                Ok(raw) => raw.parse()?,
                Err(_) => defaults.mode,
            }
        };

        let config = Self {
            mode,
            worker_count: env_number("MERGE_WORKER_COUNT", defaults.worker_count)?,
            capacity: env_number("MERGE_QUEUE_CAPACITY", defaults.capacity)?,
            max_attempts: env_number("MERGE_JOB_MAX_ATTEMPTS", defaults.max_attempts)?,
            retry_backoff: Duration::from_millis(env_number(
                "MERGE_JOB_RETRY_BACKOFF_MS",
                500u64,
            )?),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), QueueError> {
        if self.worker_count == 0 {
            return Err(QueueError::Configuration(
                "MERGE_WORKER_COUNT must be at least 1".to_string(),
            ));
        }
        if self.capacity == 0 {
            return Err(QueueError::Configuration(
                "MERGE_QUEUE_CAPACITY must be at least 1".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(QueueError::Configuration(
                "MERGE_JOB_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Run a job, retrying runner errors up to `max_attempts`.
///
/// A `skipped` outcome is a success: the job was already claimed elsewhere.
pub(crate) async fn run_with_retry(
    runner: &dyn JobRunner,
    job_id: Uuid,
    max_attempts: u32,
    backoff: Duration,
) -> Result<JobOutcome, QueueError> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        match runner.run(job_id).await {
            Ok(outcome) => {
                tracing::debug!(
                    job_id = %job_id,
                    attempt,
                    outcome = %outcome,
                    "Merge job run finished"
                );
                return Ok(outcome);
            }
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    job_id = %job_id,
                    attempt,
                    max_attempts,
                    error = %e,
                    "Merge job run failed, retrying"
                );
                tokio::time::sleep(backoff).await;
            }
            Err(e) => {
                tracing::error!(
                    job_id = %job_id,
                    attempts = attempt,
                    error = %e,
                    "Merge job run failed, giving up"
                );
                return Err(QueueError::Exhausted {
                    job_id,
                    attempts: attempt,
                    reason: e.to_string(),
                });
            }
        }
    }
}

/// Factory for creating JobQueue implementations.
pub struct JobQueueFactory;

impl JobQueueFactory {
    /// Create a JobQueue based on configuration. Worker mode spawns tasks
    /// and must be called inside a tokio runtime.
    pub fn create(
        config: QueueConfig,
        runner: Arc<dyn JobRunner>,
    ) -> Result<Arc<dyn JobQueue>, QueueError> {
        config.validate()?;
        match config.mode {
            QueueMode::Workers => {
                tracing::info!(
                    workers = config.worker_count,
                    capacity = config.capacity,
                    "Creating worker pool merge queue"
                );
                Ok(Arc::new(WorkerPoolQueue::start(config, runner)))
            }
            QueueMode::Inline => {
                tracing::info!("Creating inline merge queue");
                Ok(Arc::new(InlineQueue::new(
                    runner,
                    config.max_attempts,
                    config.retry_backoff,
                )))
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::CountingRunner;
    use super::*;
    use serial_test::serial;
    use std::sync::atomic::Ordering;

    fn clear_env() {
        for key in [
            "DISABLE_MERGE_AUTOMATION",
            "MERGE_QUEUE_MODE",
            "MERGE_WORKER_COUNT",
            "MERGE_QUEUE_CAPACITY",
            "MERGE_JOB_MAX_ATTEMPTS",
            "MERGE_JOB_RETRY_BACKOFF_MS",
        ] {
            std::env::remove_var(key);
        }
    }

    #[test]
    #[serial]
    fn test_config_defaults() {
        clear_env();
        let config = QueueConfig::from_env().unwrap();
        assert_eq!(config.mode, QueueMode::Workers);
        assert_eq!(config.worker_count, 4);
        assert_eq!(config.capacity, 1024);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.retry_backoff, Duration::from_millis(500));
    }

    #[test]
    #[serial]
    fn test_disable_automation_forces_inline() {
        clear_env();
        std::env::set_var("MERGE_QUEUE_MODE", "workers");
        std::env::set_var("DISABLE_MERGE_AUTOMATION", "1");
        let config = QueueConfig::from_env().unwrap();
        assert_eq!(config.mode, QueueMode::Inline);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_config_rejects_bad_values() {
        clear_env();
        std::env::set_var("MERGE_WORKER_COUNT", "0");
        assert!(QueueConfig::from_env().is_err());
        std::env::set_var("MERGE_WORKER_COUNT", "many");
        assert!(QueueConfig::from_env().is_err());
        clear_env();

        std::env::set_var("MERGE_QUEUE_MODE", "kafka");
        assert!(matches!(
            QueueConfig::from_env(),
            Err(QueueError::Configuration(_))
        ));
        clear_env();
    }

    #[tokio::test]
    async fn test_retry_until_success() {
        let runner = CountingRunner::failing(2);
        let outcome = run_with_retry(&runner, Uuid::new_v4(), 3, Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(outcome, JobOutcome::Completed);
        assert_eq!(runner.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_gives_up() {
        let runner = CountingRunner::failing(10);
        let result = run_with_retry(&runner, Uuid::new_v4(), 2, Duration::from_millis(1)).await;
        assert!(matches!(
            result,
            Err(QueueError::Exhausted { attempts: 2, .. })
        ));
        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_factory_inline_runs_immediately() {
        let runner = Arc::new(CountingRunner::default());
        let config = QueueConfig {
            mode: QueueMode::Inline,
            ..QueueConfig::default()
        };
        let queue = JobQueueFactory::create(config, runner.clone()).unwrap();

        let job_id = Uuid::new_v4();
        queue.enqueue(job_id).await.unwrap();
        assert_eq!(runner.seen(), vec![job_id]);
    }

    #[test]
    fn test_factory_rejects_invalid_config() {
        let runner = Arc::new(CountingRunner::default());
        let config = QueueConfig {
            max_attempts: 0,
            ..QueueConfig::default()
        };
        assert!(JobQueueFactory::create(config, runner).is_err());
    }
}
