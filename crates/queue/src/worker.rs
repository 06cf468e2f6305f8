//! Worker pool dispatch
//!
//! Job ids travel over a bounded mpsc channel. Workers share the receiver
//! behind an async mutex, hold it only while waiting for the next id, and
//! run jobs concurrently with each other.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{run_with_retry, JobQueue, JobRunner, QueueConfig, QueueError};

pub struct WorkerPoolQueue {
    sender: Mutex<Option<mpsc::Sender<Uuid>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPoolQueue {
    /// Spawn the workers. Must be called inside a tokio runtime.
    pub fn start(config: QueueConfig, runner: Arc<dyn JobRunner>) -> Self {
        let (tx, rx) = mpsc::channel::<Uuid>(config.capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let workers = (0..config.worker_count.max(1))
            .map(|worker_id| {
                let rx = rx.clone();
                let runner = runner.clone();
                let config = config.clone();
                tokio::spawn(async move {
                    worker_loop(worker_id, rx, runner, config).await;
                })
            })
            .collect();

        Self {
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
        }
    }

    /// Stop accepting jobs, let workers drain the channel, and wait for them.
    pub async fn shutdown(&self) {
        self.sender.lock().await.take();
        let workers = std::mem::take(&mut *self.workers.lock().await);
        for handle in workers {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Merge worker task panicked");
            }
        }
        tracing::info!("Merge worker pool stopped");
    }
}

async fn worker_loop(
    worker_id: usize,
    rx: Arc<Mutex<mpsc::Receiver<Uuid>>>,
    runner: Arc<dyn JobRunner>,
    config: QueueConfig,
) {
    tracing::debug!(worker_id, "Merge worker started");
    loop {
        let next = rx.lock().await.recv().await;
        let Some(job_id) = next else {
            break;
        };

        // Errors are already logged; the dispatch layer has no caller to report to
        let _ = run_with_retry(
            runner.as_ref(),
            job_id,
            config.max_attempts,
            config.retry_backoff,
        )
        .await;
    }
    tracing::debug!(worker_id, "Merge worker exiting");
}

#[async_trait::async_trait]
impl JobQueue for WorkerPoolQueue {
    async fn enqueue(&self, job_id: Uuid) -> Result<(), QueueError> {
        let sender = self.sender.lock().await.clone().ok_or(QueueError::Closed)?;
        sender.send(job_id).await.map_err(|_| QueueError::Closed)?;
        tracing::debug!(job_id = %job_id, "Merge job handed to worker pool");
        Ok(())
    }
}
