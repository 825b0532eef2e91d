//! Background worker draining the queue one item at a time

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::queue::QueueService;
use crate::types::QueueItem;

use super::processor::{ProcessOutcome, Processor};

/// Pause after an unexpected loop error before trying again
pub const DEFAULT_ERROR_COOLDOWN: Duration = Duration::from_secs(5);

/// How long shutdown waits for the worker to observe cancellation
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

enum Flow {
    Continue,
    Stop,
}

/// Single consumer of the work queue
///
/// Each dequeued item goes through the processor exactly once per delivery.
/// Success removes it from the durable mirror; failure leaves it there to be
/// replayed on the next start. There is no in-process retry.
pub struct QueueWorker {
    service: Arc<QueueService>,
    processor: Arc<dyn Processor>,
    error_cooldown: Duration,
}

impl QueueWorker {
    pub fn new(service: Arc<QueueService>, processor: Arc<dyn Processor>) -> Self {
        Self {
            service,
            processor,
            error_cooldown: DEFAULT_ERROR_COOLDOWN,
        }
    }

    pub fn with_error_cooldown(mut self, cooldown: Duration) -> Self {
        self.error_cooldown = cooldown;
        self
    }

    /// Run the loop on the current runtime and return a handle to stop it
    pub fn spawn(self) -> WorkerHandle {
        let cancel = CancellationToken::new();
        let join = tokio::spawn(self.run(cancel.clone()));
        WorkerHandle { cancel, join }
    }

    /// Process items until `cancel` fires
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!("Worker started, waiting for items...");

        while !cancel.is_cancelled() {
            let item = match self.service.dequeue(&cancel).await {
                Ok(Some(item)) => item,
                Ok(None) => {
                    tracing::info!("Worker cancellation requested");
                    break;
                }
                Err(e) => {
                    tracing::error!(
                        "Worker loop error: {}. Retrying in {:?}",
                        e,
                        self.error_cooldown
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => {
                            tracing::info!("Worker cancellation requested");
                            break;
                        }
                        _ = tokio::time::sleep(self.error_cooldown) => continue,
                    }
                }
            };

            if let Flow::Stop = self.handle_item(item, &cancel).await {
                break;
            }
        }

        tracing::info!("Worker stopped");
    }

    async fn handle_item(&self, item: QueueItem, cancel: &CancellationToken) -> Flow {
        let key = item.key();
        tracing::info!("Worker: Dequeued item {}. Starting processing", key);

        // A separate task so a panicking processor only fails this item.
        let processor = Arc::clone(&self.processor);
        let mut task = tokio::spawn(async move { processor.process(&item).await });

        let outcome = tokio::select! {
            joined = &mut task => Some(joined.unwrap_or_else(|e| {
                tracing::error!("Worker: Unhandled error while processing {}: {}", key, e);
                ProcessOutcome::failure(format!("processing task failed: {}", e))
            })),
            _ = cancel.cancelled() => {
                task.abort();
                None
            }
        };

        self.service.task_done();
        tracing::debug!("Worker: Task marked done for item {}", key);

        match outcome {
            Some(ProcessOutcome::Success { artifact }) => {
                tracing::info!(
                    "Worker: Processing successful for {} (artifact: {:?}). Removing from disk mirror",
                    key,
                    artifact
                );
                let service = Arc::clone(&self.service);
                let removed = key.clone();
                if let Err(e) =
                    tokio::task::spawn_blocking(move || service.confirm_processed(&removed)).await
                {
                    tracing::error!("Worker: Could not remove {} from disk mirror: {}", key, e);
                }
                Flow::Continue
            }
            Some(ProcessOutcome::Failure { reason }) => {
                tracing::warn!(
                    "Worker: Processing failed for {}: {}. Item remains in disk queue",
                    key,
                    reason
                );
                Flow::Continue
            }
            None => {
                tracing::warn!(
                    "Worker: Cancelled while processing {}. Item remains in disk queue",
                    key
                );
                tracing::info!("Worker cancellation requested");
                Flow::Stop
            }
        }
    }
}

/// How a worker shutdown ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The loop observed cancellation and returned
    Clean,
    /// The loop did not return in time and was aborted
    TimedOut,
    /// The worker task panicked
    Failed,
}

/// Handle to a spawned [`QueueWorker`]
pub struct WorkerHandle {
    cancel: CancellationToken,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Request cancellation and wait up to `timeout` for the loop to exit
    pub async fn shutdown(mut self, timeout: Duration) -> ShutdownOutcome {
        tracing::info!("Attempting to cancel worker task...");
        self.cancel.cancel();

        match tokio::time::timeout(timeout, &mut self.join).await {
            Ok(Ok(())) => {
                tracing::info!("Worker task successfully cancelled");
                ShutdownOutcome::Clean
            }
            Ok(Err(e)) => {
                tracing::error!("Error during worker task shutdown: {}", e);
                ShutdownOutcome::Failed
            }
            Err(_) => {
                tracing::warn!("Worker task did not finish cancelling within {:?}", timeout);
                self.join.abort();
                ShutdownOutcome::TimedOut
            }
        }
    }
}
