//! Queue service: the work queue and its durable mirror under one owner

use parking_lot::Mutex;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use super::intake::stamp_batch;
use super::{DurableMirror, WorkQueue};
use crate::error::Result;
use crate::types::{ItemKey, PendingItemSummary, QueueItem, QueueStats, WebhookAlert};

/// Owns the in-memory queue and the on-disk mirror
///
/// Constructed once at startup and shared (behind an `Arc`) by the HTTP
/// intake and the worker. Only intake appends to the mirror and only the
/// worker removes from it.
pub struct QueueService {
    queue: WorkQueue,
    mirror: DurableMirror,
    /// Serializes intake so queue and mirror see batches in the same order
    intake_lock: Mutex<()>,
}

impl QueueService {
    /// Create a service backed by the mirror file at `mirror_path`
    pub fn new(mirror_path: impl Into<PathBuf>) -> Self {
        Self {
            queue: WorkQueue::new(),
            mirror: DurableMirror::new(mirror_path),
            intake_lock: Mutex::new(()),
        }
    }

    /// Load the mirror and replay it into the work queue
    pub fn initialize(&self) -> usize {
        let items = self.mirror.load();
        let count = self.queue.initialize_from(items);
        tracing::info!("Initialized in-memory queue with {} items from disk", count);
        count
    }

    /// Accept a batch of alerts
    ///
    /// Every alert is validated before anything is enqueued. Each item is then
    /// appended to the mirror and only afterwards made visible to the worker, so
    /// a fast confirmation can never run ahead of the mirror write.
    pub fn submit(&self, alerts: Vec<WebhookAlert>) -> Result<usize> {
        for alert in &alerts {
            alert.validate()?;
        }

        let _guard = self.intake_lock.lock();
        let items = stamp_batch(alerts, self.queue.size())?;
        let count = items.len();

        for item in items {
            let key = item.key();
            self.mirror.append(item.clone());
            self.queue.enqueue(item);
            tracing::info!(
                "Item {} added to queue (Queue size: {}, Disk mirror size: {})",
                key,
                self.queue.size(),
                self.mirror.len()
            );
        }

        Ok(count)
    }

    /// Wait for the next item; `Ok(None)` when `cancel` fires first
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Result<Option<QueueItem>> {
        self.queue.dequeue(cancel).await
    }

    /// Bookkeeping after a dequeued item has been handled
    pub fn task_done(&self) {
        self.queue.task_done();
    }

    /// Drop a successfully processed item from the mirror
    pub fn confirm_processed(&self, key: &ItemKey) -> bool {
        self.mirror.remove(key)
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            queued: self.queue.size(),
            in_flight: self.queue.in_flight(),
            pending_on_disk: self.mirror.len(),
        }
    }

    /// Items still awaiting confirmation, in mirror order
    pub fn pending_items(&self) -> Vec<PendingItemSummary> {
        self.mirror
            .snapshot()
            .iter()
            .map(PendingItemSummary::from)
            .collect()
    }

    pub fn queue(&self) -> &WorkQueue {
        &self.queue
    }

    pub fn mirror(&self) -> &DurableMirror {
        &self.mirror
    }
}
