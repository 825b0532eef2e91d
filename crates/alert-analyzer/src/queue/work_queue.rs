//! In-memory FIFO of items awaiting analysis

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::types::QueueItem;

/// Unbounded FIFO with a suspending, cancellable dequeue
///
/// Not persisted; always rebuilt from the durable mirror at startup.
#[derive(Default)]
pub struct WorkQueue {
    items: Mutex<VecDeque<QueueItem>>,
    notify: Notify,
    /// Dequeued items not yet marked done
    in_flight: AtomicUsize,
    closed: AtomicBool,
}

impl WorkQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append to the tail. Never blocks.
    pub fn enqueue(&self, item: QueueItem) {
        self.items.lock().push_back(item);
        self.notify.notify_one();
    }

    /// Fill the queue from a replayed sequence, preserving its order
    pub fn initialize_from<I>(&self, items: I) -> usize
    where
        I: IntoIterator<Item = QueueItem>,
    {
        let count = {
            let mut queue = self.items.lock();
            let before = queue.len();
            queue.extend(items);
            queue.len() - before
        };
        if count > 0 {
            self.notify.notify_one();
        }
        count
    }

    /// Take the oldest item, suspending while the queue is empty
    ///
    /// Returns `Ok(None)` once `cancel` fires while waiting and
    /// `Err(Error::QueueClosed)` after [`WorkQueue::close`].
    pub async fn dequeue(&self, cancel: &CancellationToken) -> Result<Option<QueueItem>> {
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return Err(Error::QueueClosed);
            }

            // Register interest before checking so an enqueue in between isn't missed.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(item) = self.items.lock().pop_front() {
                self.in_flight.fetch_add(1, Ordering::SeqCst);
                return Ok(Some(item));
            }

            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = &mut notified => {}
            }
        }
    }

    /// Mark one dequeued item as finished, whatever its outcome
    pub fn task_done(&self) {
        let result = self
            .in_flight
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if result.is_err() {
            tracing::warn!("task_done called more times than items were dequeued");
        }
    }

    /// Stop handing out items; pending dequeues fail with `QueueClosed`
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Number of items waiting (excludes in-flight ones)
    pub fn size(&self) -> usize {
        self.items.lock().len()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}
