//! Worker behavior against the durable queue, with a scripted processor

mod common;

use alert_analyzer::processing::{ProcessOutcome, Processor, QueueWorker, ShutdownOutcome};
use alert_analyzer::{ItemKey, QueueItem, QueueService};
use async_trait::async_trait;
use common::{alert, wait_until};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct ScriptedProcessor {
    fail_rows: HashSet<i64>,
    panic_rows: HashSet<i64>,
    block_rows: HashSet<i64>,
    seen: Mutex<Vec<ItemKey>>,
}

impl ScriptedProcessor {
    fn failing(rows: &[i64]) -> Self {
        Self {
            fail_rows: rows.iter().copied().collect(),
            ..Default::default()
        }
    }

    fn seen(&self) -> Vec<ItemKey> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl Processor for ScriptedProcessor {
    async fn process(&self, item: &QueueItem) -> ProcessOutcome {
        self.seen.lock().push(item.key());

        if self.panic_rows.contains(&item.row_number) {
            panic!("processor blew up on row {}", item.row_number);
        }
        if self.block_rows.contains(&item.row_number) {
            std::future::pending::<()>().await;
        }
        if self.fail_rows.contains(&item.row_number) {
            ProcessOutcome::failure("scripted failure")
        } else {
            ProcessOutcome::Success { artifact: None }
        }
    }
}

fn service(dir: &TempDir) -> Arc<QueueService> {
    let service = Arc::new(QueueService::new(dir.path().join("pending_queue.json")));
    service.initialize();
    service
}

fn mirror_keys(service: &QueueService) -> Vec<ItemKey> {
    service.mirror().snapshot().iter().map(QueueItem::key).collect()
}

async fn drain(service: &QueueService, processor: &ScriptedProcessor, expected: usize) {
    wait_until("worker to drain the queue", || {
        let stats = service.stats();
        processor.seen().len() >= expected && stats.queued == 0 && stats.in_flight == 0
    })
    .await;
}

#[tokio::test]
async fn test_success_removes_and_failure_survives_restart() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let processor = Arc::new(ScriptedProcessor::failing(&[2]));

    let accepted = service.submit(vec![alert("S1", 1), alert("S1", 2)]).unwrap();
    assert_eq!(accepted, 2);
    assert_eq!(service.mirror().len(), 2);

    let handle = QueueWorker::new(Arc::clone(&service), processor.clone()).spawn();
    drain(&service, &processor, 2).await;

    assert_eq!(
        processor.seen(),
        vec![ItemKey::new("S1", 1), ItemKey::new("S1", 2)]
    );
    assert_eq!(mirror_keys(&service), vec![ItemKey::new("S1", 2)]);
    assert_eq!(
        handle.shutdown(Duration::from_secs(10)).await,
        ShutdownOutcome::Clean
    );

    // Next start replays only the failed row
    let restarted = QueueService::new(dir.path().join("pending_queue.json"));
    assert_eq!(restarted.initialize(), 1);
    let cancel = CancellationToken::new();
    let replayed = restarted.dequeue(&cancel).await.unwrap().unwrap();
    assert_eq!(replayed.key(), ItemKey::new("S1", 2));
    assert_eq!(replayed.queue_number, 2);
}

#[tokio::test]
async fn test_restart_preserves_submission_order() {
    let dir = TempDir::new().unwrap();
    let first = service(&dir);
    first.submit(vec![alert("A", 1)]).unwrap();
    first.submit(vec![alert("B", 1), alert("A", 2)]).unwrap();
    drop(first);

    let restarted = service(&dir);
    assert_eq!(restarted.stats().queued, 3);

    let cancel = CancellationToken::new();
    let mut order = Vec::new();
    for _ in 0..3 {
        order.push(restarted.dequeue(&cancel).await.unwrap().unwrap().key());
        restarted.task_done();
    }
    assert_eq!(
        order,
        vec![ItemKey::new("A", 1), ItemKey::new("B", 1), ItemKey::new("A", 2)]
    );
}

#[tokio::test]
async fn test_worker_processes_items_submitted_while_idle() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let processor = Arc::new(ScriptedProcessor::default());

    let handle = QueueWorker::new(Arc::clone(&service), processor.clone()).spawn();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(processor.seen().is_empty());

    service.submit(vec![alert("S9", 1)]).unwrap();
    wait_until("item to be confirmed", || service.mirror().is_empty()).await;

    assert_eq!(processor.seen(), vec![ItemKey::new("S9", 1)]);
    assert_eq!(service.stats().in_flight, 0);
    assert_eq!(
        handle.shutdown(Duration::from_secs(10)).await,
        ShutdownOutcome::Clean
    );
}

#[tokio::test]
async fn test_processor_panic_counts_as_failure() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let processor = Arc::new(ScriptedProcessor {
        panic_rows: [1].into_iter().collect(),
        ..Default::default()
    });

    service.submit(vec![alert("S1", 1), alert("S1", 2)]).unwrap();
    let handle = QueueWorker::new(Arc::clone(&service), processor.clone()).spawn();
    wait_until("row 2 to be confirmed", || {
        mirror_keys(&service) == vec![ItemKey::new("S1", 1)]
    })
    .await;

    assert_eq!(processor.seen().len(), 2);
    assert!(!handle.is_finished());
    assert_eq!(
        handle.shutdown(Duration::from_secs(10)).await,
        ShutdownOutcome::Clean
    );
}

#[tokio::test]
async fn test_cancel_mid_processing_keeps_item_on_disk() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let processor = Arc::new(ScriptedProcessor {
        block_rows: [1].into_iter().collect(),
        ..Default::default()
    });

    service.submit(vec![alert("S1", 1)]).unwrap();
    let handle = QueueWorker::new(Arc::clone(&service), processor.clone()).spawn();
    wait_until("processing to start", || processor.seen().len() == 1).await;

    assert_eq!(
        handle.shutdown(Duration::from_secs(10)).await,
        ShutdownOutcome::Clean
    );
    assert_eq!(service.stats().in_flight, 0);
    assert_eq!(mirror_keys(&service), vec![ItemKey::new("S1", 1)]);
}

#[tokio::test]
async fn test_closed_queue_cooldown_is_cancellable() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    service.queue().close();

    let handle = QueueWorker::new(Arc::clone(&service), Arc::new(ScriptedProcessor::default()))
        .with_error_cooldown(Duration::from_secs(3600))
        .spawn();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!handle.is_finished());

    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        handle.shutdown(Duration::from_secs(10)),
    )
    .await
    .expect("shutdown should not wait out the cooldown");
    assert_eq!(outcome, ShutdownOutcome::Clean);
}

#[tokio::test]
async fn test_idle_worker_stops_on_cancel() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let handle = QueueWorker::new(service, Arc::new(ScriptedProcessor::default())).spawn();

    let token = handle.cancellation_token();
    assert!(!token.is_cancelled());
    assert_eq!(
        handle.shutdown(Duration::from_secs(10)).await,
        ShutdownOutcome::Clean
    );
    assert!(token.is_cancelled());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_intake_leaves_no_confirmed_items_on_disk() {
    let dir = TempDir::new().unwrap();
    let service = service(&dir);
    let processor = Arc::new(ScriptedProcessor::default());
    let handle = QueueWorker::new(Arc::clone(&service), processor.clone()).spawn();

    let submitters: Vec<_> = (0..4)
        .map(|batch| {
            let service = Arc::clone(&service);
            tokio::spawn(async move {
                for row in 0..50 {
                    service
                        .submit(vec![alert(&format!("S{}", batch), row)])
                        .unwrap();
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    for submitter in submitters {
        submitter.await.unwrap();
    }

    wait_until("every item to be processed", || processor.seen().len() == 200).await;
    wait_until("mirror to drain", || service.mirror().is_empty()).await;
    assert_eq!(
        handle.shutdown(Duration::from_secs(10)).await,
        ShutdownOutcome::Clean
    );

    // Nothing processed successfully may come back on restart
    let restarted = QueueService::new(dir.path().join("pending_queue.json"));
    assert_eq!(restarted.initialize(), 0);
}
