//! Rate-limited, batched delivery of watch events to subscribers, with
//! retry on transient processing failure (spec.md §4.6).
//!
//! `process(batch)` is caller-supplied: the coalescer's dispatch loop
//! feeds raw watch events into this queue, and the fleet client wires
//! its own closure (typically "invalidate the affected cache entry and
//! notify the projection layer") as `process`.

use std::sync::Arc;
use std::time::Duration;

use fleet_model::{ResourceObject, WatchEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub type Batch = Vec<WatchEvent<ResourceObject>>;

/// Outcome of a `process` call, distinguishing retryable failures from
/// permanent ones at the batch granularity.
pub type ProcessResult = Result<(), String>;

#[async_trait::async_trait]
pub trait BatchProcessor: Send + Sync {
    async fn process(&self, batch: &Batch) -> ProcessResult;
}

#[async_trait::async_trait]
impl<F, Fut> BatchProcessor for F
where
    F: Fn(Batch) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = ProcessResult> + Send,
{
    async fn process(&self, batch: &Batch) -> ProcessResult {
        (self)(batch.clone()).await
    }
}

pub struct EventProcessor {
    batch_size: usize,
    batch_timeout: Duration,
    input: mpsc::Sender<WatchEvent<ResourceObject>>,
    input_rx: parking_lot::Mutex<Option<mpsc::Receiver<WatchEvent<ResourceObject>>>>,
    workers: parking_lot::Mutex<Vec<tokio::task::JoinHandle<()>>>,
}

impl EventProcessor {
    pub fn new(batch_size: usize, batch_timeout: Duration, queue_capacity: usize) -> Self {
        let (input, input_rx) = mpsc::channel(queue_capacity);
        Self {
            batch_size,
            batch_timeout,
            input,
            input_rx: parking_lot::Mutex::new(Some(input_rx)),
            workers: parking_lot::Mutex::new(Vec::new()),
        }
    }

    /// Enqueues a single event. Applies backpressure (awaits) rather
    /// than dropping, since the coalescer already applies the drop
    /// policy at the listener boundary (spec.md §4.5); this queue's
    /// contract is at-least-once, not best-effort.
    pub async fn enqueue(&self, event: WatchEvent<ResourceObject>) -> Result<(), ()> {
        self.input.send(event).await.map_err(|_| ())
    }

    /// Spawns `workers` batching tasks sharing the single input queue;
    /// each batches up to `BatchSize` or `BatchTimeout`, whichever
    /// comes first, then calls `processor.process(batch)`. On error
    /// the batch is re-enqueued (each event individually, to rejoin the
    /// same rate-limited queue) rather than dropped.
    pub fn start(
        &self,
        workers: usize,
        processor: Arc<dyn BatchProcessor>,
        cancel: CancellationToken,
    ) {
        let rx = self
            .input_rx
            .lock()
            .take()
            .expect("start() must be called at most once");
        let batch_size = self.batch_size;
        let batch_timeout = self.batch_timeout;
        let requeue = self.input.clone();

        // A single receiver is shared across `workers` tasks via an
        // Arc<Mutex<..>> rather than `workers` separate channels, so
        // batches are assembled from whichever worker happens to be
        // free, the same sharing pattern `ferrex-server`'s job queue
        // uses for its worker pool.
        let shared_rx = Arc::new(tokio::sync::Mutex::new(rx));
        let mut handles = Vec::with_capacity(workers);
        for worker_id in 0..workers.max(1) {
            let shared_rx = Arc::clone(&shared_rx);
            let processor = Arc::clone(&processor);
            let requeue = requeue.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move {
                run_worker(
                    worker_id,
                    shared_rx,
                    batch_size,
                    batch_timeout,
                    processor,
                    requeue,
                    cancel,
                )
                .await;
            }));
        }
        *self.workers.lock() = handles;
    }

    /// Signals `cancel` and awaits every worker's cooperative exit.
    /// A worker mid-batch finishes delivering that batch to `process`
    /// before observing cancellation at its next receive.
    pub async fn stop(&self, cancel: CancellationToken) {
        cancel.cancel();
        let handles = std::mem::take(&mut *self.workers.lock());
        for handle in handles {
            let _ = handle.await;
        }
        info!("event processor stopped");
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_worker(
    worker_id: usize,
    shared_rx: Arc<tokio::sync::Mutex<mpsc::Receiver<WatchEvent<ResourceObject>>>>,
    batch_size: usize,
    batch_timeout: Duration,
    processor: Arc<dyn BatchProcessor>,
    requeue: mpsc::Sender<WatchEvent<ResourceObject>>,
    cancel: CancellationToken,
) {
    info!(worker_id, "event processor worker started");
    loop {
        let batch = collect_batch(&shared_rx, batch_size, batch_timeout, &cancel).await;
        match batch {
            Some(batch) if !batch.is_empty() => {
                if let Err(e) = processor.process(&batch).await {
                    warn!(worker_id, error = %e, size = batch.len(), "batch processing failed, re-enqueueing");
                    for event in batch {
                        if requeue.send(event).await.is_err() {
                            break;
                        }
                    }
                } else {
                    debug!(worker_id, size = batch.len(), "batch processed");
                }
            }
            Some(_) => {}
            None => {
                info!(worker_id, "event processor worker stopped");
                break;
            }
        }
        if cancel.is_cancelled() {
            break;
        }
    }
}

/// Collects up to `batch_size` events or until `batch_timeout` elapses,
/// whichever comes first. Returns `None` only when the input channel
/// has closed and nothing more will ever arrive.
async fn collect_batch(
    shared_rx: &Arc<tokio::sync::Mutex<mpsc::Receiver<WatchEvent<ResourceObject>>>>,
    batch_size: usize,
    batch_timeout: Duration,
    cancel: &CancellationToken,
) -> Option<Batch> {
    let mut rx = shared_rx.lock().await;
    let first = tokio::select! {
        _ = cancel.cancelled() => return None,
        item = rx.recv() => item,
    }?;

    let mut batch = vec![first];
    let deadline = tokio::time::Instant::now() + batch_timeout;
    while batch.len() < batch_size {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if remaining.is_zero() {
            break;
        }
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(remaining) => break,
            item = rx.recv() => match item {
                Some(event) => batch.push(event),
                None => break,
            },
        }
    }
    Some(batch)
}
