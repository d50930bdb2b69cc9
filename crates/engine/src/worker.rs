//! Fixed-size worker pool draining the dispatch queue.
//!
//! Each delivery runs in its own task so a panicking sender only loses the
//! notification it was handling; the worker logs the failure and keeps going.

use tokio::task::JoinHandle;

use crate::dispatcher::Dispatcher;
use crate::queue::QueuedNotification;

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `worker_num` workers sharing the dispatcher's queue.
    pub fn start(worker_num: usize, dispatcher: Dispatcher) -> Self {
        let worker_num = worker_num.max(1);
        let handles = (0..worker_num)
            .map(|id| tokio::spawn(run_worker(id, dispatcher.clone())))
            .collect();

        tracing::info!(worker_num, "Worker pool started");
        Self { handles }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Stop every worker. Queued notifications that were not yet picked up
    /// are dropped.
    pub fn shutdown(self) {
        for handle in &self.handles {
            handle.abort();
        }
        tracing::info!(worker_num = self.handles.len(), "Worker pool stopped");
    }
}

async fn run_worker(id: usize, dispatcher: Dispatcher) {
    tracing::debug!(worker = id, "Worker started");

    while let Some(job) = dispatcher.queue().dequeue().await {
        process(id, &dispatcher, job).await;
    }

    tracing::debug!(worker = id, "Worker exiting, queue closed");
}

async fn process(worker: usize, dispatcher: &Dispatcher, job: QueuedNotification) {
    let id = job.id;
    let platform = job.notification.platform;
    let tokens = job.notification.tokens.len();

    let task = {
        let dispatcher = dispatcher.clone();
        tokio::spawn(async move { dispatcher.deliver(job).await })
    };

    match task.await {
        Ok(report) => {
            tracing::debug!(
                worker,
                notification_id = %report.id,
                had_error = report.had_error,
                "Delivery finished"
            );
        }
        Err(e) => {
            tracing::error!(
                worker,
                notification_id = %id,
                platform = %platform,
                tokens,
                panicked = e.is_panic(),
                error = %e,
                "Delivery task failed"
            );
            // Per-token outcomes of the aborted delivery are lost, so every
            // token is counted as an error, including any the sender already
            // counted as delivered before it panicked.
            dispatcher.stats().add_error(platform, tokens as i64).await;
        }
    }
}
