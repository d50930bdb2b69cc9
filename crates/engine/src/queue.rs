//! Bounded dispatch queue.
//!
//! A tokio `mpsc` channel whose receiver is shared by every worker. The
//! channel capacity is the only backpressure in the system: `enqueue` waits
//! while the queue is full, `dequeue` waits while it is empty. The queue owns
//! a sender, so the channel never closes while the queue is alive.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use uuid::Uuid;

use pushgate_common::types::PushNotification;

/// A notification waiting for a worker.
#[derive(Debug, Clone)]
pub struct QueuedNotification {
    /// Correlates log records for one notification across retries.
    pub id: Uuid,
    pub notification: PushNotification,
}

impl QueuedNotification {
    pub fn new(notification: PushNotification) -> Self {
        Self {
            id: Uuid::new_v4(),
            notification,
        }
    }
}

#[derive(Clone)]
pub struct DispatchQueue {
    sender: mpsc::Sender<QueuedNotification>,
    receiver: Arc<Mutex<mpsc::Receiver<QueuedNotification>>>,
    capacity: usize,
}

impl DispatchQueue {
    /// Create a queue holding at most `capacity` pending notifications.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);
        Self {
            sender,
            receiver: Arc::new(Mutex::new(receiver)),
            capacity,
        }
    }

    /// Push a notification, waiting for a free slot if the queue is full.
    pub async fn enqueue(&self, job: QueuedNotification) {
        // The receiver lives as long as `self`, so send cannot fail here.
        if self.sender.send(job).await.is_err() {
            tracing::error!("Dispatch queue receiver dropped");
        }
    }

    /// Pop the oldest notification, waiting until one is available.
    pub async fn dequeue(&self) -> Option<QueuedNotification> {
        self.receiver.lock().await.recv().await
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of notifications currently waiting.
    pub fn len(&self) -> usize {
        self.capacity - self.sender.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
