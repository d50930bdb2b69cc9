//! Dispatcher: intake, routing and the sender+retry pipeline.
//!
//! Intake validates each notification of a `RequestPush` on its own and
//! either enqueues it for the worker pool or, on the direct path, delivers it
//! on the caller's task. Delivery routes by platform to the registered sender
//! and wraps it in a `RetryController`.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use pushgate_common::config::AppConfig;
use pushgate_common::stats::StatStore;
use pushgate_common::types::{
    DeliveryOutcome, DeliveryResults, FailureReason, Platform, PushNotification, RequestPush,
};
use pushgate_notifier::SenderRegistry;

use crate::queue::{DispatchQueue, QueuedNotification};
use crate::retry::RetryController;
use crate::validator::{ValidationError, validate};
use crate::worker::WorkerPool;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("platform {0} is not enabled")]
    PlatformDisabled(Platform),
}

/// Final result of one notification.
#[derive(Debug, Clone, Serialize)]
pub struct DispatchReport {
    pub id: Uuid,
    pub platform: Platform,
    pub results: DeliveryResults,
    pub had_error: bool,
    pub attempts: u32,
}

/// A notification refused at intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejection {
    /// Position in the request's `notifications` array.
    pub index: usize,
    pub error: String,
}

/// What intake did with a request.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IntakeSummary {
    /// Tokens accepted for delivery.
    pub counts: usize,
    pub rejected: Vec<Rejection>,
    /// Notifications dropped because their platform is disabled.
    pub skipped: usize,
}

#[derive(Clone)]
pub struct Dispatcher {
    config: Arc<AppConfig>,
    registry: Arc<SenderRegistry>,
    stats: Arc<dyn StatStore>,
    queue: DispatchQueue,
}

impl Dispatcher {
    pub fn new(
        config: Arc<AppConfig>,
        registry: SenderRegistry,
        stats: Arc<dyn StatStore>,
    ) -> Self {
        tracing::debug!(
            worker_num = config.worker_num,
            queue_num = config.queue_num,
            "Dispatcher created"
        );
        Self {
            queue: DispatchQueue::new(config.queue_num),
            config,
            registry: Arc::new(registry),
            stats,
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn queue(&self) -> &DispatchQueue {
        &self.queue
    }

    pub fn stats(&self) -> &Arc<dyn StatStore> {
        &self.stats
    }

    pub fn is_enabled(&self, platform: Platform) -> bool {
        self.registry.is_enabled(platform)
    }

    /// Spawn `worker_num` workers draining the queue.
    pub fn start_workers(&self) -> WorkerPool {
        WorkerPool::start(self.config.worker_num, self.clone())
    }

    /// Validate and enqueue every notification of a request.
    ///
    /// Waits while the queue is full. Each notification is counted in the
    /// total as soon as it is enqueued, so dropping this future part way
    /// through leaves the total matching what the workers will deliver.
    pub async fn queue_notifications(&self, request: RequestPush) -> IntakeSummary {
        let mut summary = IntakeSummary::default();

        for (index, notification) in request.notifications.into_iter().enumerate() {
            if !self.admit(index, &notification, &mut summary) {
                continue;
            }
            let count = notification.tokens.len();
            self.queue
                .enqueue(QueuedNotification::new(notification))
                .await;
            self.stats.add_total(count as i64).await;
            summary.counts += count;
        }

        summary
    }

    /// Validate and deliver every notification of a request on the caller's
    /// task, returning each notification's report.
    pub async fn send_notifications(
        &self,
        request: RequestPush,
    ) -> (IntakeSummary, Vec<DispatchReport>) {
        let mut summary = IntakeSummary::default();
        let mut accepted = Vec::new();

        for (index, notification) in request.notifications.into_iter().enumerate() {
            if self.admit(index, &notification, &mut summary) {
                summary.counts += notification.tokens.len();
                accepted.push(notification);
            }
        }

        self.stats.add_total(summary.counts as i64).await;

        let mut reports = Vec::with_capacity(accepted.len());
        for notification in accepted {
            reports.push(self.deliver(QueuedNotification::new(notification)).await);
        }

        (summary, reports)
    }

    /// Deliver a single notification without going through the queue.
    pub async fn send_now(
        &self,
        notification: PushNotification,
    ) -> Result<DispatchReport, DispatchError> {
        validate(&notification)?;
        if !self.registry.is_enabled(notification.platform) {
            return Err(DispatchError::PlatformDisabled(notification.platform));
        }

        self.stats
            .add_total(notification.tokens.len() as i64)
            .await;
        Ok(self.deliver(QueuedNotification::new(notification)).await)
    }

    /// Run the sender+retry pipeline for an already validated notification.
    pub async fn deliver(&self, job: QueuedNotification) -> DispatchReport {
        let QueuedNotification { id, notification } = job;
        let platform = notification.platform;

        let Some(sender) = self.registry.get(platform) else {
            tracing::error!(
                notification_id = %id,
                platform = %platform,
                "No sender for platform"
            );
            return self
                .fail_all(id, notification, FailureReason::Other("PlatformDisabled".into()))
                .await;
        };

        let controller = RetryController::new(notification.retry, self.config.max_retry(platform));
        let report = controller.run(sender.as_ref(), notification).await;

        tracing::debug!(
            notification_id = %id,
            platform = %platform,
            attempts = report.attempts,
            had_error = report.had_error,
            "Notification processed"
        );

        DispatchReport {
            id,
            platform,
            results: report.results,
            had_error: report.had_error,
            attempts: report.attempts,
        }
    }

    /// Report every token of a notification as failed.
    pub(crate) async fn fail_all(
        &self,
        id: Uuid,
        notification: PushNotification,
        reason: FailureReason,
    ) -> DispatchReport {
        self.stats
            .add_error(notification.platform, notification.tokens.len() as i64)
            .await;

        let results = notification
            .tokens
            .into_iter()
            .map(|token| (token, DeliveryOutcome::failure(reason.clone())))
            .collect();

        DispatchReport {
            id,
            platform: notification.platform,
            results,
            had_error: true,
            attempts: 0,
        }
    }

    fn admit(
        &self,
        index: usize,
        notification: &PushNotification,
        summary: &mut IntakeSummary,
    ) -> bool {
        if let Err(e) = validate(notification) {
            summary.rejected.push(Rejection {
                index,
                error: e.to_string(),
            });
            return false;
        }

        if !self.registry.is_enabled(notification.platform) {
            tracing::debug!(
                index,
                platform = %notification.platform,
                "Platform disabled, skipping notification"
            );
            summary.skipped += 1;
            return false;
        }

        true
    }
}
