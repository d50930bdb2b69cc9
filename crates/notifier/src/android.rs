//! Android sender: one batched GCM request per attempt.

use std::sync::Arc;

use async_trait::async_trait;

use pushgate_common::stats::StatStore;
use pushgate_common::types::{
    AndroidNotification, DeliveryOutcome, FailureReason, Platform, PushNotification,
};

use crate::gcm::{GcmClient, GcmMessage};
use crate::log::{PushStatus, log_push};
use crate::sender::{ProviderPayload, PushSender, SendReport};

pub struct AndroidSender {
    client: Arc<dyn GcmClient>,
    stats: Arc<dyn StatStore>,
    /// Server key used when a request does not supply its own.
    api_key: String,
}

impl AndroidSender {
    pub fn new(client: Arc<dyn GcmClient>, stats: Arc<dyn StatStore>, api_key: String) -> Self {
        Self {
            client,
            stats,
            api_key,
        }
    }

    /// Map a notification onto a single batched GCM message.
    pub fn build_message(req: &PushNotification) -> GcmMessage {
        let mut notification = req.notification.clone();
        if !req.message.is_empty() {
            notification.body = req.message.clone();
        }
        if !req.title.is_empty() {
            notification.title = req.title.clone();
        }
        if !req.sound.is_empty() {
            notification.sound = req.sound.clone();
        }

        GcmMessage {
            to: req.to.clone(),
            registration_ids: req.tokens.clone(),
            collapse_key: req.collapse_key.clone(),
            priority: (req.priority == "high").then(|| "high".to_string()),
            content_available: req.content_available,
            delay_while_idle: req.delay_while_idle,
            time_to_live: req.time_to_live,
            restricted_package_name: req.restricted_package_name.clone(),
            dry_run: req.dry_run,
            data: req.data.clone(),
            notification: (notification != AndroidNotification::default()).then_some(notification),
        }
    }

    fn resolve_api_key<'a>(&'a self, req: &'a PushNotification) -> &'a str {
        if req.api_key.is_empty() {
            &self.api_key
        } else {
            &req.api_key
        }
    }
}

#[async_trait]
impl PushSender for AndroidSender {
    fn platform(&self) -> Platform {
        Platform::Android
    }

    fn build_payload(&self, notification: &PushNotification) -> ProviderPayload {
        ProviderPayload::Gcm(Self::build_message(notification))
    }

    async fn send(&self, req: &PushNotification) -> SendReport {
        tracing::debug!(tokens = req.tokens.len(), "Start push notification for Android");

        let message = Self::build_message(req);
        let mut report = SendReport::default();

        let res = match self.client.send(self.resolve_api_key(req), &message).await {
            Ok(res) => res,
            Err(e) => {
                // No per-token breakdown exists; the whole batch failed.
                tracing::error!(
                    tokens = req.tokens.len(),
                    error = %e,
                    message = %req.summary(),
                    "GCM server error"
                );
                self.stats.add_android_error(1).await;

                let reason = FailureReason::Transport(e.to_string());
                for token in &req.tokens {
                    report
                        .outcomes
                        .insert(token.clone(), DeliveryOutcome::failure(reason.clone()));
                    report.failed_tokens.push(token.clone());
                }
                return report;
            }
        };

        tracing::debug!(
            success = res.success,
            failure = res.failure,
            "Android batch response"
        );
        self.stats.add_android_success(res.success).await;
        self.stats.add_android_error(res.failure).await;

        for (index, token) in req.tokens.iter().enumerate() {
            let outcome = match res.results.get(index) {
                Some(result) if result.error.is_empty() => DeliveryOutcome::Success,
                Some(result) => DeliveryOutcome::failure(FailureReason::from_code(&result.error)),
                None => DeliveryOutcome::failure(FailureReason::Other("MissingResult".to_string())),
            };

            match &outcome {
                DeliveryOutcome::Success => log_push(PushStatus::Succeeded, token, req, None),
                DeliveryOutcome::Failure { reason } => {
                    log_push(PushStatus::Failed, token, req, Some(reason));
                    report.failed_tokens.push(token.clone());
                }
            }

            report.outcomes.insert(token.clone(), outcome);
        }

        let failed = report.failed_tokens.len() as i64;
        let succeeded = req.tokens.len() as i64 - failed;
        if succeeded != res.success || failed != res.failure {
            tracing::warn!(
                reported_success = res.success,
                reported_failure = res.failure,
                succeeded,
                failed,
                "GCM totals disagree with per-token results"
            );
        }

        report
    }
}
