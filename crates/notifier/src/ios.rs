//! iOS sender: builds APNs payloads and delivers token by token.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde_json::{Map, Value, json};

use pushgate_common::stats::StatStore;
use pushgate_common::types::{
    Alert, DeliveryOutcome, FailureReason, Platform, PushNotification,
};

use crate::apns::{ApnsClient, ApnsNotification, ApnsPriority};
use crate::log::{PushStatus, log_push};
use crate::sender::{ProviderPayload, PushSender, SendReport};

pub struct IosSender {
    client: Arc<dyn ApnsClient>,
    stats: Arc<dyn StatStore>,
}

impl IosSender {
    pub fn new(client: Arc<dyn ApnsClient>, stats: Arc<dyn StatStore>) -> Self {
        Self { client, stats }
    }

    /// Map a notification onto an APNs request with no device token set.
    pub fn build_notification(req: &PushNotification) -> ApnsNotification {
        let priority = if req.priority == "normal" {
            ApnsPriority::Low
        } else {
            ApnsPriority::High
        };

        let expiration = if req.expiration > 0 {
            Utc.timestamp_opt(req.expiration, 0).single()
        } else {
            None
        };

        ApnsNotification {
            device_token: String::new(),
            apns_id: non_empty(&req.apns_id),
            topic: non_empty(&req.topic),
            expiration,
            priority,
            payload: Self::build_body(req),
        }
    }

    fn build_body(req: &PushNotification) -> Value {
        let mut aps = Map::new();

        if let Some(alert) = Self::build_alert(req) {
            aps.insert("alert".to_string(), alert);
        }

        // Zero clears the badge on the app icon.
        if let Some(badge) = req.badge.filter(|b| *b >= 0) {
            aps.insert("badge".to_string(), json!(badge));
        }

        if !req.sound.is_empty() {
            aps.insert("sound".to_string(), json!(req.sound));
        }

        if req.content_available {
            aps.insert("content-available".to_string(), json!(1));
        }

        if !req.category.is_empty() {
            aps.insert("category".to_string(), json!(req.category));
        }

        if !req.url_args.is_empty() {
            aps.insert("url-args".to_string(), json!(req.url_args));
        }

        let mut payload = req.data.clone();
        payload.insert("aps".to_string(), Value::Object(aps));
        Value::Object(payload)
    }

    /// Alert-level title and body win when non-empty; otherwise the
    /// top-level title and message apply.
    fn build_alert(req: &PushNotification) -> Option<Value> {
        let title = if req.alert.title.is_empty() {
            &req.title
        } else {
            &req.alert.title
        };
        let body = if req.alert.body.is_empty() {
            &req.message
        } else {
            &req.alert.body
        };

        if req.alert.is_structured() || !req.title.is_empty() {
            let alert = Alert {
                title: title.clone(),
                body: body.clone(),
                ..req.alert.clone()
            };
            return serde_json::to_value(alert).ok();
        }

        if body.is_empty() {
            None
        } else {
            Some(Value::String(body.clone()))
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

#[async_trait]
impl PushSender for IosSender {
    fn platform(&self) -> Platform {
        Platform::Ios
    }

    fn build_payload(&self, notification: &PushNotification) -> ProviderPayload {
        ProviderPayload::Apns(Self::build_notification(notification))
    }

    async fn send(&self, req: &PushNotification) -> SendReport {
        tracing::debug!(tokens = req.tokens.len(), "Start push notification for iOS");

        let mut notification = Self::build_notification(req);
        let mut report = SendReport::default();

        for token in &req.tokens {
            notification.device_token = token.clone();

            let outcome = match self.client.push(&notification).await {
                Err(e) => DeliveryOutcome::failure(FailureReason::Transport(e.to_string())),
                Ok(res) if !res.sent() => {
                    let reason = res
                        .reason
                        .as_deref()
                        .map(FailureReason::from_code)
                        .unwrap_or_else(|| {
                            FailureReason::Other(format!("status {}", res.status_code))
                        });
                    DeliveryOutcome::failure(reason)
                }
                Ok(res) => match res.reason.as_deref().filter(|r| !r.is_empty()) {
                    Some(reason) => DeliveryOutcome::failure(FailureReason::from_code(reason)),
                    None => DeliveryOutcome::Success,
                },
            };

            match &outcome {
                DeliveryOutcome::Success => {
                    log_push(PushStatus::Succeeded, token, req, None);
                    self.stats.add_ios_success(1).await;
                }
                DeliveryOutcome::Failure { reason } => {
                    log_push(PushStatus::Failed, token, req, Some(reason));
                    self.stats.add_ios_error(1).await;
                    report.failed_tokens.push(token.clone());
                }
            }

            report.outcomes.insert(token.clone(), outcome);
        }

        report
    }
}
