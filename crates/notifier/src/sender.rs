use async_trait::async_trait;

use pushgate_common::types::{DeliveryResults, Platform, PushNotification};

use crate::apns::ApnsNotification;
use crate::gcm::GcmMessage;

/// Provider-native representation of a notification.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderPayload {
    Apns(ApnsNotification),
    Gcm(GcmMessage),
}

/// Result of one send attempt over a notification's current token set.
#[derive(Debug, Clone, Default)]
pub struct SendReport {
    pub outcomes: DeliveryResults,
    /// Tokens that failed in this attempt, in submission order.
    pub failed_tokens: Vec<String>,
}

impl SendReport {
    pub fn had_error(&self) -> bool {
        !self.failed_tokens.is_empty()
    }
}

/// A delivery network the dispatcher can route notifications to.
#[async_trait]
pub trait PushSender: Send + Sync {
    fn platform(&self) -> Platform;

    /// Build the provider payload for a notification.
    fn build_payload(&self, notification: &PushNotification) -> ProviderPayload;

    /// Deliver to every token in `notification.tokens` once.
    ///
    /// Per-token failures are reported in the returned `SendReport`, never as
    /// an error; stats and the push log are updated as a side effect.
    async fn send(&self, notification: &PushNotification) -> SendReport;
}
