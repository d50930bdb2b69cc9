use std::collections::HashMap;
use std::sync::Arc;

use pushgate_common::config::AppConfig;
use pushgate_common::stats::StatStore;
use pushgate_common::types::Platform;

use crate::android::AndroidSender;
use crate::apns::HttpApnsClient;
use crate::gcm::HttpGcmClient;
use crate::ios::IosSender;
use crate::sender::PushSender;

/// Senders for every platform that is enabled and initialized.
///
/// A platform with no registered sender is treated as disabled by intake.
#[derive(Clone, Default)]
pub struct SenderRegistry {
    senders: HashMap<Platform, Arc<dyn PushSender>>,
}

impl SenderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build senders for the enabled platforms.
    ///
    /// A platform whose client cannot be constructed (unreadable certificate,
    /// bad proxy, ...) is logged and left out; the other platform still runs.
    pub fn from_config(config: &AppConfig, stats: Arc<dyn StatStore>) -> Self {
        let mut registry = Self::new();

        if config.ios.enabled {
            match HttpApnsClient::new(&config.ios) {
                Ok(client) => {
                    registry.register(Arc::new(IosSender::new(Arc::new(client), stats.clone())));
                }
                Err(e) => {
                    tracing::error!(error = %e, "APNs setup failed, iOS platform disabled");
                }
            }
        }

        if config.android.enabled {
            match HttpGcmClient::new(config.android.proxy.as_deref()) {
                Ok(client) => {
                    registry.register(Arc::new(AndroidSender::new(
                        Arc::new(client),
                        stats.clone(),
                        config.android.api_key.clone(),
                    )));
                }
                Err(e) => {
                    tracing::error!(error = %e, "GCM setup failed, Android platform disabled");
                }
            }
        }

        registry
    }

    pub fn register(&mut self, sender: Arc<dyn PushSender>) {
        self.senders.insert(sender.platform(), sender);
    }

    pub fn get(&self, platform: Platform) -> Option<Arc<dyn PushSender>> {
        self.senders.get(&platform).cloned()
    }

    pub fn is_enabled(&self, platform: Platform) -> bool {
        self.senders.contains_key(&platform)
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}
