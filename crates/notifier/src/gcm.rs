//! GCM HTTP wire types and client.
//!
//! A single request carries up to 1000 registration ids; the response holds
//! one result per id in submission order.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use pushgate_common::types::AndroidNotification;

use crate::error::{SetupError, TransportError};

pub const GCM_SEND_ENDPOINT: &str = "https://gcm-http.googleapis.com/gcm/send";

fn is_false(value: &bool) -> bool {
    !*value
}

/// Downstream HTTP message.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GcmMessage {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub to: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub registration_ids: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub collapse_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub content_available: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub delay_while_idle: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_to_live: Option<u32>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub restricted_package_name: String,
    #[serde(skip_serializing_if = "is_false")]
    pub dry_run: bool,
    #[serde(skip_serializing_if = "serde_json::Map::is_empty")]
    pub data: serde_json::Map<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<AndroidNotification>,
}

/// Per-registration-id result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GcmResult {
    pub message_id: String,
    pub registration_id: String,
    pub error: String,
}

/// Batch response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GcmResponse {
    pub multicast_id: i64,
    pub success: i64,
    pub failure: i64,
    pub canonical_ids: i64,
    pub results: Vec<GcmResult>,
}

/// Transport seam for GCM.
#[async_trait]
pub trait GcmClient: Send + Sync {
    async fn send(&self, api_key: &str, message: &GcmMessage)
    -> Result<GcmResponse, TransportError>;
}

/// reqwest-backed GCM client.
#[derive(Debug)]
pub struct HttpGcmClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpGcmClient {
    /// Build a client, optionally routed through an HTTP proxy.
    pub fn new(proxy: Option<&str>) -> Result<Self, SetupError> {
        let mut builder = reqwest::Client::builder().timeout(Duration::from_secs(30));

        if let Some(url) = proxy {
            let proxy = reqwest::Proxy::all(url).map_err(|e| SetupError::InvalidProxy {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
            builder = builder.proxy(proxy);
            tracing::debug!(proxy = url, "Set http proxy for GCM");
        }

        let client = builder
            .build()
            .map_err(|e| SetupError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: GCM_SEND_ENDPOINT.to_string(),
        })
    }
}

#[async_trait]
impl GcmClient for HttpGcmClient {
    async fn send(
        &self,
        api_key: &str,
        message: &GcmMessage,
    ) -> Result<GcmResponse, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("key={}", api_key))
            .json(message)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<GcmResponse>()
            .await
            .map_err(|e| TransportError::Decode(e.to_string()))
    }
}
