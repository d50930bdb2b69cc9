//! APNs wire types and HTTP/2 client.
//!
//! Authentication uses a TLS client certificate loaded from a `.p12` or
//! `.pem` file. One request is made per device token.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use pushgate_common::config::IosConfig;

use crate::error::{SetupError, TransportError};

const PRODUCTION_HOST: &str = "https://api.push.apple.com";
const DEVELOPMENT_HOST: &str = "https://api.sandbox.push.apple.com";

/// APNs delivery priority (`apns-priority` header).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApnsPriority {
    /// Deliver taking power considerations into account; may be grouped.
    Low,
    /// Deliver immediately.
    High,
}

impl ApnsPriority {
    pub fn header_value(self) -> &'static str {
        match self {
            ApnsPriority::Low => "5",
            ApnsPriority::High => "10",
        }
    }
}

/// A single APNs request: headers plus the JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct ApnsNotification {
    pub device_token: String,
    pub apns_id: Option<String>,
    pub topic: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
    pub priority: ApnsPriority,
    pub payload: serde_json::Value,
}

/// What the gateway answered for one token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApnsResponse {
    pub status_code: u16,
    pub apns_id: Option<String>,
    /// Rejection reason, e.g. `BadDeviceToken`.
    pub reason: Option<String>,
}

impl ApnsResponse {
    pub fn sent(&self) -> bool {
        self.status_code == 200
    }
}

#[derive(Debug, Deserialize)]
struct ApnsErrorBody {
    reason: Option<String>,
}

/// Transport seam for APNs; the HTTP client in production, fakes in tests.
#[async_trait]
pub trait ApnsClient: Send + Sync {
    async fn push(&self, notification: &ApnsNotification) -> Result<ApnsResponse, TransportError>;
}

/// reqwest-backed APNs client authenticated with a client certificate.
pub struct HttpApnsClient {
    client: reqwest::Client,
    host: &'static str,
}

impl std::fmt::Debug for HttpApnsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpApnsClient")
            .field("host", &self.host)
            .finish_non_exhaustive()
    }
}

impl HttpApnsClient {
    /// Load the certificate and build the client.
    pub fn new(config: &IosConfig) -> Result<Self, SetupError> {
        let identity = load_identity(&config.key_path, &config.password)?;

        let client = reqwest::Client::builder()
            .use_native_tls()
            .identity(identity)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| SetupError::ClientBuild(e.to_string()))?;

        let host = if config.production {
            PRODUCTION_HOST
        } else {
            DEVELOPMENT_HOST
        };

        tracing::info!(host, production = config.production, "APNs client initialized");

        Ok(Self { client, host })
    }
}

/// Read a `.p12` or `.pem` certificate into a TLS identity.
pub fn load_identity(key_path: &str, password: &str) -> Result<reqwest::Identity, SetupError> {
    let ext = Path::new(key_path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();

    if ext != "p12" && ext != "pem" {
        return Err(SetupError::CertificateExtension(key_path.to_string()));
    }

    let bytes = std::fs::read(key_path).map_err(|e| SetupError::CertificateRead {
        path: key_path.to_string(),
        reason: e.to_string(),
    })?;

    let identity = if ext == "p12" {
        reqwest::Identity::from_pkcs12_der(&bytes, password)
    } else {
        // Combined file: certificate chain followed by a PKCS#8 key.
        reqwest::Identity::from_pkcs8_pem(&bytes, &bytes)
    };

    identity.map_err(|e| SetupError::CertificateParse(e.to_string()))
}

#[async_trait]
impl ApnsClient for HttpApnsClient {
    async fn push(&self, notification: &ApnsNotification) -> Result<ApnsResponse, TransportError> {
        let url = format!("{}/3/device/{}", self.host, notification.device_token);

        let mut request = self
            .client
            .post(&url)
            .header("apns-priority", notification.priority.header_value())
            .json(&notification.payload);

        if let Some(ref apns_id) = notification.apns_id {
            request = request.header("apns-id", apns_id);
        }
        if let Some(ref topic) = notification.topic {
            request = request.header("apns-topic", topic);
        }
        if let Some(expiration) = notification.expiration {
            request = request.header("apns-expiration", expiration.timestamp().to_string());
        }

        let response = request
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status_code = response.status().as_u16();
        let apns_id = response
            .headers()
            .get("apns-id")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        if status_code == 200 {
            return Ok(ApnsResponse {
                status_code,
                apns_id,
                reason: None,
            });
        }

        let body = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<ApnsErrorBody>(&body)
            .ok()
            .and_then(|b| b.reason);

        Ok(ApnsResponse {
            status_code,
            apns_id,
            reason,
        })
    }
}
