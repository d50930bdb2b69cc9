use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Upper bound on Android `time_to_live`, in seconds (4 weeks).
pub const MAX_TIME_TO_LIVE: u32 = 2_419_200;

/// Maximum number of registration ids in a single Android request.
pub const MAX_ANDROID_TOKENS: usize = 1000;

/// Supported delivery networks.
///
/// On the wire a platform is an integer: `1` for iOS, `2` for Android.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Platform {
    #[default]
    Ios,
    Android,
}

impl TryFrom<u8> for Platform {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Platform::Ios),
            2 => Ok(Platform::Android),
            other => Err(format!("unknown platform {}", other)),
        }
    }
}

impl From<Platform> for u8 {
    fn from(platform: Platform) -> Self {
        match platform {
            Platform::Ios => 1,
            Platform::Android => 2,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Ios => write!(f, "ios"),
            Platform::Android => write!(f, "android"),
        }
    }
}

/// APNs alert dictionary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Alert {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub action: String,
    #[serde(rename = "action-loc-key", skip_serializing_if = "String::is_empty")]
    pub action_loc_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub body: String,
    #[serde(rename = "launch-image", skip_serializing_if = "String::is_empty")]
    pub launch_image: String,
    #[serde(rename = "loc-args", skip_serializing_if = "Vec::is_empty")]
    pub loc_args: Vec<String>,
    #[serde(rename = "loc-key", skip_serializing_if = "String::is_empty")]
    pub loc_key: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub subtitle: String,
    #[serde(rename = "title-loc-args", skip_serializing_if = "Vec::is_empty")]
    pub title_loc_args: Vec<String>,
    #[serde(rename = "title-loc-key", skip_serializing_if = "String::is_empty")]
    pub title_loc_key: String,
}

impl Alert {
    /// Whether any field beyond a plain message is set, which forces the
    /// alert to be sent as a dictionary instead of a string.
    pub fn is_structured(&self) -> bool {
        !self.title.is_empty()
            || !self.subtitle.is_empty()
            || !self.body.is_empty()
            || !self.loc_key.is_empty()
            || !self.loc_args.is_empty()
            || !self.title_loc_key.is_empty()
            || !self.title_loc_args.is_empty()
            || !self.launch_image.is_empty()
            || !self.action.is_empty()
            || !self.action_loc_key.is_empty()
    }
}

/// Android notification sub-object (display fields rendered by the device).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AndroidNotification {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub body: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub icon: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub sound: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub badge: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tag: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub color: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub click_action: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub body_loc_key: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub body_loc_args: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title_loc_key: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub title_loc_args: Vec<String>,
}

/// A single notification request targeting one platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PushNotification {
    // Common
    #[serde(default)]
    pub tokens: Vec<String>,
    pub platform: Platform,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub priority: String,
    #[serde(default)]
    pub content_available: bool,
    #[serde(default)]
    pub sound: String,
    #[serde(default)]
    pub data: serde_json::Map<String, serde_json::Value>,
    /// Requested retry ceiling; 0 means "use the platform default".
    #[serde(default)]
    pub retry: u32,

    // Android
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub to: String,
    #[serde(default)]
    pub collapse_key: String,
    #[serde(default)]
    pub delay_while_idle: bool,
    #[serde(default)]
    pub time_to_live: Option<u32>,
    #[serde(default)]
    pub restricted_package_name: String,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub notification: AndroidNotification,

    // iOS
    /// Epoch seconds; 0 leaves expiration unset.
    #[serde(default)]
    pub expiration: i64,
    #[serde(default)]
    pub apns_id: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub badge: Option<i64>,
    #[serde(default)]
    pub category: String,
    #[serde(default, rename = "url-args")]
    pub url_args: Vec<String>,
    #[serde(default)]
    pub alert: Alert,
}

impl PushNotification {
    /// Short human-readable summary used in push log records.
    pub fn summary(&self) -> String {
        if !self.message.is_empty() {
            self.message.clone()
        } else if !self.alert.body.is_empty() {
            self.alert.body.clone()
        } else if !self.notification.body.is_empty() {
            self.notification.body.clone()
        } else {
            self.title.clone()
        }
    }
}

/// A batch of notifications accepted by the intake layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestPush {
    pub notifications: Vec<PushNotification>,
}

/// Provider-reported (or transport-level) reason a token was not delivered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailureReason {
    // GCM
    MissingRegistration,
    InvalidRegistration,
    MismatchSenderId,
    NotRegistered,
    MessageTooBig,
    InvalidDataKey,
    InvalidTtl,
    InternalServerError,
    InvalidPackageName,
    Unavailable,
    DeviceMessageRateExceeded,
    TopicsMessageRateExceeded,
    InvalidApnsCredential,

    // APNs
    BadDeviceToken,
    Unregistered,
    DeviceTokenNotForTopic,
    PayloadTooLarge,
    TooManyRequests,
    BadCertificate,
    BadTopic,
    ServiceUnavailable,

    /// The provider could not be reached or answered with garbage.
    Transport(String),
    /// A provider reason string outside the known set.
    Other(String),
}

impl FailureReason {
    /// Map a provider reason string onto the taxonomy.
    pub fn from_code(code: &str) -> Self {
        match code {
            "MissingRegistration" => FailureReason::MissingRegistration,
            "InvalidRegistration" => FailureReason::InvalidRegistration,
            "MismatchSenderId" => FailureReason::MismatchSenderId,
            "NotRegistered" => FailureReason::NotRegistered,
            "MessageTooBig" => FailureReason::MessageTooBig,
            "InvalidDataKey" => FailureReason::InvalidDataKey,
            "InvalidTtl" => FailureReason::InvalidTtl,
            "InternalServerError" => FailureReason::InternalServerError,
            "InvalidPackageName" => FailureReason::InvalidPackageName,
            "Unavailable" => FailureReason::Unavailable,
            "DeviceMessageRateExceeded" => FailureReason::DeviceMessageRateExceeded,
            "TopicsMessageRateExceeded" => FailureReason::TopicsMessageRateExceeded,
            "InvalidApnsCredential" => FailureReason::InvalidApnsCredential,
            "BadDeviceToken" => FailureReason::BadDeviceToken,
            "Unregistered" => FailureReason::Unregistered,
            "DeviceTokenNotForTopic" => FailureReason::DeviceTokenNotForTopic,
            "PayloadTooLarge" => FailureReason::PayloadTooLarge,
            "TooManyRequests" => FailureReason::TooManyRequests,
            "BadCertificate" => FailureReason::BadCertificate,
            "BadTopic" => FailureReason::BadTopic,
            "ServiceUnavailable" => FailureReason::ServiceUnavailable,
            other => FailureReason::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            FailureReason::MissingRegistration => "MissingRegistration",
            FailureReason::InvalidRegistration => "InvalidRegistration",
            FailureReason::MismatchSenderId => "MismatchSenderId",
            FailureReason::NotRegistered => "NotRegistered",
            FailureReason::MessageTooBig => "MessageTooBig",
            FailureReason::InvalidDataKey => "InvalidDataKey",
            FailureReason::InvalidTtl => "InvalidTtl",
            FailureReason::InternalServerError => "InternalServerError",
            FailureReason::InvalidPackageName => "InvalidPackageName",
            FailureReason::Unavailable => "Unavailable",
            FailureReason::DeviceMessageRateExceeded => "DeviceMessageRateExceeded",
            FailureReason::TopicsMessageRateExceeded => "TopicsMessageRateExceeded",
            FailureReason::InvalidApnsCredential => "InvalidApnsCredential",
            FailureReason::BadDeviceToken => "BadDeviceToken",
            FailureReason::Unregistered => "Unregistered",
            FailureReason::DeviceTokenNotForTopic => "DeviceTokenNotForTopic",
            FailureReason::PayloadTooLarge => "PayloadTooLarge",
            FailureReason::TooManyRequests => "TooManyRequests",
            FailureReason::BadCertificate => "BadCertificate",
            FailureReason::BadTopic => "BadTopic",
            FailureReason::ServiceUnavailable => "ServiceUnavailable",
            FailureReason::Transport(msg) => msg,
            FailureReason::Other(code) => code,
        }
    }

    /// Whether the token is dead and should be purged by the caller.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            FailureReason::InvalidRegistration
                | FailureReason::NotRegistered
                | FailureReason::MismatchSenderId
                | FailureReason::BadDeviceToken
                | FailureReason::Unregistered
                | FailureReason::DeviceTokenNotForTopic
        )
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureReason::Transport(msg) => write!(f, "transport error: {}", msg),
            other => write!(f, "{}", other.as_str()),
        }
    }
}

impl Serialize for FailureReason {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

/// Final outcome of delivering to a single token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum DeliveryOutcome {
    Success,
    Failure { reason: FailureReason },
}

impl DeliveryOutcome {
    pub fn failure(reason: FailureReason) -> Self {
        DeliveryOutcome::Failure { reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryOutcome::Success)
    }
}

/// Per-token outcomes keyed by device token.
pub type DeliveryResults = HashMap<String, DeliveryOutcome>;
