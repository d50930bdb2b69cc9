use serde::Deserialize;

use crate::types::Platform;

/// Statistic storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatEngine {
    Memory,
    Redis,
}

/// APNs platform settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IosConfig {
    pub enabled: bool,
    /// Path to a `.p12` or `.pem` client certificate.
    pub key_path: String,
    /// Certificate password (PKCS#12 only).
    pub password: String,
    /// Use the production gateway instead of the sandbox.
    pub production: bool,
    /// Platform retry ceiling.
    pub max_retry: u32,
}

/// GCM platform settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AndroidConfig {
    pub enabled: bool,
    /// Default server key; a request-supplied key overrides it.
    pub api_key: String,
    /// Platform retry ceiling.
    pub max_retry: u32,
    /// Optional HTTP proxy applied to the GCM client only.
    pub proxy: Option<String>,
}

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// HTTP listen port (default: 8088)
    pub port: u16,

    /// Number of dispatch workers (default: available parallelism)
    pub worker_num: usize,

    /// Dispatch queue capacity (default: 8192)
    pub queue_num: usize,

    /// Deliver inside the request instead of queueing (default: false)
    pub sync: bool,

    /// Statistic storage backend (default: memory)
    pub stat_engine: StatEngine,

    /// Redis connection string, used by the redis stat engine
    pub redis_url: String,

    pub ios: IosConfig,

    pub android: AndroidConfig,
}

/// Errors raised while loading or checking configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be a valid {1}")]
    Invalid(&'static str, &'static str),

    #[error("Please enable iOS or Android config")]
    NoPlatformEnabled,

    #[error("Missing iOS certificate path")]
    MissingIosKeyPath,

    #[error("Missing Android API Key")]
    MissingAndroidApiKey,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let default_workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);

        Ok(Self {
            port: env_parse("PUSH_PORT", 8088, "u16")?,
            worker_num: env_parse("PUSH_WORKER_NUM", default_workers, "usize")?,
            queue_num: env_parse("PUSH_QUEUE_NUM", 8192, "usize")?,
            sync: env_parse("PUSH_SYNC", false, "bool")?,
            stat_engine: match std::env::var("PUSH_STAT_ENGINE")
                .unwrap_or_else(|_| "memory".to_string())
                .to_lowercase()
                .as_str()
            {
                "memory" => StatEngine::Memory,
                "redis" => StatEngine::Redis,
                _ => return Err(ConfigError::Invalid("PUSH_STAT_ENGINE", "stat engine")),
            },
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            ios: IosConfig {
                enabled: env_parse("IOS_ENABLED", false, "bool")?,
                key_path: std::env::var("IOS_KEY_PATH").unwrap_or_default(),
                password: std::env::var("IOS_PASSWORD").unwrap_or_default(),
                production: env_parse("IOS_PRODUCTION", false, "bool")?,
                max_retry: env_parse("IOS_MAX_RETRY", 0, "u32")?,
            },
            android: AndroidConfig {
                enabled: env_parse("ANDROID_ENABLED", false, "bool")?,
                api_key: std::env::var("ANDROID_API_KEY").unwrap_or_default(),
                max_retry: env_parse("ANDROID_MAX_RETRY", 0, "u32")?,
                proxy: std::env::var("ANDROID_PROXY").ok().filter(|p| !p.is_empty()),
            },
        })
    }

    /// Check that the enabled platforms carry the credentials they need.
    pub fn check(&self) -> Result<(), ConfigError> {
        if !self.ios.enabled && !self.android.enabled {
            return Err(ConfigError::NoPlatformEnabled);
        }

        if self.ios.enabled && self.ios.key_path.is_empty() {
            return Err(ConfigError::MissingIosKeyPath);
        }

        if self.android.enabled && self.android.api_key.is_empty() {
            return Err(ConfigError::MissingAndroidApiKey);
        }

        Ok(())
    }

    /// Retry ceiling configured for a platform.
    pub fn max_retry(&self, platform: Platform) -> u32 {
        match platform {
            Platform::Ios => self.ios.max_retry,
            Platform::Android => self.android.max_retry,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8088,
            worker_num: 4,
            queue_num: 8192,
            sync: false,
            stat_engine: StatEngine::Memory,
            redis_url: "redis://localhost:6379".to_string(),
            ios: IosConfig::default(),
            android: AndroidConfig::default(),
        }
    }
}

fn env_parse<T: std::str::FromStr>(
    key: &'static str,
    default: T,
    kind: &'static str,
) -> Result<T, ConfigError> {
    match std::env::var(key) {
        Ok(raw) if !raw.is_empty() => raw.parse().map_err(|_| ConfigError::Invalid(key, kind)),
        _ => Ok(default),
    }
}
