use std::time::Duration;

use serde::Deserialize;

use crate::delivery::{DeliveryConfig, DeliveryMode};

/// Top-level configuration settings for the publisher.
///
/// Includes the broker endpoints, the delivery policy, the client identity
/// used for idempotency keys and the log level.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub broker: BrokerSettings,
    pub delivery: DeliverySettings,
    pub client: ClientSettings,
    pub logging: LoggingSettings,
}

/// Where the broker's publish and release endpoints live.
#[derive(Debug, Deserialize, Clone)]
pub struct BrokerSettings {
    pub base_url: String,
    pub publish_path: String,
    pub release_path: String,
    /// Session token sent as the `access_token` cookie. The broker rejects
    /// release calls without it.
    pub access_token: Option<String>,
}

/// Delivery guarantee and retry tunables.
#[derive(Debug, Deserialize, Clone)]
pub struct DeliverySettings {
    pub mode: DeliveryMode,
    pub request_timeout_ms: u64,
    pub retry_limit: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientSettings {
    /// Stable identifier prefixed to idempotency keys. Empty means unset.
    pub id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingSettings {
    pub level: String,
}

impl DeliverySettings {
    pub fn delivery_config(&self) -> DeliveryConfig {
        DeliveryConfig {
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            retry_limit: self.retry_limit,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
        }
    }
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values are filled
/// from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub broker: Option<PartialBrokerSettings>,
    pub delivery: Option<PartialDeliverySettings>,
    pub client: Option<PartialClientSettings>,
    pub logging: Option<PartialLoggingSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialBrokerSettings {
    pub base_url: Option<String>,
    pub publish_path: Option<String>,
    pub release_path: Option<String>,
    pub access_token: Option<String>,
}

/// `mode` stays a string here so that any spelling `DeliveryMode` accepts
/// can be used in files and environment variables.
#[derive(Debug, Deserialize)]
pub struct PartialDeliverySettings {
    pub mode: Option<String>,
    pub request_timeout_ms: Option<u64>,
    pub retry_limit: Option<u32>,
    pub retry_backoff_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialClientSettings {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialLoggingSettings {
    pub level: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        let delivery = DeliveryConfig::default();
        Self {
            broker: BrokerSettings {
                base_url: "http://127.0.0.1:8080".to_string(),
                publish_path: "/publish".to_string(),
                release_path: "/removeRequest".to_string(),
                access_token: None,
            },
            delivery: DeliverySettings {
                mode: DeliveryMode::AtLeastOnce,
                request_timeout_ms: delivery.request_timeout.as_millis() as u64,
                retry_limit: delivery.retry_limit,
                retry_backoff_ms: delivery.retry_backoff.as_millis() as u64,
            },
            client: ClientSettings { id: String::new() },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}
