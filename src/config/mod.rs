mod settings;

use config::{Config, ConfigError, Environment, File};
use url::Url;

use crate::delivery::DeliveryMode;
use settings::PartialSettings;

pub use settings::{
    BrokerSettings, ClientSettings, DeliverySettings, LoggingSettings, Settings,
};

/// Default configuration file, relative to the working directory. Any
/// extension `config` understands (`.toml`, `.json`, `.yaml`, ...) works.
pub const DEFAULT_CONFIG_PATH: &str = "config/default";

/// Loads the configuration from the default file and environment variables.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(DEFAULT_CONFIG_PATH)
}

/// Loads the configuration from `path` (optional) and `POPSUB_*`
/// environment variables, e.g. `POPSUB_DELIVERY__RETRY_LIMIT=3`.
/// Missing values are merged with defaults.
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix("POPSUB")
                .prefix_separator("_")
                .separator("__"),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    let default = Settings::default();

    let broker = partial.broker;
    let delivery = partial.delivery;

    let mode = match delivery.as_ref().and_then(|d| d.mode.as_deref()) {
        Some(raw) => raw
            .parse::<DeliveryMode>()
            .map_err(|e| ConfigError::Message(e.to_string()))?,
        None => default.delivery.mode,
    };

    let settings = Settings {
        broker: BrokerSettings {
            base_url: broker
                .as_ref()
                .and_then(|b| b.base_url.clone())
                .unwrap_or(default.broker.base_url),
            publish_path: broker
                .as_ref()
                .and_then(|b| b.publish_path.clone())
                .unwrap_or(default.broker.publish_path),
            release_path: broker
                .as_ref()
                .and_then(|b| b.release_path.clone())
                .unwrap_or(default.broker.release_path),
            access_token: broker
                .as_ref()
                .and_then(|b| b.access_token.clone())
                .filter(|token| !token.is_empty())
                .or(default.broker.access_token),
        },
        delivery: DeliverySettings {
            mode,
            request_timeout_ms: delivery
                .as_ref()
                .and_then(|d| d.request_timeout_ms)
                .unwrap_or(default.delivery.request_timeout_ms),
            retry_limit: delivery
                .as_ref()
                .and_then(|d| d.retry_limit)
                .unwrap_or(default.delivery.retry_limit),
            retry_backoff_ms: delivery
                .as_ref()
                .and_then(|d| d.retry_backoff_ms)
                .unwrap_or(default.delivery.retry_backoff_ms),
        },
        client: ClientSettings {
            id: partial
                .client
                .and_then(|c| c.id)
                .unwrap_or(default.client.id),
        },
        logging: LoggingSettings {
            level: partial
                .logging
                .and_then(|l| l.level)
                .unwrap_or(default.logging.level),
        },
    };

    validate(&settings)?;
    Ok(settings)
}

fn validate(settings: &Settings) -> Result<(), ConfigError> {
    if settings.delivery.request_timeout_ms == 0 {
        return Err(ConfigError::Message(
            "delivery.request_timeout_ms must be greater than zero".to_string(),
        ));
    }
    Url::parse(&settings.broker.base_url).map_err(|e| {
        ConfigError::Message(format!(
            "invalid broker.base_url '{}': {e}",
            settings.broker.base_url
        ))
    })?;
    Ok(())
}
