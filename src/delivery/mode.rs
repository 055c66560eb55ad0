use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Delivery guarantee requested for a logical publish.
///
/// - `AtLeastOnce`: retries until the broker confirms; duplicates are accepted.
/// - `AtMostOnce`: tags the message with an idempotency key and gives up after
///   a bounded number of timeouts.
/// - `ExactlyOnce`: tags the message with an idempotency key, retries until
///   confirmed, then asks the broker to release its dedupe record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeliveryMode {
    #[default]
    AtLeastOnce,
    AtMostOnce,
    ExactlyOnce,
}

impl DeliveryMode {
    /// Whether publishes in this mode carry a `RequestID`.
    pub fn uses_idempotency_key(self) -> bool {
        !matches!(self, DeliveryMode::AtLeastOnce)
    }

    /// Whether timeouts count against `retry_limit`.
    pub fn bounds_timeouts(self) -> bool {
        matches!(self, DeliveryMode::AtMostOnce)
    }

    /// Whether a confirmed publish is followed by a release request.
    pub fn releases_on_success(self) -> bool {
        matches!(self, DeliveryMode::ExactlyOnce)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DeliveryMode::AtLeastOnce => "at-least-once",
            DeliveryMode::AtMostOnce => "at-most-once",
            DeliveryMode::ExactlyOnce => "exactly-once",
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown delivery mode '{0}' (expected at-least-once, at-most-once or exactly-once)")]
pub struct ParseModeError(pub String);

impl FromStr for DeliveryMode {
    type Err = ParseModeError;

    /// Accepts kebab-case, snake_case or squashed spellings in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "atleastonce" => Ok(DeliveryMode::AtLeastOnce),
            "atmostonce" => Ok(DeliveryMode::AtMostOnce),
            "exactlyonce" => Ok(DeliveryMode::ExactlyOnce),
            _ => Err(ParseModeError(s.to_string())),
        }
    }
}
