//! The `error` module defines the error types used within `popsub_delivery`.
//!
//! `TransportError` describes why a single network call did not produce a
//! usable reply. `DeliveryError` is what a logical publish reports to its
//! caller when it ends without the broker confirming the message.

use thiserror::Error;

use crate::delivery::IdempotencyKey;

/// Failure of one request against the broker.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The broker answered with a non-success HTTP status.
    #[error("broker responded with status {0}")]
    Status(u16),
}

impl TransportError {
    /// Whether the client gave up waiting, so the broker may or may not
    /// have processed the request.
    pub fn is_timeout(&self) -> bool {
        match self {
            TransportError::Http(e) => e.is_timeout(),
            TransportError::Status(_) => false,
        }
    }
}

/// Terminal failure of a logical publish.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// At-most-once only: the timeout ceiling was reached. The message may
    /// not have been delivered.
    #[error("gave up after {attempts} timed out attempts")]
    Exhausted {
        attempts: u32,
        request_id: Option<IdempotencyKey>,
    },

    /// A non-timeout transport failure. These are not retried.
    #[error("transport failure after {attempts} attempts: {source}")]
    Transport {
        attempts: u32,
        #[source]
        source: TransportError,
    },
}

impl DeliveryError {
    /// Number of publish attempts issued before the publish ended.
    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryError::Exhausted { attempts, .. } => *attempts,
            DeliveryError::Transport { attempts, .. } => *attempts,
        }
    }
}
