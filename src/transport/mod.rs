//! The `transport` module is responsible for the network calls a publisher
//! makes against the broker.
//!
//! It defines the request envelopes sent to the broker's publish and release
//! endpoints, the `BrokerTransport` seam the delivery layer talks to, and an
//! HTTP implementation of that seam.

pub mod http;
pub mod message;

use async_trait::async_trait;

use crate::utils::error::TransportError;

pub use http::HttpTransport;
pub use message::{PublishReply, PublishRequest, ReleaseRequest};

/// The two broker endpoints a publisher consumes.
///
/// Implementations perform exactly one network call per method invocation
/// and never retry on their own; retry policy belongs to the caller.
#[async_trait]
pub trait BrokerTransport: Send + Sync {
    /// Sends one publish attempt and reports how the broker answered.
    async fn publish(&self, request: &PublishRequest<'_>) -> Result<PublishReply, TransportError>;

    /// Asks the broker to drop the dedupe record for a request id.
    async fn release(&self, request: &ReleaseRequest<'_>) -> Result<(), TransportError>;
}
