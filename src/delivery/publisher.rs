//! Delivery controller
//!
//! `Publisher` runs one sequential retry loop per logical publish:
//! - exactly one request is in flight at a time; a retry starts only after
//!   the previous attempt resolved (reply or timeout)
//! - the per-attempt timeout applies to each request, not to the whole loop
//! - the idempotency key, when the mode needs one, is generated once before
//!   the first send and reused by every retry
//! - in exactly-once mode a confirmed publish spawns a best-effort release
//!   call that the loop does not wait for
//!
//! Concurrent publishes through the same `Publisher` share only the
//! transport; each call owns its own `RetryState` and key.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::delivery::state::{AttemptOutcome, Next, RetryState};
use crate::delivery::{DeliveryMode, IdempotencyKey, MessageIntent};
use crate::transport::{BrokerTransport, PublishReply, PublishRequest, ReleaseRequest};
use crate::utils::error::{DeliveryError, TransportError};

/// Tunables for the retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryConfig {
    /// How long a single attempt may take before it counts as a timeout.
    pub request_timeout: Duration,
    /// Timeout ceiling, consulted only in at-most-once mode.
    pub retry_limit: u32,
    /// Pause before each retry. Zero retries immediately.
    pub retry_backoff: Duration,
}

impl DeliveryConfig {
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(3000);
    pub const DEFAULT_RETRY_LIMIT: u32 = 5;
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            request_timeout: Self::DEFAULT_REQUEST_TIMEOUT,
            retry_limit: Self::DEFAULT_RETRY_LIMIT,
            retry_backoff: Duration::ZERO,
        }
    }
}

/// Report for a publish the broker confirmed.
#[derive(Debug)]
pub struct Delivered {
    /// Publish requests sent, including the successful one.
    pub attempts: u32,
    pub request_id: Option<IdempotencyKey>,
    /// The release call spawned in exactly-once mode.
    pub release: Option<ReleaseHandle>,
}

/// Handle to a fire-and-forget release call.
///
/// Dropping it does not cancel the call.
#[derive(Debug)]
pub struct ReleaseHandle {
    handle: JoinHandle<()>,
}

impl ReleaseHandle {
    /// Waits for the release call to finish. Its outcome is never reported.
    pub async fn wait(self) {
        let _ = self.handle.await;
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

#[derive(Debug)]
pub struct Publisher<T> {
    transport: Arc<T>,
    client_id: String,
    config: DeliveryConfig,
}

impl<T> Clone for Publisher<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            client_id: self.client_id.clone(),
            config: self.config.clone(),
        }
    }
}

impl<T: BrokerTransport + 'static> Publisher<T> {
    /// `client_id` is the stable prefix of generated idempotency keys, e.g.
    /// the submitter's address.
    pub fn new(transport: T, client_id: impl Into<String>, config: DeliveryConfig) -> Self {
        Self::with_shared_transport(Arc::new(transport), client_id, config)
    }

    pub fn with_shared_transport(
        transport: Arc<T>,
        client_id: impl Into<String>,
        config: DeliveryConfig,
    ) -> Self {
        Self {
            transport,
            client_id: client_id.into(),
            config,
        }
    }

    pub fn config(&self) -> &DeliveryConfig {
        &self.config
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Drives one logical publish of `intent` to completion under `mode`.
    ///
    /// Returns once the broker confirmed the message, or with
    /// `DeliveryError::Exhausted` when at-most-once reaches its timeout
    /// ceiling. Explicit failures are always retried. Transport failures
    /// other than timeouts end the publish without retrying.
    pub async fn publish(
        &self,
        intent: &MessageIntent,
        mode: DeliveryMode,
    ) -> Result<Delivered, DeliveryError> {
        let request_id = mode
            .uses_idempotency_key()
            .then(|| IdempotencyKey::generate(&self.client_id));
        let mut state = RetryState::new(self.config.retry_limit);

        loop {
            let request = PublishRequest::new(intent, request_id.as_ref());
            state.begin_attempt();
            debug!(
                "publishing to '{}' ({mode}), attempt {}",
                intent.topic,
                state.attempts()
            );

            let outcome = match self.attempt(&request).await {
                Ok(outcome) => outcome,
                Err(source) => {
                    warn!("publish to '{}' failed: {source}", intent.topic);
                    return Err(DeliveryError::Transport {
                        attempts: state.attempts(),
                        source,
                    });
                }
            };

            match state.record(mode, outcome) {
                Next::Complete => break,
                Next::Exhausted => {
                    warn!(
                        "giving up on '{}' after {} timed out attempts ({:?})",
                        intent.topic,
                        state.timeouts(),
                        state.status()
                    );
                    return Err(DeliveryError::Exhausted {
                        attempts: state.attempts(),
                        request_id,
                    });
                }
                Next::Retry => {
                    if outcome == AttemptOutcome::Timeout {
                        warn!(
                            "publish to '{}' timed out after {:?}, retrying",
                            intent.topic, self.config.request_timeout
                        );
                    } else {
                        debug!("broker rejected publish to '{}', retrying", intent.topic);
                    }
                    if !self.config.retry_backoff.is_zero() {
                        tokio::time::sleep(self.config.retry_backoff).await;
                    }
                }
            }
        }

        info!(
            "message published to '{}' after {} attempt(s) ({:?})",
            intent.topic,
            state.attempts(),
            state.status()
        );

        let release = match (&request_id, mode.releases_on_success()) {
            (Some(key), true) => Some(self.spawn_release(key.clone())),
            _ => None,
        };

        Ok(Delivered {
            attempts: state.attempts(),
            request_id,
            release,
        })
    }

    /// Sends one request and maps the reply onto an attempt outcome.
    async fn attempt(&self, request: &PublishRequest<'_>) -> Result<AttemptOutcome, TransportError> {
        let reply =
            tokio::time::timeout(self.config.request_timeout, self.transport.publish(request)).await;
        match reply {
            Err(_) => Ok(AttemptOutcome::Timeout),
            Ok(Ok(PublishReply::Accepted(_))) => Ok(AttemptOutcome::Success),
            Ok(Ok(PublishReply::Rejected)) => Ok(AttemptOutcome::ExplicitFail),
            Ok(Err(e)) if e.is_timeout() => Ok(AttemptOutcome::Timeout),
            Ok(Err(e)) => Err(e),
        }
    }

    fn spawn_release(&self, key: IdempotencyKey) -> ReleaseHandle {
        let transport = self.transport.clone();
        let handle = tokio::spawn(async move {
            let request = ReleaseRequest { request_id: &key };
            match transport.release(&request).await {
                Ok(()) => debug!("released request {key}"),
                Err(e) => warn!("failed to release request {key}: {e}"),
            }
        });
        ReleaseHandle { handle }
    }
}
