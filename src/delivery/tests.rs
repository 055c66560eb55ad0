use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::{
    AttemptOutcome, DeliveryConfig, DeliveryMode, IdempotencyKey, MessageIntent, Next,
    PublishStatus, Publisher, RetryState,
};
use crate::transport::{BrokerTransport, PublishReply, PublishRequest, ReleaseRequest};
use crate::utils::error::{DeliveryError, TransportError};

#[derive(Debug, Clone, Copy)]
enum Reply {
    Success,
    Fail,
    /// Never answers; the publisher's timeout has to fire.
    Hang,
    /// Connection-level failure.
    Broken,
}

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Publish(Option<String>),
    Release(String),
}

/// Answers publish attempts from a script and records every call.
#[derive(Default)]
struct ScriptedBroker {
    script: Mutex<VecDeque<Reply>>,
    calls: Mutex<Vec<Call>>,
    fail_release: bool,
    /// Release calls never answer.
    hang_release: bool,
}

impl ScriptedBroker {
    fn new(script: &[Reply]) -> Self {
        Self {
            script: Mutex::new(script.iter().copied().collect()),
            ..Default::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn publish_ids(&self) -> Vec<Option<String>> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Publish(id) => Some(id),
                Call::Release(_) => None,
            })
            .collect()
    }

    fn releases(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Release(id) => Some(id),
                Call::Publish(_) => None,
            })
            .collect()
    }
}

#[async_trait]
impl BrokerTransport for ScriptedBroker {
    async fn publish(&self, request: &PublishRequest<'_>) -> Result<PublishReply, TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Publish(request.request_id.map(|k| k.to_string())));
        // An exhausted script keeps succeeding.
        let reply = self.script.lock().unwrap().pop_front().unwrap_or(Reply::Success);
        match reply {
            Reply::Success => Ok(PublishReply::Accepted("success".to_string())),
            Reply::Fail => Ok(PublishReply::Rejected),
            Reply::Hang => std::future::pending().await,
            Reply::Broken => Err(TransportError::Status(503)),
        }
    }

    async fn release(&self, request: &ReleaseRequest<'_>) -> Result<(), TransportError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Release(request.request_id.to_string()));
        if self.hang_release {
            std::future::pending::<()>().await;
        }
        if self.fail_release {
            Err(TransportError::Status(500))
        } else {
            Ok(())
        }
    }
}

fn intent() -> MessageIntent {
    MessageIntent::new("traffic", "road closed")
        .with_radius(3)
        .with_lifetime_minutes(10)
        .with_location(45.0, 7.6)
}

fn publisher(broker: &Arc<ScriptedBroker>, retry_limit: u32) -> Publisher<ScriptedBroker> {
    Publisher::with_shared_transport(
        broker.clone(),
        "tester@example.com",
        DeliveryConfig {
            request_timeout: Duration::from_millis(3000),
            retry_limit,
            retry_backoff: Duration::ZERO,
        },
    )
}

#[test]
fn test_default_delivery_config() {
    let config = DeliveryConfig::default();
    assert_eq!(config.request_timeout, Duration::from_millis(3000));
    assert_eq!(config.retry_limit, 5);
    assert!(config.retry_backoff.is_zero());
}

#[test]
fn test_mode_rules() {
    assert!(!DeliveryMode::AtLeastOnce.uses_idempotency_key());
    assert!(DeliveryMode::AtMostOnce.uses_idempotency_key());
    assert!(DeliveryMode::ExactlyOnce.uses_idempotency_key());

    assert!(DeliveryMode::AtMostOnce.bounds_timeouts());
    assert!(!DeliveryMode::ExactlyOnce.bounds_timeouts());

    assert!(DeliveryMode::ExactlyOnce.releases_on_success());
    assert!(!DeliveryMode::AtMostOnce.releases_on_success());
}

#[test]
fn test_mode_parsing() {
    assert_eq!(
        "at-least-once".parse::<DeliveryMode>(),
        Ok(DeliveryMode::AtLeastOnce)
    );
    assert_eq!(
        "AT_MOST_ONCE".parse::<DeliveryMode>(),
        Ok(DeliveryMode::AtMostOnce)
    );
    assert_eq!(
        "ExactlyOnce".parse::<DeliveryMode>(),
        Ok(DeliveryMode::ExactlyOnce)
    );
    assert!("twice".parse::<DeliveryMode>().is_err());
    assert_eq!(DeliveryMode::ExactlyOnce.to_string(), "exactly-once");
}

#[test]
fn test_retry_state_explicit_fail_never_exhausts() {
    let mut state = RetryState::new(2);
    for _ in 0..100 {
        state.begin_attempt();
        assert_eq!(
            state.record(DeliveryMode::AtMostOnce, AttemptOutcome::ExplicitFail),
            Next::Retry
        );
    }
    assert_eq!(state.attempts(), 100);
    assert_eq!(state.timeouts(), 0);
    assert_eq!(state.status(), PublishStatus::ExplicitFail);
}

#[test]
fn test_retry_state_timeout_ceiling_only_in_at_most_once() {
    let mut state = RetryState::new(3);
    for _ in 0..10 {
        assert_eq!(
            state.record(DeliveryMode::ExactlyOnce, AttemptOutcome::Timeout),
            Next::Retry
        );
    }
    assert_eq!(state.timeouts(), 0);

    let mut state = RetryState::new(3);
    assert_eq!(state.record(DeliveryMode::AtMostOnce, AttemptOutcome::Timeout), Next::Retry);
    assert_eq!(state.record(DeliveryMode::AtMostOnce, AttemptOutcome::Timeout), Next::Retry);
    assert_eq!(
        state.record(DeliveryMode::AtMostOnce, AttemptOutcome::Timeout),
        Next::Exhausted
    );
    assert_eq!(state.status(), PublishStatus::Exhausted);
}

#[test]
fn test_retry_state_status_follows_latest_attempt() {
    let mut state = RetryState::new(5);
    assert_eq!(state.status(), PublishStatus::Pending);

    state.begin_attempt();
    state.record(DeliveryMode::ExactlyOnce, AttemptOutcome::Timeout);
    assert_eq!(state.status(), PublishStatus::Timeout);

    state.begin_attempt();
    assert_eq!(state.status(), PublishStatus::Pending);
    assert_eq!(
        state.record(DeliveryMode::ExactlyOnce, AttemptOutcome::Success),
        Next::Complete
    );
    assert_eq!(state.status(), PublishStatus::Success);
    assert_eq!(state.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_at_least_once_retries_until_success_without_key() {
    let broker = Arc::new(ScriptedBroker::new(&[
        Reply::Fail,
        Reply::Hang,
        Reply::Fail,
        Reply::Hang,
        Reply::Success,
    ]));

    let delivered = publisher(&broker, 5)
        .publish(&intent(), DeliveryMode::AtLeastOnce)
        .await
        .expect("publish should complete");

    assert_eq!(delivered.attempts, 5);
    assert!(delivered.request_id.is_none());
    assert!(delivered.release.is_none());
    assert!(broker.publish_ids().iter().all(Option::is_none));
    assert!(broker.releases().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_at_least_once_ignores_retry_limit() {
    let mut script = vec![Reply::Hang; 12];
    script.push(Reply::Success);
    let broker = Arc::new(ScriptedBroker::new(&script));

    let delivered = publisher(&broker, 2)
        .publish(&intent(), DeliveryMode::AtLeastOnce)
        .await
        .expect("publish should complete");

    assert_eq!(delivered.attempts, 13);
}

#[tokio::test(start_paused = true)]
async fn test_at_most_once_exhausts_after_retry_limit_timeouts() {
    let broker = Arc::new(ScriptedBroker::new(&[Reply::Hang; 10]));

    let err = publisher(&broker, 5)
        .publish(&intent(), DeliveryMode::AtMostOnce)
        .await
        .expect_err("publish should give up");

    match err {
        DeliveryError::Exhausted {
            attempts,
            request_id,
        } => {
            assert_eq!(attempts, 5);
            assert!(request_id.is_some());
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(broker.publish_ids().len(), 5);
    assert!(broker.releases().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_at_most_once_succeeds_on_last_allowed_attempt() {
    let broker = Arc::new(ScriptedBroker::new(&[
        Reply::Hang,
        Reply::Hang,
        Reply::Hang,
        Reply::Hang,
        Reply::Success,
    ]));

    let delivered = publisher(&broker, 5)
        .publish(&intent(), DeliveryMode::AtMostOnce)
        .await
        .expect("publish should complete");

    assert_eq!(delivered.attempts, 5);
    assert!(delivered.release.is_none());

    let ids = broker.publish_ids();
    let key = delivered.request_id.map(IdempotencyKey::into_inner);
    assert!(key.is_some());
    assert!(ids.iter().all(|id| *id == key));
}

#[tokio::test(start_paused = true)]
async fn test_at_most_once_explicit_failures_do_not_count() {
    let mut script = vec![Reply::Fail; 50];
    script.push(Reply::Hang);
    script.push(Reply::Success);
    let broker = Arc::new(ScriptedBroker::new(&script));

    let delivered = publisher(&broker, 2)
        .publish(&intent(), DeliveryMode::AtMostOnce)
        .await
        .expect("publish should complete");

    assert_eq!(delivered.attempts, 52);
}

#[tokio::test(start_paused = true)]
async fn test_exactly_once_releases_once_after_success() {
    let broker = Arc::new(ScriptedBroker::new(&[
        Reply::Fail,
        Reply::Hang,
        Reply::Success,
    ]));

    let delivered = publisher(&broker, 1)
        .publish(&intent(), DeliveryMode::ExactlyOnce)
        .await
        .expect("publish should complete");

    assert_eq!(delivered.attempts, 3);
    let key = delivered
        .request_id
        .clone()
        .expect("exactly-once carries a key")
        .into_inner();

    delivered
        .release
        .expect("exactly-once spawns a release")
        .wait()
        .await;

    assert_eq!(
        broker.calls(),
        vec![
            Call::Publish(Some(key.clone())),
            Call::Publish(Some(key.clone())),
            Call::Publish(Some(key.clone())),
            Call::Release(key),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_exactly_once_swallows_release_failure() {
    let broker = Arc::new(ScriptedBroker {
        fail_release: true,
        ..ScriptedBroker::new(&[Reply::Success])
    });

    let delivered = publisher(&broker, 5)
        .publish(&intent(), DeliveryMode::ExactlyOnce)
        .await
        .expect("release failures are not reported");

    delivered.release.expect("release spawned").wait().await;
    assert_eq!(broker.releases().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_exactly_once_does_not_wait_for_release() {
    let broker = Arc::new(ScriptedBroker {
        hang_release: true,
        ..ScriptedBroker::new(&[Reply::Fail, Reply::Success])
    });

    let delivered = tokio::time::timeout(
        Duration::from_secs(60),
        publisher(&broker, 5).publish(&intent(), DeliveryMode::ExactlyOnce),
    )
    .await
    .expect("publish must not wait for the release call")
    .expect("publish should complete");

    assert_eq!(delivered.attempts, 2);
    let release = delivered.release.expect("release spawned");

    // Let the spawned release reach the broker; it never answers.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
    assert_eq!(broker.releases().len(), 1);
    assert!(!release.is_finished());
}

#[tokio::test(start_paused = true)]
async fn test_transport_failure_is_terminal() {
    let broker = Arc::new(ScriptedBroker::new(&[Reply::Fail, Reply::Broken]));

    let err = publisher(&broker, 5)
        .publish(&intent(), DeliveryMode::ExactlyOnce)
        .await
        .expect_err("broken transport ends the publish");

    assert!(matches!(
        err,
        DeliveryError::Transport {
            attempts: 2,
            source: TransportError::Status(503)
        }
    ));
    assert!(broker.releases().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_logical_publishes_use_distinct_keys() {
    let broker = Arc::new(ScriptedBroker::new(&[]));
    let publisher = publisher(&broker, 5);

    let first = publisher
        .publish(&intent(), DeliveryMode::AtMostOnce)
        .await
        .expect("first publish");
    let second = publisher
        .publish(&intent(), DeliveryMode::AtMostOnce)
        .await
        .expect("second publish");

    assert_ne!(first.request_id, second.request_id);
}

#[tokio::test(start_paused = true)]
async fn test_backoff_delays_retries() {
    let broker = Arc::new(ScriptedBroker::new(&[Reply::Fail, Reply::Fail]));
    let publisher = Publisher::with_shared_transport(
        broker.clone(),
        "tester",
        DeliveryConfig {
            retry_backoff: Duration::from_millis(250),
            ..DeliveryConfig::default()
        },
    );

    let started = tokio::time::Instant::now();
    let delivered = publisher
        .publish(&intent(), DeliveryMode::AtLeastOnce)
        .await
        .expect("publish should complete");

    assert_eq!(delivered.attempts, 3);
    assert!(started.elapsed() >= Duration::from_millis(500));
}
