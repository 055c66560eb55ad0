//! Idempotency keys
//!
//! A key is the stable client identifier followed by the creation time in
//! milliseconds since the UNIX epoch. It is generated once per logical
//! publish and reused verbatim by every retry, so the broker can recognize
//! repeated attempts as one delivery.

use std::fmt;
use std::sync::atomic::{AtomicI64, Ordering};

use serde::Serialize;

/// Last timestamp handed out by `IdempotencyKey::generate` in this process.
static LAST_STAMP: AtomicI64 = AtomicI64::new(0);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Generates the key for a new logical publish.
    ///
    /// Timestamps are strictly increasing within a process, so two publishes
    /// started within the same millisecond still get distinct keys.
    pub fn generate(client_id: &str) -> Self {
        Self::from_parts(client_id, next_stamp(chrono::Utc::now().timestamp_millis()))
    }

    pub fn from_parts(client_id: &str, created_at_millis: i64) -> Self {
        Self(format!("{client_id}{created_at_millis}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for IdempotencyKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

fn next_stamp(now: i64) -> i64 {
    let mut stamp = now;
    // fetch_update only fails when the closure returns None, which it never does
    let _ = LAST_STAMP.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
        stamp = if now > last { now } else { last + 1 };
        Some(stamp)
    });
    stamp
}
