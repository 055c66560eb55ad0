//! The `delivery` module drives a single "publish this message" intent to
//! completion against the broker, honoring one of three delivery guarantees.
//!
//! - `mode`: the selectable guarantees and their per-mode rules.
//! - `intent`: the immutable message a caller wants published.
//! - `key`: idempotency keys shared by every retry of one logical publish.
//! - `state`: per-publish retry bookkeeping and the retry decision.
//! - `publisher`: the retry loop itself plus the exactly-once release step.

pub mod intent;
pub mod key;
pub mod mode;
pub mod publisher;
pub mod state;

pub use intent::MessageIntent;
pub use key::IdempotencyKey;
pub use mode::{DeliveryMode, ParseModeError};
pub use publisher::{Delivered, DeliveryConfig, Publisher, ReleaseHandle};
pub use state::{AttemptOutcome, Next, PublishStatus, RetryState};

#[cfg(test)]
mod tests;
