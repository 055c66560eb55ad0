//! # PopSub Delivery
//!
//! `popsub_delivery` is the publishing side of a geofenced pub/sub broker.
//! It takes a single "publish this message" intent and drives it to
//! completion over a timeout-prone request/response channel, honoring one
//! of three delivery guarantees: at-least-once, at-most-once and
//! exactly-once.
//!
//! ## Core Modules
//!
//! - `delivery`: the retry loop, delivery modes, message intents and idempotency keys.
//! - `transport`: the broker endpoints as a trait, their wire envelopes and an HTTP client.
//! - `config`: loads publisher settings from files and environment variables.
//! - `utils`: error types and logging setup.

pub mod config;
pub mod delivery;
pub mod transport;
pub mod utils;

pub use delivery::{DeliveryConfig, DeliveryMode, MessageIntent, Publisher};
