//! Wire envelopes for the broker's HTTP endpoints.
//!
//! The broker expects PascalCase keys, and reads `Radius` and `LifeTime` as
//! decimal strings. Replies to a publish are a JSON string where `"fail"`
//! marks a rejected message.

use std::fmt::Display;

use serde::{Serialize, Serializer};

use crate::delivery::{IdempotencyKey, MessageIntent};

/// Token the broker returns when it could not accept a publish.
pub const FAILURE_TOKEN: &str = "fail";

/// Body of one publish attempt. Rebuilt from the intent for every attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PublishRequest<'a> {
    #[serde(rename = "Message")]
    pub message: &'a str,
    #[serde(rename = "Topic")]
    pub topic: &'a str,
    #[serde(rename = "Radius", serialize_with = "as_string")]
    pub radius: u32,
    #[serde(rename = "LifeTime", serialize_with = "as_string")]
    pub lifetime: u32,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(rename = "Title", skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(rename = "RequestID", skip_serializing_if = "Option::is_none")]
    pub request_id: Option<&'a IdempotencyKey>,
}

impl<'a> PublishRequest<'a> {
    pub fn new(intent: &'a MessageIntent, request_id: Option<&'a IdempotencyKey>) -> Self {
        Self {
            message: &intent.body,
            topic: &intent.topic,
            radius: intent.radius,
            lifetime: intent.lifetime_minutes,
            latitude: intent.latitude,
            longitude: intent.longitude,
            title: intent.title.as_deref(),
            request_id,
        }
    }
}

/// Body of the exactly-once cleanup call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReleaseRequest<'a> {
    #[serde(rename = "RequestID")]
    pub request_id: &'a IdempotencyKey,
}

/// How the broker answered a publish that did reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishReply {
    /// Opaque success payload, usually `"success"`.
    Accepted(String),
    Rejected,
}

impl PublishReply {
    /// Classifies a response body. Both `"fail"` (JSON) and a bare `fail`
    /// are the failure token; everything else is a success payload.
    pub fn from_body(body: &str) -> Self {
        let trimmed = body.trim();
        let text = serde_json::from_str::<String>(trimmed).unwrap_or_else(|_| trimmed.to_string());
        if text == FAILURE_TOKEN {
            PublishReply::Rejected
        } else {
            PublishReply::Accepted(text)
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, PublishReply::Rejected)
    }
}

fn as_string<T: Display, S: Serializer>(value: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}
