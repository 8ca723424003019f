//! Message queue access
//!
//! [`JobQueue`] covers the calls the worker and the submission API make
//! against the queue service. [`sqs::SqsQueue`] implements it with the AWS SDK.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use zipper_common::types::DeliveryMetadata;

pub mod sqs;

pub use sqs::SqsQueue;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Queue {operation} failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },

    #[error("Queue response missing field: {0}")]
    MissingField(&'static str),

    #[error("Invalid queue attribute {name}: {value}")]
    InvalidAttribute { name: &'static str, value: String },
}

impl QueueError {
    pub fn request(operation: &'static str, message: impl Into<String>) -> Self {
        QueueError::Request {
            operation,
            message: message.into(),
        }
    }
}

/// One delivered message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
    pub receive_count: u32,
}

impl QueueMessage {
    pub fn delivery(&self) -> DeliveryMetadata {
        DeliveryMetadata::new(&self.message_id, &self.receipt_handle, self.receive_count)
    }
}

/// Parameters of a single long-poll receive call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiveRequest {
    pub max_messages: i32,
    pub wait_time_secs: i32,
    pub visibility_timeout_secs: i32,
}

/// Queue limits learned once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueAttributes {
    /// Largest message body the queue accepts, in bytes
    pub max_message_size: Option<usize>,
    /// `maxReceiveCount` from the redrive policy
    pub max_receive_count: Option<u32>,
}

impl QueueAttributes {
    /// Build from the raw attribute strings the queue returns.
    pub fn from_raw(
        max_message_size: Option<&str>,
        redrive_policy: Option<&str>,
    ) -> Result<Self, QueueError> {
        let max_message_size = max_message_size
            .map(|raw| {
                raw.trim()
                    .parse::<usize>()
                    .map_err(|_| QueueError::InvalidAttribute {
                        name: "MaximumMessageSize",
                        value: raw.to_string(),
                    })
            })
            .transpose()?;

        let max_receive_count = redrive_policy
            .filter(|raw| !raw.trim().is_empty())
            .map(parse_max_receive_count)
            .transpose()?;

        Ok(Self {
            max_message_size,
            max_receive_count,
        })
    }
}

/// `maxReceiveCount` may arrive as a JSON number or a numeric string.
fn parse_max_receive_count(raw: &str) -> Result<u32, QueueError> {
    let invalid = || QueueError::InvalidAttribute {
        name: "RedrivePolicy",
        value: raw.to_string(),
    };

    let policy: serde_json::Value = serde_json::from_str(raw).map_err(|_| invalid())?;

    match policy.get("maxReceiveCount") {
        Some(serde_json::Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(invalid),
        Some(serde_json::Value::String(s)) => s.trim().parse().map_err(|_| invalid()),
        _ => Err(invalid()),
    }
}

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Long-poll for up to `request.max_messages` messages.
    async fn receive(&self, request: &ReceiveRequest) -> Result<Vec<QueueMessage>, QueueError>;

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError>;

    /// Enqueue a body verbatim, returning the queue-assigned message id.
    async fn send(&self, body: &str) -> Result<String, QueueError>;

    async fn attributes(&self) -> Result<QueueAttributes, QueueError>;

    async fn change_visibility(
        &self,
        receipt_handle: &str,
        timeout: Duration,
    ) -> Result<(), QueueError>;
}
