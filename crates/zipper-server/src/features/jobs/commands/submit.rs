//! Submit job command
//!
//! Validates a raw job body and enqueues it unchanged. Nothing is fetched or
//! checked against the object store here; the worker does that when the
//! message is received.

use serde::{Deserialize, Serialize};
use zipper_common::types::JobPayload;

use crate::error::AppError;
use crate::queue::{JobQueue, QueueAttributes};

/// Raw request body, enqueued verbatim when valid
#[derive(Debug, Clone)]
pub struct SubmitJobCommand {
    pub body: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitJobResponse {
    /// Queue-assigned message id
    pub id: String,
}

impl SubmitJobCommand {
    pub fn new(body: impl Into<String>) -> Self {
        Self { body: body.into() }
    }

    /// Check the payload shape and the queue's message size limit.
    #[tracing::instrument(skip_all, fields(bytes = self.body.len()))]
    pub fn validate(&self, limits: &QueueAttributes) -> Result<JobPayload, AppError> {
        let payload = JobPayload::from_json(&self.body)?;
        payload.validate()?;

        if let Some(limit) = limits.max_message_size {
            if self.body.len() > limit {
                return Err(AppError::PayloadTooLarge {
                    size: self.body.len(),
                    limit,
                });
            }
        }

        tracing::debug!("Command validation passed");
        Ok(payload)
    }
}

pub async fn handle(
    queue: &dyn JobQueue,
    limits: &QueueAttributes,
    command: SubmitJobCommand,
) -> Result<SubmitJobResponse, AppError> {
    let payload = command.validate(limits)?;

    let id = queue.send(&command.body).await?;

    tracing::info!(
        id = %id,
        files = payload.files.len(),
        notifications = payload.notifications.len(),
        "Job enqueued"
    );

    Ok(SubmitJobResponse { id })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body() -> serde_json::Value {
        json!({
            "credentials": {"accessKeyId": "AKIA1234", "secretAccessKey": "s", "region": "us-east-1"},
            "files": ["bucketA/x.txt"],
            "destination": "bucketB/out.zip"
        })
    }

    #[test]
    fn test_validate_accepts_valid_body() {
        let command = SubmitJobCommand::new(body().to_string());
        let payload = command.validate(&QueueAttributes::default()).unwrap();
        assert_eq!(payload.files, vec!["bucketA/x.txt"]);
    }

    #[test]
    fn test_validate_rejects_missing_credentials() {
        let mut value = body();
        value.as_object_mut().unwrap().remove("credentials");
        let err = SubmitJobCommand::new(value.to_string())
            .validate(&QueueAttributes::default())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_validate_rejects_invalid_json() {
        let err = SubmitJobCommand::new("{not json")
            .validate(&QueueAttributes::default())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_validate_enforces_max_message_size() {
        let command = SubmitJobCommand::new(body().to_string());
        let limits = QueueAttributes {
            max_message_size: Some(16),
            max_receive_count: None,
        };
        assert!(matches!(
            command.validate(&limits),
            Err(AppError::PayloadTooLarge { limit: 16, .. })
        ));
    }
}
