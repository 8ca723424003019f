use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_sqs::{
    error::DisplayErrorContext,
    types::{Message, MessageSystemAttributeName, QueueAttributeName},
    Client,
};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{JobQueue, QueueAttributes, QueueError, QueueMessage, ReceiveRequest};
use crate::config::QueueConfig;

/// SQS-backed [`JobQueue`] bound to a single queue URL.
#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
}

impl SqsQueue {
    /// Build a client from the queue configuration.
    ///
    /// Static credentials are used when configured, otherwise the default
    /// AWS provider chain.
    pub async fn new(config: &QueueConfig) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());

        if let Some(region) = &config.region {
            loader = loader.region(Region::new(region.clone()));
        }

        if let Some(endpoint) = &config.endpoint {
            loader = loader.endpoint_url(endpoint);
        }

        if let (Some(access_key_id), Some(secret_access_key)) =
            (&config.access_key_id, &config.secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "zipper-queue",
            ));
        }

        let sdk_config = loader.load().await;

        info!(queue_url = %config.url, endpoint = ?config.endpoint, "Queue client initialized");

        Self {
            client: Client::new(&sdk_config),
            queue_url: config.url.clone(),
        }
    }
}

fn into_queue_message(message: &Message) -> Result<QueueMessage, QueueError> {
    let raw_count = message
        .attributes()
        .and_then(|attrs| attrs.get(&MessageSystemAttributeName::ApproximateReceiveCount));

    let receive_count = match raw_count.map(|count| count.trim().parse::<u32>()) {
        Some(Ok(count)) => count,
        Some(Err(_)) | None => {
            warn!(
                message_id = message.message_id().unwrap_or_default(),
                raw = ?raw_count,
                "Missing or unreadable ApproximateReceiveCount, assuming first delivery"
            );
            1
        },
    };

    Ok(QueueMessage {
        message_id: message
            .message_id()
            .ok_or(QueueError::MissingField("MessageId"))?
            .to_string(),
        receipt_handle: message
            .receipt_handle()
            .ok_or(QueueError::MissingField("ReceiptHandle"))?
            .to_string(),
        body: message.body().unwrap_or_default().to_string(),
        receive_count,
    })
}

#[async_trait]
impl JobQueue for SqsQueue {
    async fn receive(&self, request: &ReceiveRequest) -> Result<Vec<QueueMessage>, QueueError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(request.max_messages)
            .wait_time_seconds(request.wait_time_secs)
            .visibility_timeout(request.visibility_timeout_secs)
            .message_system_attribute_names(MessageSystemAttributeName::ApproximateReceiveCount)
            .send()
            .await
            .map_err(|e| QueueError::request("receive", DisplayErrorContext(&e).to_string()))?;

        let messages = output
            .messages()
            .iter()
            .filter_map(|message| match into_queue_message(message) {
                Ok(message) => Some(message),
                Err(e) => {
                    warn!("Skipping undeliverable message: {}", e);
                    None
                },
            })
            .collect::<Vec<_>>();

        debug!(count = messages.len(), "Received messages");
        Ok(messages)
    }

    async fn delete(&self, receipt_handle: &str) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| QueueError::request("delete", DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }

    async fn send(&self, body: &str) -> Result<String, QueueError> {
        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| QueueError::request("send", DisplayErrorContext(&e).to_string()))?;

        output
            .message_id()
            .map(str::to_string)
            .ok_or(QueueError::MissingField("MessageId"))
    }

    async fn attributes(&self) -> Result<QueueAttributes, QueueError> {
        let output = self
            .client
            .get_queue_attributes()
            .queue_url(&self.queue_url)
            .attribute_names(QueueAttributeName::MaximumMessageSize)
            .attribute_names(QueueAttributeName::RedrivePolicy)
            .send()
            .await
            .map_err(|e| {
                QueueError::request("get_attributes", DisplayErrorContext(&e).to_string())
            })?;

        let attributes = output.attributes();
        let lookup = |name: QueueAttributeName| {
            attributes
                .and_then(|attrs| attrs.get(&name))
                .map(String::as_str)
        };

        QueueAttributes::from_raw(
            lookup(QueueAttributeName::MaximumMessageSize),
            lookup(QueueAttributeName::RedrivePolicy),
        )
    }

    async fn change_visibility(
        &self,
        receipt_handle: &str,
        timeout: Duration,
    ) -> Result<(), QueueError> {
        let seconds = i32::try_from(timeout.as_secs()).unwrap_or(i32::MAX);

        self.client
            .change_message_visibility()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .visibility_timeout(seconds)
            .send()
            .await
            .map_err(|e| {
                QueueError::request("change_visibility", DisplayErrorContext(&e).to_string())
            })?;
        Ok(())
    }
}
