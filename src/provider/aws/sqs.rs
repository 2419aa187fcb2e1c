//! SQS queue client

use crate::error::{Result, TrailError};
use crate::provider::QueueClient;
use crate::types::ReceivedMessage;
use async_trait::async_trait;
use aws_sdk_sqs::error::DisplayErrorContext;

/// SQS hard limit on messages per `ReceiveMessage`
const MAX_RECEIVE: usize = 10;

/// `QueueClient` backed by one SQS queue URL
pub struct SqsQueue {
    client: aws_sdk_sqs::Client,
    queue_url: String,
}

impl SqsQueue {
    pub fn new(sdk_config: &aws_config::SdkConfig, queue_url: impl Into<String>) -> Self {
        Self {
            client: aws_sdk_sqs::Client::new(sdk_config),
            queue_url: queue_url.into(),
        }
    }

    pub fn queue_url(&self) -> &str {
        &self.queue_url
    }
}

#[async_trait]
impl QueueClient for SqsQueue {
    async fn receive(&self, max_messages: usize) -> Result<Vec<ReceivedMessage>> {
        let max = max_messages.clamp(1, MAX_RECEIVE) as i32;

        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max)
            .send()
            .await
            .map_err(|e| {
                TrailError::Receive(format!("{}: {}", self.queue_url, DisplayErrorContext(&e)))
            })?;

        let messages = output
            .messages()
            .iter()
            .filter_map(|m| {
                let message_id = m.message_id().unwrap_or_default().to_string();
                let Some(receipt_handle) = m.receipt_handle() else {
                    tracing::warn!(
                        message_id = %message_id,
                        "Message without receipt handle, skipping"
                    );
                    return None;
                };
                Some(ReceivedMessage {
                    message_id,
                    receipt_handle: receipt_handle.to_string(),
                    body: m.body().unwrap_or_default().to_string(),
                })
            })
            .collect();

        Ok(messages)
    }

    async fn send(&self, body: &str) -> Result<()> {
        let output = self
            .client
            .send_message()
            .queue_url(&self.queue_url)
            .message_body(body)
            .send()
            .await
            .map_err(|e| {
                TrailError::Send(format!("{}: {}", self.queue_url, DisplayErrorContext(&e)))
            })?;

        tracing::debug!(
            message_id = output.message_id().unwrap_or_default(),
            "Message sent"
        );
        Ok(())
    }

    async fn delete(&self, receipt_handle: &str) -> Result<()> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| {
                TrailError::Delete(format!("{}: {}", self.queue_url, DisplayErrorContext(&e)))
            })?;
        Ok(())
    }
}
