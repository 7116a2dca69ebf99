use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::BehaviorVersion;
use aws_sdk_sqs::error::DisplayErrorContext;
use aws_sdk_sqs::types::MessageAttributeValue;
use aws_sdk_sqs::Client;
use invoicer_core::OperationContext;

use crate::error::QueueError;
use crate::notification_queue::{NotificationQueue, QueueMessage};

/// Amazon SQS notification queue
///
/// Dead letters are re-sent to `dlq_url` with a `reason` message attribute. Without a
/// DLQ the message body is logged at error level before the caller deletes it.
#[derive(Clone)]
pub struct SqsQueue {
    client: Client,
    queue_url: String,
    dlq_url: Option<String>,
    wait_time_seconds: i32,
}

impl SqsQueue {
    /// Create a new SqsQueue
    ///
    /// # Arguments
    /// * `queue_url` - URL of the queue receiving object-created notifications
    /// * `dlq_url` - Optional dead-letter queue URL
    /// * `region` - AWS region; falls back to the default provider chain when `None`
    /// * `endpoint_url` - Optional custom endpoint (e.g. "http://localhost:4566" for LocalStack)
    /// * `wait_time_seconds` - Long-poll duration for each receive (0 = short poll)
    pub async fn new(
        queue_url: String,
        dlq_url: Option<String>,
        region: Option<String>,
        endpoint_url: Option<String>,
        wait_time_seconds: i32,
    ) -> Result<Self, QueueError> {
        if queue_url.is_empty() {
            return Err(QueueError::Config("Queue URL is empty".to_string()));
        }

        let region_provider = RegionProviderChain::first_try(region.map(aws_config::Region::new))
            .or_default_provider();

        let retry_config = RetryConfig::standard()
            .with_max_attempts(3)
            .with_retry_mode(RetryMode::Standard);

        let mut loader = aws_config::defaults(BehaviorVersion::latest())
            .region(region_provider)
            .retry_config(retry_config);

        if let Some(endpoint) = endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }

        let config = loader.load().await;

        Ok(SqsQueue {
            client: Client::new(&config),
            queue_url,
            dlq_url,
            wait_time_seconds,
        })
    }
}

#[async_trait]
impl NotificationQueue for SqsQueue {
    #[tracing::instrument(skip(self, ctx), fields(request_id = %ctx.request_id(), queue = %self.queue_url))]
    async fn receive_batch(
        &self,
        ctx: &OperationContext,
        max_messages: i32,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let output = self
            .client
            .receive_message()
            .queue_url(&self.queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(self.wait_time_seconds)
            .send()
            .await
            .map_err(|e| QueueError::Receive(DisplayErrorContext(&e).to_string()))?;

        let messages: Vec<QueueMessage> = output
            .messages()
            .iter()
            .filter_map(|m| {
                let receipt_handle = m.receipt_handle()?.to_string();
                Some(QueueMessage {
                    message_id: m.message_id().unwrap_or_default().to_string(),
                    receipt_handle,
                    body: m.body().unwrap_or_default().to_string(),
                })
            })
            .collect();

        tracing::debug!(count = messages.len(), "Received notification batch");
        Ok(messages)
    }

    #[tracing::instrument(skip(self, ctx, receipt_handle), fields(request_id = %ctx.request_id()))]
    async fn delete_message(
        &self,
        ctx: &OperationContext,
        receipt_handle: &str,
    ) -> Result<(), QueueError> {
        self.client
            .delete_message()
            .queue_url(&self.queue_url)
            .receipt_handle(receipt_handle)
            .send()
            .await
            .map_err(|e| QueueError::Delete(DisplayErrorContext(&e).to_string()))?;

        Ok(())
    }

    #[tracing::instrument(skip(self, ctx, message), fields(request_id = %ctx.request_id(), message_id = %message.message_id))]
    async fn dead_letter(
        &self,
        ctx: &OperationContext,
        message: &QueueMessage,
        reason: &str,
    ) -> Result<(), QueueError> {
        let Some(dlq_url) = self.dlq_url.as_deref() else {
            tracing::error!(
                reason = %reason,
                body = %message.body,
                "Discarding poison message (no dead-letter queue configured)"
            );
            return Ok(());
        };

        let reason_attribute = MessageAttributeValue::builder()
            .data_type("String")
            .string_value(reason)
            .build()
            .map_err(|e| QueueError::DeadLetter(e.to_string()))?;

        self.client
            .send_message()
            .queue_url(dlq_url)
            .message_body(&message.body)
            .message_attributes("reason", reason_attribute)
            .send()
            .await
            .map_err(|e| QueueError::DeadLetter(DisplayErrorContext(&e).to_string()))?;

        tracing::warn!(reason = %reason, "Poison message moved to dead-letter queue");
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqs"
    }
}
