//! Notification queue seam
//!
//! The consumer only needs three operations from the queue: receive a batch, delete a
//! message once handled, and route an unparseable message aside.

use async_trait::async_trait;
use invoicer_core::OperationContext;

use crate::error::QueueError;

/// One received message. `receipt_handle` is what acknowledges (deletes) it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
}

#[async_trait]
pub trait NotificationQueue: Send + Sync {
    /// Receive up to `max_messages` messages. An empty vec means the queue is drained.
    async fn receive_batch(
        &self,
        ctx: &OperationContext,
        max_messages: i32,
    ) -> Result<Vec<QueueMessage>, QueueError>;

    async fn delete_message(
        &self,
        ctx: &OperationContext,
        receipt_handle: &str,
    ) -> Result<(), QueueError>;

    /// Route a message that cannot be handled to the dead-letter destination.
    /// The caller still deletes the original.
    async fn dead_letter(
        &self,
        ctx: &OperationContext,
        message: &QueueMessage,
        reason: &str,
    ) -> Result<(), QueueError>;

    /// Short backend name for logs and health output
    fn backend_name(&self) -> &'static str;
}
