use async_trait::async_trait;
use invoicer_core::OperationContext;
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::QueueError;
use crate::notification_queue::{NotificationQueue, QueueMessage};

/// In-process queue with SQS-like receive/delete semantics.
///
/// Received messages stay in flight until deleted; [`MemoryQueue::requeue_in_flight`]
/// plays the role of an expired visibility timeout.
#[derive(Default)]
pub struct MemoryQueue {
    state: Mutex<MemoryQueueState>,
}

#[derive(Default)]
struct MemoryQueueState {
    pending: VecDeque<(String, String)>,
    in_flight: HashMap<String, (String, String)>,
    dead_letters: Vec<(QueueMessage, String)>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a body and return its message id.
    pub async fn send(&self, body: impl Into<String>) -> String {
        let message_id = Uuid::new_v4().to_string();
        self.state
            .lock()
            .await
            .pending
            .push_back((message_id.clone(), body.into()));
        message_id
    }

    pub async fn pending_len(&self) -> usize {
        self.state.lock().await.pending.len()
    }

    pub async fn in_flight_len(&self) -> usize {
        self.state.lock().await.in_flight.len()
    }

    pub async fn dead_letters(&self) -> Vec<(QueueMessage, String)> {
        self.state.lock().await.dead_letters.clone()
    }

    /// Make every received but undeleted message visible again.
    pub async fn requeue_in_flight(&self) {
        let mut state = self.state.lock().await;
        let in_flight: Vec<_> = state.in_flight.drain().map(|(_, m)| m).collect();
        state.pending.extend(in_flight);
    }
}

#[async_trait]
impl NotificationQueue for MemoryQueue {
    async fn receive_batch(
        &self,
        _ctx: &OperationContext,
        max_messages: i32,
    ) -> Result<Vec<QueueMessage>, QueueError> {
        let mut state = self.state.lock().await;
        let take = (max_messages.max(0) as usize).min(state.pending.len());
        let mut batch = Vec::with_capacity(take);

        for _ in 0..take {
            let Some((message_id, body)) = state.pending.pop_front() else {
                break;
            };
            let receipt_handle = Uuid::new_v4().to_string();
            state
                .in_flight
                .insert(receipt_handle.clone(), (message_id.clone(), body.clone()));
            batch.push(QueueMessage {
                message_id,
                receipt_handle,
                body,
            });
        }

        Ok(batch)
    }

    async fn delete_message(
        &self,
        _ctx: &OperationContext,
        receipt_handle: &str,
    ) -> Result<(), QueueError> {
        match self.state.lock().await.in_flight.remove(receipt_handle) {
            Some(_) => Ok(()),
            None => Err(QueueError::Delete(format!(
                "Unknown receipt handle: {}",
                receipt_handle
            ))),
        }
    }

    async fn dead_letter(
        &self,
        _ctx: &OperationContext,
        message: &QueueMessage,
        reason: &str,
    ) -> Result<(), QueueError> {
        self.state
            .lock()
            .await
            .dead_letters
            .push((message.clone(), reason.to_string()));
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
