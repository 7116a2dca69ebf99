//! Ingestion consumer and its scheduler.
//!
//! Shutdown: [`IngestionWorker::shutdown`] lets the in-flight invocation finish, then
//! stops the loop. A file is never abandoned half-way through by the scheduler.

use futures::stream::{self, StreamExt};
use invoicer_core::models::ObjectCreatedNotification;
use invoicer_core::{Config, OperationContext};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;

use crate::error::QueueError;
use crate::notification_queue::{NotificationQueue, QueueMessage};
use crate::pipeline::ObjectPipeline;

#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// Messages per receive (SQS allows at most 10)
    pub batch_size: i32,
    pub max_concurrent_messages: usize,
    pub max_concurrent_records: usize,
    /// Delay between the end of one invocation and the start of the next
    pub poll_interval_ms: u64,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            max_concurrent_messages: 4,
            max_concurrent_records: 4,
            poll_interval_ms: 1000,
        }
    }
}

impl ConsumerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.consumer_batch_size(),
            max_concurrent_messages: config.consumer_max_concurrent_messages().max(1),
            max_concurrent_records: config.consumer_max_concurrent_records().max(1),
            poll_interval_ms: config.consumer_poll_interval_ms(),
        }
    }
}

/// Totals for one `run()` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerRunSummary {
    pub batches: usize,
    pub messages: usize,
    pub poisoned: usize,
    pub records_succeeded: usize,
    pub records_failed: usize,
}

enum MessageOutcome {
    Poisoned,
    Handled { succeeded: usize, failed: usize },
}

pub struct IngestionConsumer {
    queue: Arc<dyn NotificationQueue>,
    pipeline: Arc<ObjectPipeline>,
    config: ConsumerConfig,
}

impl IngestionConsumer {
    pub fn new(
        queue: Arc<dyn NotificationQueue>,
        pipeline: Arc<ObjectPipeline>,
        config: ConsumerConfig,
    ) -> Self {
        Self {
            queue,
            pipeline,
            config,
        }
    }

    pub fn config(&self) -> &ConsumerConfig {
        &self.config
    }

    /// Drain the queue: receive batches until one comes back empty.
    ///
    /// Only a failed receive ends the invocation with an error. Every received message is
    /// deleted once its records have been attempted, whatever their outcome. A poison message
    /// that cannot be dead-lettered is left for redelivery.
    pub async fn run(&self) -> Result<ConsumerRunSummary, QueueError> {
        let ctx = OperationContext::new();
        let mut summary = ConsumerRunSummary::default();

        loop {
            let batch = self
                .queue
                .receive_batch(&ctx, self.config.batch_size)
                .await?;

            if batch.is_empty() {
                break;
            }

            summary.batches += 1;
            summary.messages += batch.len();

            let outcomes: Vec<MessageOutcome> = stream::iter(batch)
                .map(|message| self.handle_message(&ctx, message))
                .buffer_unordered(self.config.max_concurrent_messages)
                .collect()
                .await;

            for outcome in outcomes {
                match outcome {
                    MessageOutcome::Poisoned => summary.poisoned += 1,
                    MessageOutcome::Handled { succeeded, failed } => {
                        summary.records_succeeded += succeeded;
                        summary.records_failed += failed;
                    }
                }
            }
        }

        if summary.messages > 0 {
            tracing::info!(
                request_id = %ctx.request_id(),
                batches = summary.batches,
                messages = summary.messages,
                poisoned = summary.poisoned,
                records_succeeded = summary.records_succeeded,
                records_failed = summary.records_failed,
                "Consumer run finished"
            );
        }

        Ok(summary)
    }

    async fn handle_message(&self, ctx: &OperationContext, message: QueueMessage) -> MessageOutcome {
        let ctx = ctx.with_message(&message.message_id);

        let notification = match ObjectCreatedNotification::parse(&message.body) {
            Ok(notification) => notification,
            Err(e) => {
                tracing::warn!(
                    message_id = %message.message_id,
                    error = %e,
                    "Poison message"
                );
                match self.queue.dead_letter(&ctx, &message, &e.to_string()).await {
                    Ok(()) => self.delete(&ctx, &message).await,
                    // Leave it on the queue rather than lose it
                    Err(dl) => tracing::error!(
                        message_id = %message.message_id,
                        error = %dl,
                        "Failed to dead-letter message, leaving it on the queue"
                    ),
                }
                return MessageOutcome::Poisoned;
            }
        };

        let results: Vec<bool> = stream::iter(notification.records)
            .map(|record| {
                let ctx = ctx.clone();
                async move {
                    let object = match record.object_ref() {
                        Ok(object) => object,
                        Err(e) => {
                            tracing::error!(error = %e, "Invalid object reference in record");
                            return false;
                        }
                    };
                    match self.pipeline.process(&ctx, &object).await {
                        Ok(outcome) => outcome.is_success(),
                        Err(e) => {
                            tracing::error!(object = %object, error = %e, "Failed to process object");
                            false
                        }
                    }
                }
            })
            .buffer_unordered(self.config.max_concurrent_records)
            .collect()
            .await;

        let succeeded = results.iter().filter(|ok| **ok).count();
        let failed = results.len() - succeeded;

        if failed == 0 {
            tracing::info!(
                message_id = %message.message_id,
                records = results.len(),
                "All records processed"
            );
        } else {
            tracing::warn!(
                message_id = %message.message_id,
                succeeded,
                failed,
                "Some records were not processed"
            );
        }

        self.delete(&ctx, &message).await;

        MessageOutcome::Handled { succeeded, failed }
    }

    async fn delete(&self, ctx: &OperationContext, message: &QueueMessage) {
        if let Err(e) = self
            .queue
            .delete_message(ctx, &message.receipt_handle)
            .await
        {
            tracing::error!(
                message_id = %message.message_id,
                error = %e,
                "Failed to delete message"
            );
        }
    }
}

/// Runs the consumer on a fixed delay in a background task.
pub struct IngestionWorker {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl IngestionWorker {
    pub fn start(consumer: Arc<IngestionConsumer>) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let poll_interval = Duration::from_millis(consumer.config().poll_interval_ms);

        let handle = tokio::spawn(async move {
            Self::run_loop(consumer, poll_interval, shutdown_rx).await;
        });

        Self {
            shutdown_tx,
            handle,
        }
    }

    async fn run_loop(
        consumer: Arc<IngestionConsumer>,
        poll_interval: Duration,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::info!(
            poll_interval_ms = poll_interval.as_millis() as u64,
            batch_size = consumer.config().batch_size,
            max_concurrent_messages = consumer.config().max_concurrent_messages,
            max_concurrent_records = consumer.config().max_concurrent_records,
            "Ingestion worker started"
        );

        loop {
            if let Err(e) = consumer.run().await {
                tracing::error!(error = %e, "Consumer run failed");
            }

            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Ingestion worker shutting down");
                    break;
                }
                _ = sleep(poll_interval) => {}
            }
        }

        tracing::info!("Ingestion worker stopped");
    }

    /// Stop after the current invocation and wait for the loop to exit.
    pub async fn shutdown(self) {
        tracing::info!("Initiating ingestion worker shutdown");
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Ingestion worker task ended abnormally");
        }
    }
}
