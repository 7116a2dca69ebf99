//! Invoicer Worker Library
//!
//! Consumes "object created" notifications and ingests the referenced invoice files:
//! each JSON line becomes an invoice record plus an invoice transaction, and the file
//! transaction moves through `GENERATED -> FILE_RECEIVED -> FILE_PROCESSED | ERROR`.
//! Rows past their ttl are removed by the [`expiry`] task.

pub mod consumer;
pub mod error;
pub mod expiry;
pub mod memory_queue;
pub mod notification_queue;
pub mod pipeline;
#[cfg(feature = "queue-sqs")]
pub mod sqs;

pub use consumer::{ConsumerConfig, ConsumerRunSummary, IngestionConsumer, IngestionWorker};
pub use error::{IngestError, QueueError};
pub use expiry::{ExpiryService, ExpirySummary, ExpiryWorker};
pub use memory_queue::MemoryQueue;
pub use notification_queue::{NotificationQueue, QueueMessage};
pub use pipeline::{FileOutcome, ObjectPipeline};
#[cfg(feature = "queue-sqs")]
pub use sqs::SqsQueue;
