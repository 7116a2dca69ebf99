use invoicer_core::AppError;
use thiserror::Error;

/// Notification queue errors
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Receive failed: {0}")]
    Receive(String),

    #[error("Delete failed: {0}")]
    Delete(String),

    #[error("Dead-letter failed: {0}")]
    DeadLetter(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors that stop the pipeline from reaching a file outcome.
///
/// Read and parse failures are not errors: they end in `FileOutcome::Failed` with the
/// file marked `ERROR`. Only status store failures surface here.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Status store error: {0}")]
    StatusStore(#[source] AppError),
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::StatusStore(inner) => inner,
        }
    }
}

impl From<QueueError> for AppError {
    fn from(err: QueueError) -> Self {
        AppError::Queue(err.to_string())
    }
}
