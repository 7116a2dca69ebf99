//! Invoicer Core Library
//!
//! This crate provides the domain models, error types, configuration and the explicit
//! operation context shared by every Invoicer component (stores, storage gateway,
//! ingestion worker and HTTP API).

pub mod backend_types;
pub mod config;
pub mod context;
pub mod error;
pub mod models;

// Re-export commonly used types
pub use backend_types::{QueueBackend, StorageBackend, StoreBackend};
pub use config::{BaseConfig, Config, IngestionConfig};
pub use context::OperationContext;
pub use error::{AppError, ErrorMetadata, LogLevel};
