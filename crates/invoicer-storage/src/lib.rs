//! Invoicer Storage Library
//!
//! Object storage gateway used by the ingestion pipeline (streaming reads and deletes of
//! uploaded invoice files) and by the HTTP API (presigned PUT URLs).
//!
//! # Object addressing
//!
//! Objects are addressed by `(bucket, key)`. Invoice files are written under the key
//! equal to their file transaction token. Keys must not be empty, contain `..` or start
//! with `/`.

pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use invoicer_core::StorageBackend;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{ByteStream, Storage, StorageError, StorageResult};
