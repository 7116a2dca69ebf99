//! Storage setup and initialization

use anyhow::{Context, Result};
use invoicer_core::{Config, StorageBackend};
use invoicer_storage::{create_storage, Storage};
use std::sync::Arc;

pub async fn setup_storage(config: &Config) -> Result<Arc<dyn Storage>> {
    tracing::info!("Initializing storage abstraction...");
    let storage = create_storage(config)
        .await
        .context("Failed to initialize storage")?;

    let backend_type = storage.backend_type();
    if backend_type != StorageBackend::S3 {
        tracing::warn!(
            backend = %backend_type,
            "Storage backend cannot issue presigned URLs; POST /transactions will fail"
        );
    }

    tracing::info!(
        backend = %backend_type,
        bucket = %storage.default_bucket(),
        "Storage abstraction initialized successfully"
    );

    Ok(storage)
}
