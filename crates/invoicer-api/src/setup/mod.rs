//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use invoicer_core::{Config, StoreBackend};
use invoicer_infra::LogFormat;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    // Fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    let log_format: LogFormat = config.log_format().parse()?;
    invoicer_infra::init_telemetry(log_format, None)
        .context("Failed to initialize telemetry")?;

    tracing::info!(
        environment = %config.environment(),
        store_backend = %config.store_backend(),
        storage_backend = %config.storage_backend(),
        queue_backend = %config.queue_backend(),
        "Configuration loaded and validated successfully"
    );

    let pool = match config.store_backend() {
        StoreBackend::Postgres => Some(database::setup_database(&config).await?),
        StoreBackend::Memory => None,
    };

    let storage = storage::setup_storage(&config).await?;

    let state = services::initialize_services(&config, pool, storage).await?;

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
