//! Health check handlers and response types.

use crate::state::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use invoicer_core::OperationContext;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;

const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// Run an async check with timeout; returns "healthy", "timeout", or "{prefix}: {error}".
async fn run_check<F, E>(timeout: Duration, f: F, error_prefix: &str) -> String
where
    F: Future<Output = Result<(), E>>,
    E: Display,
{
    match tokio::time::timeout(timeout, f).await {
        Ok(Ok(())) => "healthy".to_string(),
        Ok(Err(e)) => format!("{}: {}", error_prefix, e),
        Err(_) => "timeout".to_string(),
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthCheckResponse {
    pub status: String,
    pub store_backend: String,
    pub store: String,
    pub storage_backend: String,
    pub storage: String,
    pub queue_backend: String,
    pub consumer_enabled: bool,
}

/// Liveness check: the process is running.
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses((status = 200, description = "Process is alive"))
)]
pub async fn liveness_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(serde_json::json!({ "status": "alive" })),
    )
}

/// Health check covering the stores and object storage, plus queue wiring.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "All dependencies healthy", body = HealthCheckResponse),
        (status = 503, description = "A dependency is unhealthy", body = HealthCheckResponse)
    )
)]
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let ctx = OperationContext::from_request_id("health-check");

    let file_transactions = state.stores.file_transactions.clone();
    let store = run_check(
        CHECK_TIMEOUT,
        async move {
            file_transactions
                .get(&ctx, "health-check-non-existent-token")
                .await
                .map(drop)
        },
        "unhealthy",
    )
    .await;

    let storage = state.storage.clone();
    let bucket = storage.default_bucket().to_string();
    let storage_status = run_check(
        CHECK_TIMEOUT,
        async move {
            storage
                .exists(&bucket, "health-check-non-existent-key")
                .await
                .map(drop)
        },
        "unhealthy",
    )
    .await;

    let healthy = store == "healthy" && storage_status == "healthy";
    if !healthy {
        tracing::warn!(store = %store, storage = %storage_status, "Health check failed");
    }

    let response = HealthCheckResponse {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        store_backend: state.config.store_backend().to_string(),
        store,
        storage_backend: state.storage.backend_type().to_string(),
        storage: storage_status,
        queue_backend: state.queue.backend_name().to_string(),
        consumer_enabled: state.config.consumer_enabled(),
    };

    let status_code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
