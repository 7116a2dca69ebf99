use crate::constants::REQUESTER_ID_HEADER;
use crate::error::{ErrorResponse, HttpAppError};
use crate::extractors::RequestContext;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use invoicer_core::models::{CreateFileTransactionResponse, FileTransactionStatusResponse};
use invoicer_core::AppError;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Issue a presigned write URL for a new invoice file
///
/// The returned `transactionId` is the object key the file must be uploaded under; its
/// status starts as `GENERATED`.
#[utoipa::path(
    post,
    path = "/api/v0/transactions",
    tag = "transactions",
    params(
        ("requestId" = String, Header, description = "Identifier of the requesting party")
    ),
    responses(
        (status = 200, description = "Write URL issued", body = CreateFileTransactionResponse),
        (status = 400, description = "Missing requestId header", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(
    skip(state, headers, ctx),
    fields(request_id = %ctx.0.request_id(), operation = "create_file_transaction")
)]
pub async fn create_file_transaction(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    headers: HeaderMap,
) -> Result<impl IntoResponse, HttpAppError> {
    let ctx = ctx.0;
    let requester_id = headers
        .get(REQUESTER_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest(format!("{} header is required", REQUESTER_ID_HEADER)))?
        .to_string();

    let token = Uuid::new_v4().to_string();
    let expires_in = state.config.presigned_url_expires_seconds();

    let url = state
        .storage
        .presigned_put_url(&token, Duration::from_secs(expires_in as u64))
        .await?;

    let ctx = ctx.with_file_transaction(&token);
    state
        .stores
        .file_transactions
        .create(&ctx, &token, &requester_id, expires_in)
        .await?;

    tracing::info!(
        token = %token,
        requester_id = %requester_id,
        expires_in,
        "Issued invoice file write URL"
    );

    Ok(Json(CreateFileTransactionResponse {
        url,
        expires_in,
        transaction_id: token,
    }))
}

/// Get the processing status of an invoice file
#[utoipa::path(
    get,
    path = "/api/v0/transactions/{token}",
    tag = "transactions",
    params(
        ("token" = String, Path, description = "File transaction token")
    ),
    responses(
        (status = 200, description = "File transaction status", body = FileTransactionStatusResponse),
        (status = 404, description = "Unknown token", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx), fields(request_id = %ctx.0.request_id()))]
pub async fn get_file_transaction(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let tx = state
        .stores
        .file_transactions
        .get(&ctx.0, &token)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("File transaction {} not found", token)))?;

    Ok(Json(FileTransactionStatusResponse::from(tx)))
}
