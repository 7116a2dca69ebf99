use crate::error::{ErrorResponse, HttpAppError};
use crate::extractors::RequestContext;
use crate::state::AppState;
use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use invoicer_core::models::{InvoiceQuery, InvoiceRecord};
use invoicer_core::AppError;
use std::sync::Arc;
use validator::Validate;

/// List a customer's invoices, ordered by invoice number
#[utoipa::path(
    get,
    path = "/api/v0/invoices",
    tag = "invoices",
    params(
        ("email" = String, Query, description = "Customer email")
    ),
    responses(
        (status = 200, description = "Invoices for the customer", body = Vec<InvoiceRecord>),
        (status = 400, description = "Missing email", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, ctx, query), fields(request_id = %ctx.0.request_id()))]
pub async fn list_invoices(
    State(state): State<Arc<AppState>>,
    ctx: RequestContext,
    Query(query): Query<InvoiceQuery>,
) -> Result<impl IntoResponse, HttpAppError> {
    let query = query.normalized();
    query.validate().map_err(AppError::from)?;

    let invoices = state
        .stores
        .invoices
        .query_by_customer(&ctx.0, &query.email)
        .await?;

    tracing::debug!(count = invoices.len(), "Listed invoices");
    Ok(Json(invoices))
}
