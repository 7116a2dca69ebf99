use crate::error::ErrorResponse;
use crate::handlers;
use crate::handlers::health::HealthCheckResponse;
use invoicer_core::models::{
    CreateFileTransactionResponse, FileTransactionStatus, FileTransactionStatusResponse,
    InvoiceRecord, LineItem,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Invoicer API",
        description = "Issue write URLs for invoice files, follow their processing and query ingested invoices"
    ),
    paths(
        handlers::transactions::create_file_transaction,
        handlers::transactions::get_file_transaction,
        handlers::invoices::list_invoices,
        handlers::health::health_check,
        handlers::health::liveness_check,
    ),
    components(schemas(
        CreateFileTransactionResponse,
        FileTransactionStatusResponse,
        FileTransactionStatus,
        InvoiceRecord,
        LineItem,
        HealthCheckResponse,
        ErrorResponse,
    )),
    tags(
        (name = "transactions", description = "Invoice file write URLs and processing status"),
        (name = "invoices", description = "Ingested invoices"),
        (name = "health", description = "Health checks")
    )
)]
pub struct ApiDoc;
