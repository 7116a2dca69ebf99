use async_trait::async_trait;
use chrono::{DateTime, Utc};
use invoicer_core::models::{InvoiceRecord, LineItem};
use invoicer_core::{AppError, OperationContext};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::PgPool;

/// Invoice store, keyed by `(customer_email, invoice_number)`.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    /// Upsert: a later write for the same key replaces the earlier row.
    async fn put(&self, ctx: &OperationContext, record: &InvoiceRecord) -> Result<(), AppError>;

    /// All invoices of a customer, ordered by invoice number ascending.
    async fn query_by_customer(
        &self,
        ctx: &OperationContext,
        customer_email: &str,
    ) -> Result<Vec<InvoiceRecord>, AppError>;
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    customer_email: String,
    invoice_number: String,
    total_value: Decimal,
    line_items: Json<Vec<LineItem>>,
    invoice_transaction_id: String,
    file_transaction_token: String,
    created_at: DateTime<Utc>,
}

impl From<InvoiceRow> for InvoiceRecord {
    fn from(row: InvoiceRow) -> Self {
        InvoiceRecord {
            customer_email: row.customer_email,
            invoice_number: row.invoice_number,
            total_value: row.total_value,
            line_items: row.line_items.0,
            invoice_transaction_id: row.invoice_transaction_id,
            file_transaction_token: row.file_transaction_token,
            created_at: row.created_at,
        }
    }
}

#[derive(Clone)]
pub struct PgInvoiceStore {
    pool: PgPool,
}

impl PgInvoiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceStore for PgInvoiceStore {
    #[tracing::instrument(skip(self, ctx, record), fields(
        request_id = %ctx.request_id(),
        invoice_number = %record.invoice_number,
        db.table = "invoices",
        db.operation = "upsert"
    ))]
    async fn put(&self, ctx: &OperationContext, record: &InvoiceRecord) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO invoices (
                customer_email, invoice_number, total_value, line_items,
                invoice_transaction_id, file_transaction_token, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (customer_email, invoice_number) DO UPDATE SET
                total_value = EXCLUDED.total_value,
                line_items = EXCLUDED.line_items,
                invoice_transaction_id = EXCLUDED.invoice_transaction_id,
                file_transaction_token = EXCLUDED.file_transaction_token,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(&record.customer_email)
        .bind(&record.invoice_number)
        .bind(record.total_value)
        .bind(Json(&record.line_items))
        .bind(&record.invoice_transaction_id)
        .bind(&record.file_transaction_token)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, ctx), fields(
        request_id = %ctx.request_id(),
        db.table = "invoices",
        db.operation = "select"
    ))]
    async fn query_by_customer(
        &self,
        ctx: &OperationContext,
        customer_email: &str,
    ) -> Result<Vec<InvoiceRecord>, AppError> {
        let rows = sqlx::query_as::<_, InvoiceRow>(
            r#"
            SELECT customer_email, invoice_number, total_value, line_items,
                   invoice_transaction_id, file_transaction_token, created_at
            FROM invoices
            WHERE customer_email = $1
            ORDER BY invoice_number COLLATE "C" ASC
            "#,
        )
        .bind(customer_email)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(InvoiceRecord::from).collect())
    }
}
