use async_trait::async_trait;
use chrono::{DateTime, Utc};
use invoicer_core::models::{InvoiceOutcome, InvoiceTransaction};
use invoicer_core::{AppError, OperationContext};
use sqlx::PgPool;

/// Append-only log of per-line attempts, partitioned by file transaction token.
#[async_trait]
pub trait InvoiceTransactionLog: Send + Sync {
    async fn put(&self, ctx: &OperationContext, entry: &InvoiceTransaction)
        -> Result<(), AppError>;

    /// Entries of one file, oldest first.
    async fn list_for_file(
        &self,
        ctx: &OperationContext,
        file_transaction_token: &str,
    ) -> Result<Vec<InvoiceTransaction>, AppError>;

    /// Delete entries whose ttl is before `now`. Returns the number of entries removed.
    async fn purge_expired(&self, ctx: &OperationContext, now: DateTime<Utc>)
        -> Result<u64, AppError>;
}

#[derive(Debug, sqlx::FromRow)]
struct InvoiceTransactionRow {
    file_transaction_token: String,
    invoice_transaction_id: String,
    customer_email: String,
    invoice_number: String,
    outcome: String,
    created_at: DateTime<Utc>,
    ttl: i64,
}

impl TryFrom<InvoiceTransactionRow> for InvoiceTransaction {
    type Error = AppError;

    fn try_from(row: InvoiceTransactionRow) -> Result<Self, Self::Error> {
        Ok(InvoiceTransaction {
            outcome: row.outcome.parse::<InvoiceOutcome>()?,
            file_transaction_token: row.file_transaction_token,
            invoice_transaction_id: row.invoice_transaction_id,
            customer_email: row.customer_email,
            invoice_number: row.invoice_number,
            created_at: row.created_at,
            ttl: row.ttl,
        })
    }
}

#[derive(Clone)]
pub struct PgInvoiceTransactionLog {
    pool: PgPool,
}

impl PgInvoiceTransactionLog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InvoiceTransactionLog for PgInvoiceTransactionLog {
    #[tracing::instrument(skip(self, ctx, entry), fields(
        request_id = %ctx.request_id(),
        file_transaction = %entry.file_transaction_token,
        db.table = "invoice_transactions",
        db.operation = "insert"
    ))]
    async fn put(
        &self,
        ctx: &OperationContext,
        entry: &InvoiceTransaction,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO invoice_transactions (
                file_transaction_token, invoice_transaction_id, customer_email,
                invoice_number, outcome, created_at, ttl
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (file_transaction_token, invoice_transaction_id) DO NOTHING
            "#,
        )
        .bind(&entry.file_transaction_token)
        .bind(&entry.invoice_transaction_id)
        .bind(&entry.customer_email)
        .bind(&entry.invoice_number)
        .bind(entry.outcome.as_str())
        .bind(entry.created_at)
        .bind(entry.ttl)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, ctx), fields(
        request_id = %ctx.request_id(),
        db.table = "invoice_transactions",
        db.operation = "select"
    ))]
    async fn list_for_file(
        &self,
        ctx: &OperationContext,
        file_transaction_token: &str,
    ) -> Result<Vec<InvoiceTransaction>, AppError> {
        let rows = sqlx::query_as::<_, InvoiceTransactionRow>(
            r#"
            SELECT file_transaction_token, invoice_transaction_id, customer_email,
                   invoice_number, outcome, created_at, ttl
            FROM invoice_transactions
            WHERE file_transaction_token = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(file_transaction_token)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(InvoiceTransaction::try_from).collect()
    }

    #[tracing::instrument(skip(self, ctx), fields(
        request_id = %ctx.request_id(),
        db.table = "invoice_transactions",
        db.operation = "delete"
    ))]
    async fn purge_expired(
        &self,
        ctx: &OperationContext,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM invoice_transactions WHERE ttl < $1")
            .bind(now.timestamp())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
