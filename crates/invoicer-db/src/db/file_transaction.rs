use async_trait::async_trait;
use chrono::{DateTime, Utc};
use invoicer_core::models::{FileTransaction, FileTransactionStatus};
use invoicer_core::{AppError, OperationContext};
use sqlx::PgPool;

/// Status store for file transactions.
///
/// Every transition the pipeline performs goes through [`FileTransactionStore::transition`],
/// so at most one consumer can move a token out of a given state.
#[async_trait]
pub trait FileTransactionStore: Send + Sync {
    /// Create a transaction in `GENERATED`.
    async fn create(
        &self,
        ctx: &OperationContext,
        token: &str,
        requester_id: &str,
        expires_in_seconds: i32,
    ) -> Result<FileTransaction, AppError>;

    async fn get(
        &self,
        ctx: &OperationContext,
        token: &str,
    ) -> Result<Option<FileTransaction>, AppError>;

    /// Unconditional status write. No-op if the token is absent.
    async fn set_status(
        &self,
        ctx: &OperationContext,
        token: &str,
        status: FileTransactionStatus,
    ) -> Result<(), AppError>;

    /// Compare-and-set: writes `next` only if the row exists and is currently `expected`.
    /// Edges the state machine does not have are refused without touching the row.
    /// Returns whether the write happened.
    async fn transition(
        &self,
        ctx: &OperationContext,
        token: &str,
        expected: FileTransactionStatus,
        next: FileTransactionStatus,
    ) -> Result<bool, AppError>;

    /// Delete rows whose ttl is before `now`. Returns the number of rows removed.
    async fn purge_expired(&self, ctx: &OperationContext, now: DateTime<Utc>)
        -> Result<u64, AppError>;
}

#[derive(Debug, sqlx::FromRow)]
struct FileTransactionRow {
    token: String,
    requester_id: String,
    status: String,
    expires_in_seconds: i32,
    created_at: DateTime<Utc>,
    ttl: i64,
}

impl TryFrom<FileTransactionRow> for FileTransaction {
    type Error = AppError;

    fn try_from(row: FileTransactionRow) -> Result<Self, Self::Error> {
        Ok(FileTransaction {
            status: row.status.parse::<FileTransactionStatus>()?,
            token: row.token,
            requester_id: row.requester_id,
            expires_in_seconds: row.expires_in_seconds,
            created_at: row.created_at,
            ttl: row.ttl,
        })
    }
}

#[derive(Clone)]
pub struct PgFileTransactionStore {
    pool: PgPool,
}

impl PgFileTransactionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileTransactionStore for PgFileTransactionStore {
    #[tracing::instrument(skip(self, ctx), fields(
        request_id = %ctx.request_id(),
        db.table = "file_transactions",
        db.operation = "insert"
    ))]
    async fn create(
        &self,
        ctx: &OperationContext,
        token: &str,
        requester_id: &str,
        expires_in_seconds: i32,
    ) -> Result<FileTransaction, AppError> {
        let tx = FileTransaction::generated(token, requester_id, expires_in_seconds, Utc::now());

        sqlx::query(
            r#"
            INSERT INTO file_transactions (
                token, requester_id, status, expires_in_seconds, created_at, ttl
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&tx.token)
        .bind(&tx.requester_id)
        .bind(tx.status.as_str())
        .bind(tx.expires_in_seconds)
        .bind(tx.created_at)
        .bind(tx.ttl)
        .execute(&self.pool)
        .await?;

        Ok(tx)
    }

    #[tracing::instrument(skip(self, ctx), fields(
        request_id = %ctx.request_id(),
        db.table = "file_transactions",
        db.operation = "select"
    ))]
    async fn get(
        &self,
        ctx: &OperationContext,
        token: &str,
    ) -> Result<Option<FileTransaction>, AppError> {
        let row = sqlx::query_as::<_, FileTransactionRow>(
            r#"
            SELECT token, requester_id, status, expires_in_seconds, created_at, ttl
            FROM file_transactions
            WHERE token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(FileTransaction::try_from).transpose()
    }

    #[tracing::instrument(skip(self, ctx), fields(
        request_id = %ctx.request_id(),
        db.table = "file_transactions",
        db.operation = "update"
    ))]
    async fn set_status(
        &self,
        ctx: &OperationContext,
        token: &str,
        status: FileTransactionStatus,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            UPDATE file_transactions
            SET status = $2, updated_at = NOW()
            WHERE token = $1
            "#,
        )
        .bind(token)
        .bind(status.as_str())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[tracing::instrument(skip(self, ctx), fields(
        request_id = %ctx.request_id(),
        db.table = "file_transactions",
        db.operation = "update"
    ))]
    async fn transition(
        &self,
        ctx: &OperationContext,
        token: &str,
        expected: FileTransactionStatus,
        next: FileTransactionStatus,
    ) -> Result<bool, AppError> {
        if !expected.can_transition_to(next) {
            tracing::warn!(from = %expected, to = %next, "Rejected illegal status transition");
            return Ok(false);
        }

        let result = sqlx::query(
            r#"
            UPDATE file_transactions
            SET status = $3, updated_at = NOW()
            WHERE token = $1 AND status = $2
            "#,
        )
        .bind(token)
        .bind(expected.as_str())
        .bind(next.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    #[tracing::instrument(skip(self, ctx), fields(
        request_id = %ctx.request_id(),
        db.table = "file_transactions",
        db.operation = "delete"
    ))]
    async fn purge_expired(
        &self,
        ctx: &OperationContext,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let result = sqlx::query("DELETE FROM file_transactions WHERE ttl < $1")
            .bind(now.timestamp())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
