//! Per-object processing pipeline
//!
//! ```text
//! lookup token ──(absent / not GENERATED)──> Skipped
//!      │
//!  GENERATED -> FILE_RECEIVED (compare-and-set, loser skips)
//!      │
//!  stream lines ──(open/read/parse failure)──> FILE_RECEIVED -> ERROR, object kept
//!      │
//!  delete object, FILE_RECEIVED -> FILE_PROCESSED
//! ```

use chrono::Utc;
use futures::TryStreamExt;
use invoicer_core::models::{
    FileTransactionStatus, InvoiceFileLine, InvoiceOutcome, InvoiceTransaction, ObjectRef,
};
use invoicer_core::OperationContext;
use invoicer_db::{FileTransactionStore, InvoiceStore, InvoiceTransactionLog};
use invoicer_storage::Storage;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;
use uuid::Uuid;

use crate::error::IngestError;

/// Result of processing one uploaded object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    /// Unknown token, not `GENERATED`, or another consumer won the transition.
    Skipped,
    /// Every line was read and recorded; the file is `FILE_PROCESSED`.
    Processed {
        invoices: usize,
        empty_product_lists: usize,
        failed_writes: usize,
    },
    /// The file could not be read or parsed to the end; it is `ERROR`.
    Failed { invoices: usize, reason: String },
}

impl FileOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, FileOutcome::Processed { .. })
    }
}

#[derive(Debug, Default)]
struct LineCounts {
    invoices: usize,
    empty_product_lists: usize,
    failed_writes: usize,
}

pub struct ObjectPipeline {
    file_transactions: Arc<dyn FileTransactionStore>,
    invoices: Arc<dyn InvoiceStore>,
    invoice_transactions: Arc<dyn InvoiceTransactionLog>,
    storage: Arc<dyn Storage>,
}

impl ObjectPipeline {
    pub fn new(
        file_transactions: Arc<dyn FileTransactionStore>,
        invoices: Arc<dyn InvoiceStore>,
        invoice_transactions: Arc<dyn InvoiceTransactionLog>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            file_transactions,
            invoices,
            invoice_transactions,
            storage,
        }
    }

    /// Process one object whose key is a file transaction token.
    #[tracing::instrument(skip(self, ctx), fields(
        request_id = %ctx.request_id(),
        message_id = ctx.message_id().unwrap_or(""),
        bucket = %object.bucket,
        token = %object.key
    ))]
    pub async fn process(
        &self,
        ctx: &OperationContext,
        object: &ObjectRef,
    ) -> Result<FileOutcome, IngestError> {
        let ctx = ctx.with_file_transaction(&object.key);
        let token = object.key.as_str();

        let current = self
            .file_transactions
            .get(&ctx, token)
            .await
            .map_err(IngestError::StatusStore)?;

        match current {
            None => {
                tracing::info!("No file transaction for object, skipping");
                return Ok(FileOutcome::Skipped);
            }
            Some(tx) if !tx.is_eligible_for_ingestion() => {
                tracing::info!(
                    status = %tx.status,
                    terminal = tx.status.is_terminal(),
                    "File transaction not eligible, skipping"
                );
                return Ok(FileOutcome::Skipped);
            }
            Some(_) => {}
        }

        let received = self
            .file_transactions
            .transition(
                &ctx,
                token,
                FileTransactionStatus::Generated,
                FileTransactionStatus::FileReceived,
            )
            .await
            .map_err(IngestError::StatusStore)?;

        if !received {
            tracing::info!("File transaction claimed by another consumer, skipping");
            return Ok(FileOutcome::Skipped);
        }

        let stream = match self.storage.open_read(&object.bucket, &object.key).await {
            Ok(stream) => stream,
            Err(e) => {
                return self
                    .fail(&ctx, token, 0, format!("Failed to open object: {}", e))
                    .await;
            }
        };

        let reader = StreamReader::new(stream.map_err(std::io::Error::other));
        let mut lines = reader.lines();
        let mut counts = LineCounts::default();
        let mut line_number = 0usize;

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    let reason = format!("Failed to read object after line {}: {}", line_number, e);
                    return self.fail(&ctx, token, counts.invoices, reason).await;
                }
            };
            line_number += 1;

            if line.trim().is_empty() {
                continue;
            }

            let parsed = match InvoiceFileLine::parse(&line) {
                Ok(parsed) => parsed,
                Err(e) => {
                    let reason = format!("Line {} is not a valid invoice: {}", line_number, e);
                    return self.fail(&ctx, token, counts.invoices, reason).await;
                }
            };

            self.record_invoice(&ctx, token, &parsed, &mut counts).await;
        }

        if let Err(e) = self.storage.delete(&object.bucket, &object.key).await {
            tracing::warn!(error = %e, "Failed to delete processed object");
        }

        let processed = self
            .file_transactions
            .transition(
                &ctx,
                token,
                FileTransactionStatus::FileReceived,
                FileTransactionStatus::FileProcessed,
            )
            .await
            .map_err(IngestError::StatusStore)?;

        if !processed {
            tracing::warn!("File transaction left FILE_RECEIVED while processing");
        }

        tracing::info!(
            invoices = counts.invoices,
            empty_product_lists = counts.empty_product_lists,
            failed_writes = counts.failed_writes,
            "Invoice file processed"
        );

        Ok(FileOutcome::Processed {
            invoices: counts.invoices,
            empty_product_lists: counts.empty_product_lists,
            failed_writes: counts.failed_writes,
        })
    }

    /// Write the invoice and its audit entry concurrently under one fresh id.
    async fn record_invoice(
        &self,
        ctx: &OperationContext,
        token: &str,
        line: &InvoiceFileLine,
        counts: &mut LineCounts,
    ) {
        let invoice_transaction_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        let outcome = line.outcome();

        let record = line.to_record(&invoice_transaction_id, token, now);
        let entry = InvoiceTransaction::new(
            token,
            invoice_transaction_id.as_str(),
            line.customer_email.as_str(),
            line.invoice_number.as_str(),
            outcome,
            now,
        );

        let (invoice_result, entry_result) = tokio::join!(
            self.invoices.put(ctx, &record),
            self.invoice_transactions.put(ctx, &entry)
        );

        counts.invoices += 1;
        if outcome == InvoiceOutcome::EmptyProductList {
            counts.empty_product_lists += 1;
        }

        if let Err(e) = invoice_result {
            counts.failed_writes += 1;
            tracing::error!(
                error = %e,
                invoice_number = %line.invoice_number,
                "Failed to store invoice"
            );
        }
        if let Err(e) = entry_result {
            counts.failed_writes += 1;
            tracing::error!(
                error = %e,
                invoice_number = %line.invoice_number,
                "Failed to store invoice transaction"
            );
        }

        tracing::debug!(
            invoice_number = %line.invoice_number,
            invoice_transaction_id = %invoice_transaction_id,
            outcome = %outcome,
            "Invoice recorded"
        );
    }

    async fn fail(
        &self,
        ctx: &OperationContext,
        token: &str,
        invoices: usize,
        reason: String,
    ) -> Result<FileOutcome, IngestError> {
        tracing::error!(invoices, reason = %reason, "Invoice file failed");

        let moved = self
            .file_transactions
            .transition(
                ctx,
                token,
                FileTransactionStatus::FileReceived,
                FileTransactionStatus::Error,
            )
            .await
            .map_err(IngestError::StatusStore)?;

        if !moved {
            tracing::warn!("File transaction left FILE_RECEIVED before it could be marked ERROR");
        }

        Ok(FileOutcome::Failed { invoices, reason })
    }
}
