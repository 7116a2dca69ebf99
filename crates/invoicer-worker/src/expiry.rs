//! Periodic purge of file transactions and invoice transactions past their ttl.
//!
//! Invoices themselves never expire.

use chrono::{DateTime, Utc};
use invoicer_core::OperationContext;
use invoicer_db::{FileTransactionStore, InvoiceTransactionLog};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Rows removed by one purge pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExpirySummary {
    pub file_transactions: u64,
    pub invoice_transactions: u64,
}

#[derive(Clone)]
pub struct ExpiryService {
    file_transactions: Arc<dyn FileTransactionStore>,
    invoice_transactions: Arc<dyn InvoiceTransactionLog>,
}

impl ExpiryService {
    pub fn new(
        file_transactions: Arc<dyn FileTransactionStore>,
        invoice_transactions: Arc<dyn InvoiceTransactionLog>,
    ) -> Self {
        Self {
            file_transactions,
            invoice_transactions,
        }
    }

    /// Purge both stores. A failure in one store is logged and does not stop the other.
    #[tracing::instrument(skip(self), fields(expiry.operation = "purge_all"))]
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> ExpirySummary {
        let ctx = OperationContext::new();

        let file_transactions = match self.file_transactions.purge_expired(&ctx, now).await {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(error = %e, "Failed to purge expired file transactions");
                0
            }
        };

        let invoice_transactions = match self.invoice_transactions.purge_expired(&ctx, now).await
        {
            Ok(count) => count,
            Err(e) => {
                tracing::error!(error = %e, "Failed to purge expired invoice transactions");
                0
            }
        };

        if file_transactions > 0 || invoice_transactions > 0 {
            tracing::info!(
                request_id = %ctx.request_id(),
                file_transactions,
                invoice_transactions,
                "Expired rows purged"
            );
        }

        ExpirySummary {
            file_transactions,
            invoice_transactions,
        }
    }

    /// Run [`ExpiryService::purge_expired`] every `every`, starting immediately.
    pub fn start(self: Arc<Self>, every: Duration) -> ExpiryWorker {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let handle = tokio::spawn(async move {
            let mut ticker = interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            tracing::info!(interval_secs = every.as_secs(), "Expiry worker started");

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => break,
                    _ = ticker.tick() => {
                        self.purge_expired(Utc::now()).await;
                    }
                }
            }

            tracing::info!("Expiry worker stopped");
        });

        ExpiryWorker {
            shutdown_tx,
            handle,
        }
    }
}

/// Handle on the background purge task.
pub struct ExpiryWorker {
    shutdown_tx: mpsc::Sender<()>,
    handle: JoinHandle<()>,
}

impl ExpiryWorker {
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.handle.await {
            tracing::error!(error = %e, "Expiry worker task ended abnormally");
        }
    }
}
