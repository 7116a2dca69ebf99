//! Application state shared by the HTTP handlers.

use invoicer_core::Config;
use invoicer_db::{FileTransactionStore, InvoiceStore, InvoiceTransactionLog};
use invoicer_storage::Storage;
use invoicer_worker::NotificationQueue;
use sqlx::PgPool;
use std::sync::Arc;

/// Status store, invoice store and invoice transaction log, whichever backend serves them.
#[derive(Clone)]
pub struct StoreState {
    pub file_transactions: Arc<dyn FileTransactionStore>,
    pub invoices: Arc<dyn InvoiceStore>,
    pub invoice_transactions: Arc<dyn InvoiceTransactionLog>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub stores: StoreState,
    pub storage: Arc<dyn Storage>,
    pub queue: Arc<dyn NotificationQueue>,
    /// Present only with the postgres store backend
    pub pool: Option<PgPool>,
}
