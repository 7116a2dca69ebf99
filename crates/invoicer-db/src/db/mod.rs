//! Database repositories for data access layer
//!
//! Each store is a trait with a PostgreSQL implementation (runtime `sqlx` queries) and
//! an in-memory implementation in [`memory`].
//
// Status store for uploaded files
pub mod file_transaction;
//
// Accepted invoices
pub mod invoice;
//
// Per-line audit trail
pub mod invoice_transaction;
//
// In-memory implementations
pub mod memory;

pub use file_transaction::{FileTransactionStore, PgFileTransactionStore};
pub use invoice::{InvoiceStore, PgInvoiceStore};
pub use invoice_transaction::{InvoiceTransactionLog, PgInvoiceTransactionLog};
pub use memory::{MemoryFileTransactionStore, MemoryInvoiceStore, MemoryInvoiceTransactionLog};
