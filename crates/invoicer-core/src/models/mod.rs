//! Data models for the application
//!
//! File transactions (one per uploaded invoice file), invoice records and invoice
//! transactions (one per parsed line), the invoice file wire format, and the object
//! created notification envelope delivered through the queue.

mod file_transaction;
mod invoice;
mod invoice_transaction;
pub mod notification;

pub use file_transaction::*;
pub use invoice::*;
pub use invoice_transaction::*;
pub use notification::{NotificationError, NotificationRecord, ObjectCreatedNotification, ObjectRef};
