//! Invoicer Database Library
//!
//! Persistence for file transactions, invoices and invoice transactions.

pub mod db;

pub use db::*;
