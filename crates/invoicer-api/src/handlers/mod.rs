//! HTTP handlers

pub mod health;
pub mod invoices;
pub mod transactions;
