//! In-memory stores
//!
//! Same contracts as the PostgreSQL repositories, backed by maps behind a
//! `tokio::sync::RwLock`. Used for local development (`STORE_BACKEND=memory`) and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use invoicer_core::models::{
    FileTransaction, FileTransactionStatus, InvoiceRecord, InvoiceTransaction,
};
use invoicer_core::{AppError, OperationContext};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

use super::file_transaction::FileTransactionStore;
use super::invoice::InvoiceStore;
use super::invoice_transaction::InvoiceTransactionLog;

#[derive(Default)]
pub struct MemoryFileTransactionStore {
    rows: RwLock<HashMap<String, FileTransaction>>,
}

impl MemoryFileTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a row as-is, whatever its status.
    pub async fn insert(&self, tx: FileTransaction) {
        self.rows.write().await.insert(tx.token.clone(), tx);
    }
}

#[async_trait]
impl FileTransactionStore for MemoryFileTransactionStore {
    async fn create(
        &self,
        _ctx: &OperationContext,
        token: &str,
        requester_id: &str,
        expires_in_seconds: i32,
    ) -> Result<FileTransaction, AppError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(token) {
            return Err(AppError::InvalidInput(format!(
                "File transaction {} already exists",
                token
            )));
        }
        let tx = FileTransaction::generated(token, requester_id, expires_in_seconds, Utc::now());
        rows.insert(token.to_string(), tx.clone());
        Ok(tx)
    }

    async fn get(
        &self,
        _ctx: &OperationContext,
        token: &str,
    ) -> Result<Option<FileTransaction>, AppError> {
        Ok(self.rows.read().await.get(token).cloned())
    }

    async fn set_status(
        &self,
        _ctx: &OperationContext,
        token: &str,
        status: FileTransactionStatus,
    ) -> Result<(), AppError> {
        if let Some(row) = self.rows.write().await.get_mut(token) {
            row.status = status;
        }
        Ok(())
    }

    async fn transition(
        &self,
        _ctx: &OperationContext,
        token: &str,
        expected: FileTransactionStatus,
        next: FileTransactionStatus,
    ) -> Result<bool, AppError> {
        if !expected.can_transition_to(next) {
            tracing::warn!(from = %expected, to = %next, "Rejected illegal status transition");
            return Ok(false);
        }

        let mut rows = self.rows.write().await;
        match rows.get_mut(token) {
            Some(row) if row.status == expected => {
                row.status = next;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn purge_expired(
        &self,
        _ctx: &OperationContext,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, tx| !tx.is_expired(now));
        Ok((before - rows.len()) as u64)
    }
}

#[derive(Default)]
pub struct MemoryInvoiceStore {
    // (customer_email, invoice_number) -> record; BTreeMap keeps invoice numbers sorted
    rows: RwLock<BTreeMap<(String, String), InvoiceRecord>>,
}

impl MemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<InvoiceRecord> {
        self.rows.read().await.values().cloned().collect()
    }
}

#[async_trait]
impl InvoiceStore for MemoryInvoiceStore {
    async fn put(&self, _ctx: &OperationContext, record: &InvoiceRecord) -> Result<(), AppError> {
        self.rows.write().await.insert(
            (record.customer_email.clone(), record.invoice_number.clone()),
            record.clone(),
        );
        Ok(())
    }

    async fn query_by_customer(
        &self,
        _ctx: &OperationContext,
        customer_email: &str,
    ) -> Result<Vec<InvoiceRecord>, AppError> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|((email, _), _)| email == customer_email)
            .map(|(_, record)| record.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryInvoiceTransactionLog {
    entries: RwLock<Vec<InvoiceTransaction>>,
}

impl MemoryInvoiceTransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<InvoiceTransaction> {
        self.entries.read().await.clone()
    }
}

#[async_trait]
impl InvoiceTransactionLog for MemoryInvoiceTransactionLog {
    async fn put(
        &self,
        _ctx: &OperationContext,
        entry: &InvoiceTransaction,
    ) -> Result<(), AppError> {
        let mut entries = self.entries.write().await;
        let duplicate = entries.iter().any(|e| {
            e.file_transaction_token == entry.file_transaction_token
                && e.invoice_transaction_id == entry.invoice_transaction_id
        });
        if !duplicate {
            entries.push(entry.clone());
        }
        Ok(())
    }

    async fn list_for_file(
        &self,
        _ctx: &OperationContext,
        file_transaction_token: &str,
    ) -> Result<Vec<InvoiceTransaction>, AppError> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|e| e.file_transaction_token == file_transaction_token)
            .cloned()
            .collect())
    }

    async fn purge_expired(
        &self,
        _ctx: &OperationContext,
        now: DateTime<Utc>,
    ) -> Result<u64, AppError> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|e| e.ttl >= now.timestamp());
        Ok((before - entries.len()) as u64)
    }
}
