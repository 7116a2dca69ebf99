//! Test helpers: in-memory stores, a tempdir-backed LocalStorage and a pipeline wired
//! over them.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use invoicer_core::models::{FileTransaction, FileTransactionStatus, InvoiceRecord, ObjectRef};
use invoicer_core::{AppError, OperationContext, StorageBackend};
use invoicer_db::{
    FileTransactionStore, InvoiceStore, MemoryFileTransactionStore, MemoryInvoiceStore,
    MemoryInvoiceTransactionLog,
};
use invoicer_storage::{ByteStream, LocalStorage, Storage, StorageError, StorageResult};
use invoicer_worker::ObjectPipeline;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const BUCKET: &str = "invoices";

pub struct TestPipeline {
    pub pipeline: Arc<ObjectPipeline>,
    pub file_transactions: Arc<MemoryFileTransactionStore>,
    pub invoices: Arc<MemoryInvoiceStore>,
    pub invoice_transactions: Arc<MemoryInvoiceTransactionLog>,
    pub storage: Arc<LocalStorage>,
    pub _temp_dir: TempDir,
}

impl TestPipeline {
    pub async fn new() -> Self {
        let temp_dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(
            LocalStorage::new(temp_dir.path(), BUCKET.to_string())
                .await
                .unwrap(),
        );
        Self::with_storage(storage.clone(), storage, temp_dir)
    }

    /// Pipeline reading through `reader` while the helpers seed files into `storage`.
    pub fn with_storage(
        reader: Arc<dyn Storage>,
        storage: Arc<LocalStorage>,
        temp_dir: TempDir,
    ) -> Self {
        let file_transactions = Arc::new(MemoryFileTransactionStore::new());
        let invoices = Arc::new(MemoryInvoiceStore::new());
        let invoice_transactions = Arc::new(MemoryInvoiceTransactionLog::new());

        let pipeline = Arc::new(ObjectPipeline::new(
            file_transactions.clone(),
            invoices.clone(),
            invoice_transactions.clone(),
            reader,
        ));

        Self {
            pipeline,
            file_transactions,
            invoices,
            invoice_transactions,
            storage,
            _temp_dir: temp_dir,
        }
    }

    /// Register a `GENERATED` transaction and upload its file.
    pub async fn seed_file(&self, token: &str, lines: &[&str]) {
        self.seed_status(token, FileTransactionStatus::Generated).await;
        self.upload(token, lines).await;
    }

    pub async fn seed_status(&self, token: &str, status: FileTransactionStatus) {
        let mut tx = FileTransaction::generated(token, "req-1", 300, Utc::now());
        tx.status = status;
        self.file_transactions.insert(tx).await;
    }

    pub async fn upload(&self, token: &str, lines: &[&str]) {
        let mut body = lines.join("\n");
        body.push('\n');
        self.storage
            .upload_with_key(BUCKET, token, body.into_bytes())
            .await
            .unwrap();
    }

    pub async fn status(&self, token: &str) -> Option<FileTransactionStatus> {
        self.file_transactions
            .get(&OperationContext::new(), token)
            .await
            .unwrap()
            .map(|tx| tx.status)
    }

    pub async fn object_exists(&self, token: &str) -> bool {
        self.storage.exists(BUCKET, token).await.unwrap()
    }

    pub fn object(token: &str) -> ObjectRef {
        ObjectRef::new(BUCKET, token)
    }
}

pub fn invoice_line(email: &str, number: &str, total: &str, products: &[(&str, i32)]) -> String {
    let products: Vec<String> = products
        .iter()
        .map(|(id, quantity)| format!(r#"{{"id":"{}","quantity":{}}}"#, id, quantity))
        .collect();
    format!(
        r#"{{"customerEmail":"{}","invoiceNumber":"{}","totalValue":{},"products":[{}]}}"#,
        email,
        number,
        total,
        products.join(",")
    )
}

/// Storage whose object yields `body` and then a read error.
pub struct BrokenStreamStorage {
    pub body: &'static str,
}

#[async_trait]
impl Storage for BrokenStreamStorage {
    async fn open_read(&self, _bucket: &str, _key: &str) -> StorageResult<ByteStream> {
        let chunks: Vec<Result<Bytes, StorageError>> = vec![
            Ok(Bytes::from_static(self.body.as_bytes())),
            Err(StorageError::DownloadFailed("connection reset".to_string())),
        ];
        Ok(Box::pin(futures::stream::iter(chunks)))
    }

    async fn delete(&self, _bucket: &str, _key: &str) -> StorageResult<()> {
        panic!("a file with a read error must not be deleted");
    }

    async fn exists(&self, _bucket: &str, _key: &str) -> StorageResult<bool> {
        Ok(true)
    }

    async fn upload_with_key(&self, _bucket: &str, _key: &str, _data: Vec<u8>) -> StorageResult<()> {
        Ok(())
    }

    async fn presigned_put_url(&self, _key: &str, _expires_in: Duration) -> StorageResult<String> {
        Err(StorageError::ConfigError("not supported".to_string()))
    }

    fn default_bucket(&self) -> &str {
        BUCKET
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}

/// Invoice store that rejects every write.
#[derive(Default)]
pub struct FailingInvoiceStore {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl InvoiceStore for FailingInvoiceStore {
    async fn put(&self, _ctx: &OperationContext, _record: &InvoiceRecord) -> Result<(), AppError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AppError::Internal("write rejected".to_string()))
    }

    async fn query_by_customer(
        &self,
        _ctx: &OperationContext,
        _customer_email: &str,
    ) -> Result<Vec<InvoiceRecord>, AppError> {
        Ok(Vec::new())
    }
}
