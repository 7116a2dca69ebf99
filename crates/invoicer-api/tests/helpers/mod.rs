//! Test helpers: build AppState over in-memory stores and queue and wrap the router in an
//! axum-test server.
//!
//! Run from workspace root: `cargo test -p invoicer-api`.

use async_trait::async_trait;
use axum_test::TestServer;
use invoicer_api::setup::routes;
use invoicer_api::{AppState, StoreState};
use invoicer_core::{Config, IngestionConfig, StorageBackend};
use invoicer_db::{MemoryFileTransactionStore, MemoryInvoiceStore, MemoryInvoiceTransactionLog};
use invoicer_storage::{ByteStream, LocalStorage, Storage, StorageResult};
use invoicer_worker::MemoryQueue;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const BUCKET: &str = "invoices";

/// API path prefix for tests (e.g. `/api/v0`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", invoicer_api::constants::API_PREFIX, path)
}

pub fn test_config(temp_dir: &TempDir) -> Config {
    Config(Box::new(IngestionConfig::for_memory_backends(
        temp_dir.path().to_string_lossy(),
    )))
}

/// LocalStorage that also issues fake presigned URLs, standing in for S3.
pub struct PresigningStorage {
    inner: LocalStorage,
}

impl PresigningStorage {
    pub async fn new(temp_dir: &TempDir) -> Self {
        Self {
            inner: LocalStorage::new(temp_dir.path(), BUCKET.to_string())
                .await
                .unwrap(),
        }
    }
}

#[async_trait]
impl Storage for PresigningStorage {
    async fn open_read(&self, bucket: &str, key: &str) -> StorageResult<ByteStream> {
        self.inner.open_read(bucket, key).await
    }

    async fn delete(&self, bucket: &str, key: &str) -> StorageResult<()> {
        self.inner.delete(bucket, key).await
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        self.inner.exists(bucket, key).await
    }

    async fn upload_with_key(&self, bucket: &str, key: &str, data: Vec<u8>) -> StorageResult<()> {
        self.inner.upload_with_key(bucket, key, data).await
    }

    async fn presigned_put_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        Ok(format!(
            "https://{}.s3.example.com/{}?X-Amz-Expires={}",
            BUCKET,
            key,
            expires_in.as_secs()
        ))
    }

    fn default_bucket(&self) -> &str {
        BUCKET
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

/// Test application: server plus handles on the in-memory adapters behind it.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub file_transactions: Arc<MemoryFileTransactionStore>,
    pub invoices: Arc<MemoryInvoiceStore>,
    pub invoice_transactions: Arc<MemoryInvoiceTransactionLog>,
    pub storage: Arc<PresigningStorage>,
    pub queue: Arc<MemoryQueue>,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub async fn setup_test_app() -> TestApp {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
    let config = test_config(&temp_dir);

    let file_transactions = Arc::new(MemoryFileTransactionStore::new());
    let invoices = Arc::new(MemoryInvoiceStore::new());
    let invoice_transactions = Arc::new(MemoryInvoiceTransactionLog::new());
    let storage = Arc::new(PresigningStorage::new(&temp_dir).await);
    let queue = Arc::new(MemoryQueue::new());

    let state = Arc::new(AppState {
        config: config.clone(),
        stores: StoreState {
            file_transactions: file_transactions.clone(),
            invoices: invoices.clone(),
            invoice_transactions: invoice_transactions.clone(),
        },
        storage: storage.clone(),
        queue: queue.clone(),
        pool: None,
    });

    let router = routes::setup_routes(&config, state.clone()).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to create test server");

    TestApp {
        server,
        state,
        file_transactions,
        invoices,
        invoice_transactions,
        storage,
        queue,
        _temp_dir: temp_dir,
    }
}
