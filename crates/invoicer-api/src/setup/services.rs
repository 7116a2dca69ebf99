//! Store, queue and worker wiring

use crate::state::{AppState, StoreState};
use anyhow::Result;
use invoicer_core::{Config, QueueBackend, StoreBackend};
use invoicer_db::{
    MemoryFileTransactionStore, MemoryInvoiceStore, MemoryInvoiceTransactionLog,
    PgFileTransactionStore, PgInvoiceStore, PgInvoiceTransactionLog,
};
use invoicer_storage::Storage;
use invoicer_worker::{
    ConsumerConfig, ExpiryService, ExpiryWorker, IngestionConsumer, IngestionWorker, MemoryQueue,
    NotificationQueue, ObjectPipeline,
};
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;

/// Background tasks hosted by the API process.
#[derive(Default)]
pub struct BackgroundWorkers {
    pub ingestion: Option<IngestionWorker>,
    pub expiry: Option<ExpiryWorker>,
}

impl BackgroundWorkers {
    pub fn is_consuming(&self) -> bool {
        self.ingestion.is_some()
    }

    /// Stop every running task, letting in-flight work finish.
    pub async fn shutdown(self) {
        if let Some(worker) = self.ingestion {
            worker.shutdown().await;
        }
        if let Some(worker) = self.expiry {
            worker.shutdown().await;
        }
    }
}

/// Build the stores for the configured backend.
pub fn setup_stores(config: &Config, pool: Option<PgPool>) -> Result<StoreState> {
    let stores = match (config.store_backend(), pool) {
        (StoreBackend::Postgres, Some(pool)) => StoreState {
            file_transactions: Arc::new(PgFileTransactionStore::new(pool.clone())),
            invoices: Arc::new(PgInvoiceStore::new(pool.clone())),
            invoice_transactions: Arc::new(PgInvoiceTransactionLog::new(pool)),
        },
        (StoreBackend::Postgres, None) => {
            return Err(anyhow::anyhow!(
                "postgres store backend selected but no database pool was created"
            ));
        }
        (StoreBackend::Memory, _) => {
            tracing::warn!("Using in-memory stores; data is lost on restart");
            StoreState {
                file_transactions: Arc::new(MemoryFileTransactionStore::new()),
                invoices: Arc::new(MemoryInvoiceStore::new()),
                invoice_transactions: Arc::new(MemoryInvoiceTransactionLog::new()),
            }
        }
    };
    Ok(stores)
}

/// Build the notification queue for the configured backend.
pub async fn setup_queue(config: &Config) -> Result<Arc<dyn NotificationQueue>> {
    match config.queue_backend() {
        #[cfg(feature = "queue-sqs")]
        QueueBackend::Sqs => {
            let queue_url = config
                .invoice_events_queue_url()
                .ok_or_else(|| anyhow::anyhow!("INVOICE_EVENTS_QUEUE_URL not configured"))?
                .to_string();
            let region = config
                .aws_region()
                .or_else(|| config.s3_region())
                .map(String::from);

            let queue = invoicer_worker::SqsQueue::new(
                queue_url,
                config.invoice_events_dlq_url().map(String::from),
                region,
                None,
                config.consumer_wait_time_seconds(),
            )
            .await?;

            if config.invoice_events_dlq_url().is_none() {
                tracing::warn!("No INVOICE_EVENTS_DLQ_URL configured; poison messages are logged and dropped");
            }
            Ok(Arc::new(queue))
        }

        #[cfg(not(feature = "queue-sqs"))]
        QueueBackend::Sqs => Err(anyhow::anyhow!(
            "SQS queue backend not available (queue-sqs feature not enabled)"
        )),

        QueueBackend::Memory => {
            tracing::warn!("Using in-memory notification queue; nothing will publish to it");
            Ok(Arc::new(MemoryQueue::new()))
        }
    }
}

/// Initialize stores and queue and assemble the application state
pub async fn initialize_services(
    config: &Config,
    pool: Option<PgPool>,
    storage: Arc<dyn Storage>,
) -> Result<Arc<AppState>> {
    let stores = setup_stores(config, pool.clone())?;
    let queue = setup_queue(config).await?;

    tracing::info!(
        store_backend = %config.store_backend(),
        queue_backend = queue.backend_name(),
        "Services initialized"
    );

    Ok(Arc::new(AppState {
        config: config.clone(),
        stores,
        storage,
        queue,
        pool,
    }))
}

/// Start the ingestion worker when the consumer is enabled.
pub fn start_ingestion_worker(
    config: &Config,
    state: &Arc<AppState>,
) -> Result<Option<IngestionWorker>> {
    if !config.consumer_enabled() {
        tracing::info!("Ingestion consumer disabled (CONSUMER_ENABLED=false)");
        return Ok(None);
    }

    let pipeline = Arc::new(ObjectPipeline::new(
        state.stores.file_transactions.clone(),
        state.stores.invoices.clone(),
        state.stores.invoice_transactions.clone(),
        state.storage.clone(),
    ));
    let consumer = Arc::new(IngestionConsumer::new(
        state.queue.clone(),
        pipeline,
        ConsumerConfig::from_config(config),
    ));

    Ok(Some(IngestionWorker::start(consumer)))
}

/// Start the ttl purge task unless `EXPIRY_PURGE_INTERVAL_SECONDS` is 0.
pub fn start_expiry_worker(config: &Config, state: &Arc<AppState>) -> Option<ExpiryWorker> {
    let every = config.expiry_purge_interval_seconds();
    if every == 0 {
        tracing::info!("Expiry purge disabled (EXPIRY_PURGE_INTERVAL_SECONDS=0)");
        return None;
    }

    let service = Arc::new(ExpiryService::new(
        state.stores.file_transactions.clone(),
        state.stores.invoice_transactions.clone(),
    ));
    Some(service.start(Duration::from_secs(every)))
}

/// Start every background task the configuration enables.
pub fn start_background_workers(
    config: &Config,
    state: &Arc<AppState>,
) -> Result<BackgroundWorkers> {
    Ok(BackgroundWorkers {
        ingestion: start_ingestion_worker(config, state)?,
        expiry: start_expiry_worker(config, state),
    })
}
