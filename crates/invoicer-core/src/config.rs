//! Configuration module
//!
//! Configuration for the API process and the ingestion consumer it hosts: HTTP server,
//! database, object storage, notification queue and consumer tuning.

use std::env;

use crate::backend_types::{QueueBackend, StorageBackend, StoreBackend};

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const PRESIGNED_URL_EXPIRES_SECONDS: i32 = 300;
const DEFAULT_BUCKET: &str = "invoices";

/// Base configuration shared by every process
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
    /// "json" or "plain"
    pub log_format: String,
}

/// Invoice ingestion configuration
#[derive(Clone, Debug)]
pub struct IngestionConfig {
    pub base: BaseConfig,
    pub store_backend: StoreBackend,
    pub database_url: Option<String>,
    // Object storage
    pub storage_backend: StorageBackend,
    pub invoices_bucket: String,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // MinIO, LocalStack and other S3-compatible endpoints
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub presigned_url_expires_seconds: i32,
    // Notification queue
    pub queue_backend: QueueBackend,
    pub invoice_events_queue_url: Option<String>,
    pub invoice_events_dlq_url: Option<String>,
    // Consumer
    pub consumer_enabled: bool,
    pub consumer_poll_interval_ms: u64,
    pub consumer_batch_size: i32,
    pub consumer_wait_time_seconds: i32,
    pub consumer_max_concurrent_messages: usize,
    pub consumer_max_concurrent_records: usize,
    // Expiry; 0 disables the purge task
    pub expiry_purge_interval_seconds: u64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<IngestionConfig>);

impl Config {
    fn as_ingestion(&self) -> &IngestionConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.as_ingestion().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = IngestionConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_ingestion().validate()
    }

    pub fn server_port(&self) -> u16 {
        self.as_ingestion().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_ingestion().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_ingestion().base.environment
    }

    pub fn log_format(&self) -> &str {
        &self.as_ingestion().base.log_format
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_ingestion().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_ingestion().base.db_timeout_seconds
    }

    pub fn store_backend(&self) -> StoreBackend {
        self.as_ingestion().store_backend
    }

    pub fn database_url(&self) -> Option<&str> {
        self.as_ingestion().database_url.as_deref()
    }

    pub fn storage_backend(&self) -> StorageBackend {
        self.as_ingestion().storage_backend
    }

    pub fn invoices_bucket(&self) -> &str {
        &self.as_ingestion().invoices_bucket
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.as_ingestion().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.as_ingestion().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.as_ingestion().aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.as_ingestion().local_storage_path.as_deref()
    }

    pub fn presigned_url_expires_seconds(&self) -> i32 {
        self.as_ingestion().presigned_url_expires_seconds
    }

    pub fn queue_backend(&self) -> QueueBackend {
        self.as_ingestion().queue_backend
    }

    pub fn invoice_events_queue_url(&self) -> Option<&str> {
        self.as_ingestion().invoice_events_queue_url.as_deref()
    }

    pub fn invoice_events_dlq_url(&self) -> Option<&str> {
        self.as_ingestion().invoice_events_dlq_url.as_deref()
    }

    pub fn consumer_enabled(&self) -> bool {
        self.as_ingestion().consumer_enabled
    }

    pub fn consumer_poll_interval_ms(&self) -> u64 {
        self.as_ingestion().consumer_poll_interval_ms
    }

    pub fn consumer_batch_size(&self) -> i32 {
        self.as_ingestion().consumer_batch_size
    }

    pub fn consumer_wait_time_seconds(&self) -> i32 {
        self.as_ingestion().consumer_wait_time_seconds
    }

    pub fn consumer_max_concurrent_messages(&self) -> usize {
        self.as_ingestion().consumer_max_concurrent_messages
    }

    pub fn consumer_max_concurrent_records(&self) -> usize {
        self.as_ingestion().consumer_max_concurrent_records
    }

    pub fn expiry_purge_interval_seconds(&self) -> u64 {
        self.as_ingestion().expiry_purge_interval_seconds
    }
}

impl IngestionConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        const CONSUMER_POLL_INTERVAL_MS: u64 = 1000;
        const CONSUMER_BATCH_SIZE: i32 = 5;
        const CONSUMER_WAIT_TIME_SECONDS: i32 = 0;
        const CONSUMER_MAX_CONCURRENT_MESSAGES: usize = 4;
        const CONSUMER_MAX_CONCURRENT_RECORDS: usize = 4;
        const EXPIRY_PURGE_INTERVAL_SECONDS: u64 = 300;

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins_str = env::var("CORS_ORIGINS").unwrap_or_else(|_| "*".to_string());
        let is_production =
            environment.to_lowercase() == "production" || environment.to_lowercase() == "prod";
        if is_production && cors_origins_str.trim() == "*" {
            return Err(anyhow::anyhow!(
                "CORS_ORIGINS cannot be '*' in production. Please specify explicit origins."
            ));
        }

        let cors_origins: Vec<String> = cors_origins_str
            .split(',')
            .map(|s| s.trim().to_string())
            .collect();

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| "4000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            cors_origins,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
            log_format: env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .to_lowercase(),
        };

        let store_backend = env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;
        let storage_backend = env::var("STORAGE_BACKEND")
            .unwrap_or_else(|_| "s3".to_string())
            .parse()?;
        let queue_backend = env::var("QUEUE_BACKEND")
            .unwrap_or_else(|_| "sqs".to_string())
            .parse()?;

        let config = IngestionConfig {
            base,
            store_backend,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            storage_backend,
            invoices_bucket: env::var("INVOICES_BUCKET")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            s3_region: env::var("S3_REGION").ok(),
            s3_endpoint: env::var("S3_ENDPOINT").ok(),
            aws_region: env::var("AWS_REGION").ok(),
            local_storage_path: env::var("LOCAL_STORAGE_PATH").ok(),
            presigned_url_expires_seconds: env::var("PRESIGNED_URL_EXPIRES_SECONDS")
                .unwrap_or_else(|_| PRESIGNED_URL_EXPIRES_SECONDS.to_string())
                .parse()
                .unwrap_or(PRESIGNED_URL_EXPIRES_SECONDS),
            queue_backend,
            invoice_events_queue_url: env::var("INVOICE_EVENTS_QUEUE_URL")
                .ok()
                .filter(|s| !s.is_empty()),
            invoice_events_dlq_url: env::var("INVOICE_EVENTS_DLQ_URL")
                .ok()
                .filter(|s| !s.is_empty()),
            consumer_enabled: env::var("CONSUMER_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
            consumer_poll_interval_ms: env::var("CONSUMER_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| CONSUMER_POLL_INTERVAL_MS.to_string())
                .parse()
                .unwrap_or(CONSUMER_POLL_INTERVAL_MS),
            consumer_batch_size: env::var("CONSUMER_BATCH_SIZE")
                .unwrap_or_else(|_| CONSUMER_BATCH_SIZE.to_string())
                .parse()
                .unwrap_or(CONSUMER_BATCH_SIZE),
            consumer_wait_time_seconds: env::var("CONSUMER_WAIT_TIME_SECONDS")
                .unwrap_or_else(|_| CONSUMER_WAIT_TIME_SECONDS.to_string())
                .parse()
                .unwrap_or(CONSUMER_WAIT_TIME_SECONDS),
            consumer_max_concurrent_messages: env::var("CONSUMER_MAX_CONCURRENT_MESSAGES")
                .unwrap_or_else(|_| CONSUMER_MAX_CONCURRENT_MESSAGES.to_string())
                .parse()
                .unwrap_or(CONSUMER_MAX_CONCURRENT_MESSAGES),
            consumer_max_concurrent_records: env::var("CONSUMER_MAX_CONCURRENT_RECORDS")
                .unwrap_or_else(|_| CONSUMER_MAX_CONCURRENT_RECORDS.to_string())
                .parse()
                .unwrap_or(CONSUMER_MAX_CONCURRENT_RECORDS),
            expiry_purge_interval_seconds: env::var("EXPIRY_PURGE_INTERVAL_SECONDS")
                .unwrap_or_else(|_| EXPIRY_PURGE_INTERVAL_SECONDS.to_string())
                .parse()
                .unwrap_or(EXPIRY_PURGE_INTERVAL_SECONDS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.store_backend == StoreBackend::Postgres {
            match self.database_url.as_deref() {
                None => {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be set when using the postgres store backend"
                    ))
                }
                Some(url)
                    if !url.starts_with("postgres://") && !url.starts_with("postgresql://") =>
                {
                    return Err(anyhow::anyhow!(
                        "DATABASE_URL must be a valid PostgreSQL connection string"
                    ))
                }
                Some(_) => {}
            }
        }

        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }

        if self.queue_backend == QueueBackend::Sqs && self.invoice_events_queue_url.is_none() {
            return Err(anyhow::anyhow!(
                "INVOICE_EVENTS_QUEUE_URL must be set when using the SQS queue backend"
            ));
        }

        // SQS caps a single receive at 10 messages
        if !(1..=10).contains(&self.consumer_batch_size) {
            return Err(anyhow::anyhow!(
                "CONSUMER_BATCH_SIZE must be between 1 and 10"
            ));
        }

        if !(0..=20).contains(&self.consumer_wait_time_seconds) {
            return Err(anyhow::anyhow!(
                "CONSUMER_WAIT_TIME_SECONDS must be between 0 and 20"
            ));
        }

        if self.consumer_max_concurrent_messages == 0 || self.consumer_max_concurrent_records == 0
        {
            return Err(anyhow::anyhow!(
                "Consumer concurrency limits must be at least 1"
            ));
        }

        if self.presigned_url_expires_seconds <= 0 {
            return Err(anyhow::anyhow!(
                "PRESIGNED_URL_EXPIRES_SECONDS must be positive"
            ));
        }

        Ok(())
    }

    /// In-process configuration with memory adapters and local storage, used by tests
    /// and local development.
    pub fn for_memory_backends(local_storage_path: impl Into<String>) -> Self {
        IngestionConfig {
            base: BaseConfig {
                server_port: 4000,
                cors_origins: vec!["*".to_string()],
                db_max_connections: MAX_CONNECTIONS,
                db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
                environment: "development".to_string(),
                log_format: "plain".to_string(),
            },
            store_backend: StoreBackend::Memory,
            database_url: None,
            storage_backend: StorageBackend::Local,
            invoices_bucket: DEFAULT_BUCKET.to_string(),
            s3_region: None,
            s3_endpoint: None,
            aws_region: None,
            local_storage_path: Some(local_storage_path.into()),
            presigned_url_expires_seconds: PRESIGNED_URL_EXPIRES_SECONDS,
            queue_backend: QueueBackend::Memory,
            invoice_events_queue_url: None,
            invoice_events_dlq_url: None,
            consumer_enabled: false,
            consumer_poll_interval_ms: 1000,
            consumer_batch_size: 5,
            consumer_wait_time_seconds: 0,
            consumer_max_concurrent_messages: 4,
            consumer_max_concurrent_records: 4,
            expiry_purge_interval_seconds: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_config_is_valid() {
        let config = Config(Box::new(IngestionConfig::for_memory_backends("/tmp/invoicer")));
        assert!(config.validate().is_ok());
        assert_eq!(config.invoices_bucket(), "invoices");
        assert_eq!(config.presigned_url_expires_seconds(), 300);
        assert!(!config.is_production());
    }

    #[test]
    fn postgres_requires_database_url() {
        let mut inner = IngestionConfig::for_memory_backends("/tmp/invoicer");
        inner.store_backend = StoreBackend::Postgres;
        assert!(inner.validate().is_err());

        inner.database_url = Some("mysql://localhost/invoices".to_string());
        assert!(inner.validate().is_err());

        inner.database_url = Some("postgres://localhost/invoices".to_string());
        assert!(inner.validate().is_ok());
    }

    #[test]
    fn sqs_requires_queue_url() {
        let mut inner = IngestionConfig::for_memory_backends("/tmp/invoicer");
        inner.queue_backend = QueueBackend::Sqs;
        assert!(inner.validate().is_err());

        inner.invoice_events_queue_url =
            Some("https://sqs.eu-west-1.amazonaws.com/123/invoice-events".to_string());
        assert!(inner.validate().is_ok());
    }

    #[test]
    fn batch_size_is_capped_by_sqs_limit() {
        let mut inner = IngestionConfig::for_memory_backends("/tmp/invoicer");
        inner.consumer_batch_size = 11;
        assert!(inner.validate().is_err());
        inner.consumer_batch_size = 0;
        assert!(inner.validate().is_err());
        inner.consumer_batch_size = 10;
        assert!(inner.validate().is_ok());
    }

    #[test]
    fn s3_requires_region() {
        let mut inner = IngestionConfig::for_memory_backends("/tmp/invoicer");
        inner.storage_backend = StorageBackend::S3;
        assert!(inner.validate().is_err());
        inner.aws_region = Some("eu-west-1".to_string());
        assert!(inner.validate().is_ok());
    }
}
