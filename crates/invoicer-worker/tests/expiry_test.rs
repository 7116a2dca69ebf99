//! Expiry purge over the in-memory stores.

use chrono::{Duration as ChronoDuration, Utc};
use invoicer_core::models::{FileTransaction, InvoiceOutcome, InvoiceTransaction};
use invoicer_core::OperationContext;
use invoicer_db::{
    FileTransactionStore, InvoiceTransactionLog, MemoryFileTransactionStore,
    MemoryInvoiceTransactionLog,
};
use invoicer_worker::{ExpiryService, ExpirySummary};
use std::sync::Arc;
use std::time::Duration;

struct Stores {
    file_transactions: Arc<MemoryFileTransactionStore>,
    invoice_transactions: Arc<MemoryInvoiceTransactionLog>,
    service: Arc<ExpiryService>,
}

async fn seeded_stores() -> Stores {
    let ctx = OperationContext::new();
    let file_transactions = Arc::new(MemoryFileTransactionStore::new());
    let invoice_transactions = Arc::new(MemoryInvoiceTransactionLog::new());
    let hour_ago = Utc::now() - ChronoDuration::seconds(3600);

    file_transactions
        .insert(FileTransaction::generated("stale", "req-1", 300, hour_ago))
        .await;
    file_transactions
        .create(&ctx, "fresh", "req-2", 300)
        .await
        .unwrap();

    invoice_transactions
        .put(
            &ctx,
            &InvoiceTransaction::new("stale", "1", "a@x.com", "INV1", InvoiceOutcome::Ok, hour_ago),
        )
        .await
        .unwrap();
    invoice_transactions
        .put(
            &ctx,
            &InvoiceTransaction::new(
                "fresh",
                "2",
                "b@x.com",
                "INV2",
                InvoiceOutcome::Ok,
                Utc::now(),
            ),
        )
        .await
        .unwrap();

    let service = Arc::new(ExpiryService::new(
        file_transactions.clone(),
        invoice_transactions.clone(),
    ));

    Stores {
        file_transactions,
        invoice_transactions,
        service,
    }
}

#[tokio::test]
async fn purge_removes_expired_rows_from_both_stores() {
    let s = seeded_stores().await;
    let ctx = OperationContext::new();

    let summary = s.service.purge_expired(Utc::now()).await;
    assert_eq!(
        summary,
        ExpirySummary {
            file_transactions: 1,
            invoice_transactions: 1,
        }
    );

    assert!(s.file_transactions.get(&ctx, "stale").await.unwrap().is_none());
    assert!(s.file_transactions.get(&ctx, "fresh").await.unwrap().is_some());
    assert!(s
        .invoice_transactions
        .list_for_file(&ctx, "stale")
        .await
        .unwrap()
        .is_empty());
    assert_eq!(
        s.invoice_transactions
            .list_for_file(&ctx, "fresh")
            .await
            .unwrap()
            .len(),
        1
    );

    // Nothing left to purge
    assert_eq!(
        s.service.purge_expired(Utc::now()).await,
        ExpirySummary::default()
    );
}

#[tokio::test]
async fn worker_purges_on_start_and_shuts_down() {
    let s = seeded_stores().await;
    let ctx = OperationContext::new();

    let worker = s.service.clone().start(Duration::from_secs(3600));

    let mut purged = false;
    for _ in 0..100 {
        if s.file_transactions.get(&ctx, "stale").await.unwrap().is_none() {
            purged = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    worker.shutdown().await;

    assert!(purged);
    assert!(s
        .invoice_transactions
        .list_for_file(&ctx, "stale")
        .await
        .unwrap()
        .is_empty());
}
