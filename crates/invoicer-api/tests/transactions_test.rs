mod helpers;

use helpers::{api_path, setup_test_app, test_config};
use invoicer_api::setup::{routes, services};
use invoicer_core::models::FileTransactionStatus;
use invoicer_core::OperationContext;
use invoicer_db::FileTransactionStore;
use axum_test::TestServer;
use serde_json::Value;

#[tokio::test]
async fn test_create_transaction_issues_url_and_registers_token() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .post(&api_path("/transactions"))
        .add_header("requestId", "req-1")
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    let token = body["transactionId"].as_str().unwrap().to_string();
    assert_eq!(body["expiresIn"], 300);
    assert!(body["url"].as_str().unwrap().contains(&token));
    assert!(body["url"].as_str().unwrap().contains("X-Amz-Expires=300"));

    let tx = app
        .file_transactions
        .get(&OperationContext::new(), &token)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tx.status, FileTransactionStatus::Generated);
    assert_eq!(tx.requester_id, "req-1");
    assert_eq!(tx.expires_in_seconds, 300);
}

#[tokio::test]
async fn test_create_transaction_requires_request_id_header() {
    let app = setup_test_app().await;

    let response = app.client().post(&api_path("/transactions")).await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_get_transaction_status() {
    let app = setup_test_app().await;

    let created: Value = app
        .client()
        .post(&api_path("/transactions"))
        .add_header("requestId", "req-2")
        .await
        .json();
    let token = created["transactionId"].as_str().unwrap();

    let response = app
        .client()
        .get(&api_path(&format!("/transactions/{}", token)))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["transactionId"], token);
    assert_eq!(body["status"], "GENERATED");
}

#[tokio::test]
async fn test_unknown_transaction_returns_404() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(&api_path("/transactions/does-not-exist"))
        .await;

    assert_eq!(response.status_code(), 404);
    let body: Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_presign_failure_creates_no_transaction() {
    // Memory config wires plain LocalStorage, which cannot presign
    let temp_dir = tempfile::tempdir().unwrap();
    let config = test_config(&temp_dir);
    let storage = invoicer_api::setup::storage::setup_storage(&config).await.unwrap();
    let state = services::initialize_services(&config, None, storage)
        .await
        .unwrap();
    let server = TestServer::new(routes::setup_routes(&config, state).unwrap()).unwrap();

    let response = server
        .post(&api_path("/transactions"))
        .add_header("requestId", "req-3")
        .await;

    assert_eq!(response.status_code(), 500);
    let body: Value = response.json();
    assert_eq!(body["code"], "STORAGE_ERROR");
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get("/health/live")
        .add_header("X-Request-ID", "trace-123")
        .await;

    assert_eq!(response.status_code(), 200);
    assert_eq!(response.header("x-request-id"), "trace-123");
}
