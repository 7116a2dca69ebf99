mod helpers;

use chrono::Utc;
use helpers::{api_path, setup_test_app};
use invoicer_core::models::{InvoiceRecord, LineItem};
use invoicer_core::OperationContext;
use invoicer_db::InvoiceStore;
use rust_decimal::Decimal;
use serde_json::Value;

fn invoice(email: &str, number: &str, total: i64) -> InvoiceRecord {
    InvoiceRecord {
        customer_email: email.to_string(),
        invoice_number: number.to_string(),
        total_value: Decimal::from(total),
        line_items: vec![LineItem {
            product_id: "P1".to_string(),
            quantity: 1,
        }],
        invoice_transaction_id: format!("itx-{}", number),
        file_transaction_token: "abc".to_string(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_list_invoices_for_customer_in_number_order() {
    let app = setup_test_app().await;
    let ctx = OperationContext::new();
    for record in [
        invoice("a@x.com", "INV2", 20),
        invoice("b@x.com", "INV1", 99),
        invoice("a@x.com", "INV1", 10),
    ] {
        app.invoices.put(&ctx, &record).await.unwrap();
    }

    let response = app
        .client()
        .get(&api_path("/invoices"))
        .add_query_param("email", "a@x.com")
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    let numbers: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["invoiceNumber"].as_str().unwrap())
        .collect();
    assert_eq!(numbers, vec!["INV1", "INV2"]);
    assert_eq!(body[0]["customerEmail"], "a@x.com");
    assert_eq!(body[0]["lineItems"][0]["productId"], "P1");
}

#[tokio::test]
async fn test_list_invoices_for_unknown_customer_is_empty() {
    let app = setup_test_app().await;

    let response = app
        .client()
        .get(&api_path("/invoices"))
        .add_query_param("email", "nobody@x.com")
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_list_invoices_requires_email() {
    let app = setup_test_app().await;

    let missing = app.client().get(&api_path("/invoices")).await;
    assert_eq!(missing.status_code(), 400);

    let blank = app
        .client()
        .get(&api_path("/invoices"))
        .add_query_param("email", "  ")
        .await;
    assert_eq!(blank.status_code(), 400);
    let body: Value = blank.json();
    assert_eq!(body["code"], "INVALID_INPUT");
}
