use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::invoice_transaction::InvoiceOutcome;

/// One line of an uploaded invoice file.
///
/// Unknown fields are ignored so producers can add fields without breaking ingestion.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceFileLine {
    pub customer_email: String,
    pub invoice_number: String,
    pub total_value: Decimal,
    #[serde(default)]
    pub products: Vec<InvoiceFileProduct>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct InvoiceFileProduct {
    pub id: String,
    pub quantity: i32,
}

impl InvoiceFileLine {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// An invoice without products is still accepted, but flagged.
    pub fn outcome(&self) -> InvoiceOutcome {
        if self.products.is_empty() {
            InvoiceOutcome::EmptyProductList
        } else {
            InvoiceOutcome::Ok
        }
    }

    pub fn to_record(
        &self,
        invoice_transaction_id: &str,
        file_transaction_token: &str,
        created_at: DateTime<Utc>,
    ) -> InvoiceRecord {
        InvoiceRecord {
            customer_email: self.customer_email.clone(),
            invoice_number: self.invoice_number.clone(),
            total_value: self.total_value,
            line_items: self
                .products
                .iter()
                .map(|p| LineItem {
                    product_id: p.id.clone(),
                    quantity: p.quantity,
                })
                .collect(),
            invoice_transaction_id: invoice_transaction_id.to_string(),
            file_transaction_token: file_transaction_token.to_string(),
            created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: String,
    pub quantity: i32,
}

/// An accepted invoice. `(customer_email, invoice_number)` identifies the row; a later
/// write with the same key replaces the earlier one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceRecord {
    pub customer_email: String,
    pub invoice_number: String,
    #[schema(value_type = f64)]
    pub total_value: Decimal,
    pub line_items: Vec<LineItem>,
    pub invoice_transaction_id: String,
    pub file_transaction_token: String,
    pub created_at: DateTime<Utc>,
}

/// Query parameters for `GET /invoices`
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct InvoiceQuery {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 320,
        message = "email query parameter is required and at most 320 characters"
    ))]
    pub email: String,
}

impl InvoiceQuery {
    /// Trim surrounding whitespace so a blank email fails validation.
    pub fn normalized(self) -> Self {
        Self {
            email: self.email.trim().to_string(),
        }
    }
}
