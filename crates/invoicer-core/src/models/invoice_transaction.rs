use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

/// Seconds an invoice transaction audit row is kept.
pub const INVOICE_TRANSACTION_TTL_SECONDS: i64 = 300;

/// Outcome of parsing and validating one invoice line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceOutcome {
    Ok,
    EmptyProductList,
}

impl InvoiceOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceOutcome::Ok => "OK",
            InvoiceOutcome::EmptyProductList => "EMPTY_PRODUCT_LIST",
        }
    }
}

impl Display for InvoiceOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InvoiceOutcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OK" => Ok(InvoiceOutcome::Ok),
            "EMPTY_PRODUCT_LIST" => Ok(InvoiceOutcome::EmptyProductList),
            _ => Err(anyhow::anyhow!("Invalid invoice outcome: {}", s)),
        }
    }
}

/// Audit record of one parse/validate attempt, keyed by
/// `(file_transaction_token, invoice_transaction_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InvoiceTransaction {
    pub file_transaction_token: String,
    pub invoice_transaction_id: String,
    pub customer_email: String,
    pub invoice_number: String,
    pub outcome: InvoiceOutcome,
    pub created_at: DateTime<Utc>,
    pub ttl: i64,
}

impl InvoiceTransaction {
    pub fn new(
        file_transaction_token: impl Into<String>,
        invoice_transaction_id: impl Into<String>,
        customer_email: impl Into<String>,
        invoice_number: impl Into<String>,
        outcome: InvoiceOutcome,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            file_transaction_token: file_transaction_token.into(),
            invoice_transaction_id: invoice_transaction_id.into(),
            customer_email: customer_email.into(),
            invoice_number: invoice_number.into(),
            outcome,
            created_at: now,
            ttl: (now + Duration::seconds(INVOICE_TRANSACTION_TTL_SECONDS)).timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_wire_names() {
        assert_eq!(serde_json::to_string(&InvoiceOutcome::Ok).unwrap(), "\"OK\"");
        assert_eq!(
            serde_json::to_string(&InvoiceOutcome::EmptyProductList).unwrap(),
            "\"EMPTY_PRODUCT_LIST\""
        );
        assert_eq!(
            "EMPTY_PRODUCT_LIST".parse::<InvoiceOutcome>().unwrap(),
            InvoiceOutcome::EmptyProductList
        );
    }

    #[test]
    fn ttl_is_derived_from_creation_time() {
        let now = Utc::now();
        let entry = InvoiceTransaction::new("abc", "itx", "a@x.com", "INV1", InvoiceOutcome::Ok, now);
        assert_eq!(entry.ttl, now.timestamp() + INVOICE_TRANSACTION_TTL_SECONDS);
    }
}
