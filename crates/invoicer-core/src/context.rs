//! Explicit operation context
//!
//! Every store, queue and pipeline call receives an [`OperationContext`] carrying the
//! correlation identifiers of the unit of work (HTTP request, queue message, file
//! transaction). Log lines pick them up from the span returned by
//! [`OperationContext::span`], so nothing relies on thread-local state.

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationContext {
    request_id: String,
    message_id: Option<String>,
    file_transaction_token: Option<String>,
}

impl OperationContext {
    /// New context with a random request id.
    pub fn new() -> Self {
        Self::from_request_id(Uuid::new_v4().to_string())
    }

    pub fn from_request_id(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            message_id: None,
            file_transaction_token: None,
        }
    }

    /// Child context scoped to one queue message.
    pub fn with_message(&self, message_id: impl Into<String>) -> Self {
        Self {
            message_id: Some(message_id.into()),
            ..self.clone()
        }
    }

    /// Child context scoped to one file transaction.
    pub fn with_file_transaction(&self, token: impl Into<String>) -> Self {
        Self {
            file_transaction_token: Some(token.into()),
            ..self.clone()
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    pub fn file_transaction_token(&self) -> Option<&str> {
        self.file_transaction_token.as_deref()
    }

    /// Tracing span carrying the correlation identifiers.
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "operation",
            request_id = %self.request_id,
            message_id = self.message_id.as_deref().unwrap_or(""),
            file_transaction = self.file_transaction_token.as_deref().unwrap_or(""),
        )
    }
}

impl Default for OperationContext {
    fn default() -> Self {
        Self::new()
    }
}
