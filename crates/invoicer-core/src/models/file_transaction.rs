use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use utoipa::ToSchema;

/// How long a presigned write URL (and its file transaction) stays valid by default.
pub const DEFAULT_FILE_TRANSACTION_EXPIRES_SECONDS: i32 = 300;

/// Lifecycle state of an uploaded invoice file.
///
/// ```text
/// GENERATED -> FILE_RECEIVED -> FILE_PROCESSED
///                            \-> ERROR
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileTransactionStatus {
    Generated,
    FileReceived,
    FileProcessed,
    Error,
}

impl FileTransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileTransactionStatus::Generated => "GENERATED",
            FileTransactionStatus::FileReceived => "FILE_RECEIVED",
            FileTransactionStatus::FileProcessed => "FILE_PROCESSED",
            FileTransactionStatus::Error => "ERROR",
        }
    }

    /// Whether the state machine has an edge from `self` to `next`.
    pub fn can_transition_to(&self, next: FileTransactionStatus) -> bool {
        matches!(
            (self, next),
            (
                FileTransactionStatus::Generated,
                FileTransactionStatus::FileReceived
            ) | (
                FileTransactionStatus::FileReceived,
                FileTransactionStatus::FileProcessed
            ) | (
                FileTransactionStatus::FileReceived,
                FileTransactionStatus::Error
            )
        )
    }

    /// No further transitions leave a terminal state; `ERROR` is never reprocessed.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            FileTransactionStatus::FileProcessed | FileTransactionStatus::Error
        )
    }
}

impl Display for FileTransactionStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FileTransactionStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GENERATED" => Ok(FileTransactionStatus::Generated),
            "FILE_RECEIVED" => Ok(FileTransactionStatus::FileReceived),
            "FILE_PROCESSED" => Ok(FileTransactionStatus::FileProcessed),
            "ERROR" => Ok(FileTransactionStatus::Error),
            _ => Err(anyhow::anyhow!("Invalid file transaction status: {}", s)),
        }
    }
}

/// One uploaded file's journey, keyed by `token` (which is also the object key).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileTransaction {
    pub token: String,
    pub requester_id: String,
    pub status: FileTransactionStatus,
    pub expires_in_seconds: i32,
    pub created_at: DateTime<Utc>,
    /// Epoch seconds after which the row may be purged.
    pub ttl: i64,
}

impl FileTransaction {
    /// A freshly issued transaction in `GENERATED`.
    pub fn generated(
        token: impl Into<String>,
        requester_id: impl Into<String>,
        expires_in_seconds: i32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            token: token.into(),
            requester_id: requester_id.into(),
            status: FileTransactionStatus::Generated,
            expires_in_seconds,
            created_at: now,
            ttl: (now + Duration::seconds(expires_in_seconds as i64)).timestamp(),
        }
    }

    /// Only `GENERATED` transactions are picked up by the ingestion pipeline.
    pub fn is_eligible_for_ingestion(&self) -> bool {
        self.status == FileTransactionStatus::Generated
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.ttl < now.timestamp()
    }
}

/// Response for `POST /transactions`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileTransactionResponse {
    /// Presigned PUT URL for the invoice file
    pub url: String,
    /// Seconds until the URL expires
    pub expires_in: i32,
    /// File transaction token (also the object key)
    pub transaction_id: String,
}

/// Response for `GET /transactions/{token}`
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileTransactionStatusResponse {
    pub transaction_id: String,
    pub status: FileTransactionStatus,
}

impl From<FileTransaction> for FileTransactionStatusResponse {
    fn from(tx: FileTransaction) -> Self {
        Self {
            transaction_id: tx.token,
            status: tx.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_documented_edges_are_allowed() {
        use FileTransactionStatus::*;

        assert!(Generated.can_transition_to(FileReceived));
        assert!(FileReceived.can_transition_to(FileProcessed));
        assert!(FileReceived.can_transition_to(Error));

        assert!(!Generated.can_transition_to(FileProcessed));
        assert!(!Generated.can_transition_to(Error));
        assert!(!FileProcessed.can_transition_to(Generated));
        assert!(!Error.can_transition_to(FileReceived));
        assert!(!FileReceived.can_transition_to(FileReceived));
    }

    #[test]
    fn status_round_trips_through_its_wire_name() {
        for status in [
            FileTransactionStatus::Generated,
            FileTransactionStatus::FileReceived,
            FileTransactionStatus::FileProcessed,
            FileTransactionStatus::Error,
        ] {
            assert_eq!(status.as_str().parse::<FileTransactionStatus>().unwrap(), status);
            assert_eq!(
                serde_json::to_string(&status).unwrap(),
                format!("\"{}\"", status.as_str())
            );
        }
        assert!("generated".parse::<FileTransactionStatus>().is_err());
    }

    #[test]
    fn generated_transaction_expires_after_its_window() {
        let now = Utc::now();
        let tx = FileTransaction::generated("abc", "req-1", 300, now);

        assert_eq!(tx.status, FileTransactionStatus::Generated);
        assert!(tx.is_eligible_for_ingestion());
        assert_eq!(tx.ttl, now.timestamp() + 300);
        assert!(!tx.is_expired(now));
        assert!(tx.is_expired(now + Duration::seconds(301)));
    }

    #[test]
    fn terminal_states() {
        assert!(FileTransactionStatus::FileProcessed.is_terminal());
        assert!(FileTransactionStatus::Error.is_terminal());
        assert!(!FileTransactionStatus::Generated.is_terminal());
        assert!(!FileTransactionStatus::FileReceived.is_terminal());
    }
}
