//! Object-created notification envelope
//!
//! The queue carries S3-style event notifications:
//!
//! ```json
//! {"Records":[{"s3":{"bucket":{"name":"invoices"},"object":{"key":"abc","size":120}}}]}
//! ```
//!
//! Object keys arrive URL-encoded with `+` standing for a space.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Malformed notification body: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Notification contains no records")]
    NoRecords,

    #[error("Invalid object key encoding: {0}")]
    InvalidKey(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ObjectCreatedNotification {
    #[serde(rename = "Records", default)]
    pub records: Vec<NotificationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NotificationRecord {
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3Entity {
    pub bucket: S3Bucket,
    pub object: S3Object,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3Bucket {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct S3Object {
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Location of one uploaded object.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub bucket: String,
    pub key: String,
}

impl ObjectRef {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl Display for ObjectRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

impl ObjectCreatedNotification {
    /// Parse a queue message body. A body with an empty `Records` array is rejected.
    pub fn parse(body: &str) -> Result<Self, NotificationError> {
        let notification: ObjectCreatedNotification = serde_json::from_str(body)?;
        if notification.records.is_empty() {
            return Err(NotificationError::NoRecords);
        }
        Ok(notification)
    }

    /// Build a single-record notification, as the storage service would emit it.
    pub fn for_object(bucket: impl Into<String>, key: &str) -> Self {
        Self {
            records: vec![NotificationRecord {
                s3: S3Entity {
                    bucket: S3Bucket {
                        name: bucket.into(),
                    },
                    object: S3Object {
                        key: urlencoding::encode(key).replace("%20", "+"),
                        size: None,
                    },
                },
            }],
        }
    }

    pub fn to_body(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl NotificationRecord {
    /// Decoded bucket and key for this record.
    pub fn object_ref(&self) -> Result<ObjectRef, NotificationError> {
        let raw = self.s3.object.key.replace('+', " ");
        let key = urlencoding::decode(&raw)
            .map_err(|e| NotificationError::InvalidKey(e.to_string()))?
            .into_owned();
        Ok(ObjectRef::new(self.s3.bucket.name.clone(), key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_records_and_decodes_keys() {
        let body = r#"{"Records":[{"eventName":"ObjectCreated:Put","s3":{"bucket":{"name":"invoices"},"object":{"key":"2024%2Fmy+file.json","size":42}}}]}"#;
        let notification = ObjectCreatedNotification::parse(body).unwrap();

        assert_eq!(notification.records.len(), 1);
        let object = notification.records[0].object_ref().unwrap();
        assert_eq!(object.bucket, "invoices");
        assert_eq!(object.key, "2024/my file.json");
        assert_eq!(object.to_string(), "invoices/2024/my file.json");
    }

    #[test]
    fn rejects_bodies_without_records() {
        assert!(matches!(
            ObjectCreatedNotification::parse(r#"{"Records":[]}"#),
            Err(NotificationError::NoRecords)
        ));
        assert!(matches!(
            ObjectCreatedNotification::parse(r#"{"Event":"s3:TestEvent"}"#),
            Err(NotificationError::NoRecords)
        ));
        assert!(matches!(
            ObjectCreatedNotification::parse("{{not json"),
            Err(NotificationError::Malformed(_))
        ));
    }

    #[test]
    fn built_notifications_decode_to_the_original_key() {
        let body = ObjectCreatedNotification::for_object("invoices", "a b/c")
            .to_body()
            .unwrap();
        let parsed = ObjectCreatedNotification::parse(&body).unwrap();
        assert_eq!(parsed.records[0].object_ref().unwrap().key, "a b/c");
    }
}
