use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::error::AppError;
use serde::Deserialize;
use sha2::{Digest, Sha256};

const CREATED_PREFIX: &str = "ObjectCreated:";
const REMOVED_PREFIX: &str = "ObjectRemoved:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChangeKind {
    Created,
    Removed,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Removed => "removed",
        }
    }

    fn from_event_name(event_name: &str) -> Result<Self, AppError> {
        if event_name.starts_with(CREATED_PREFIX) {
            Ok(Self::Created)
        } else if event_name.starts_with(REMOVED_PREFIX) {
            Ok(Self::Removed)
        } else {
            Err(AppError::Validation(format!(
                "Unsupported object change event '{event_name}'"
            )))
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One object-level change in the document bucket.
///
/// Keys are kept exactly as delivered in the notification.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChangeEvent {
    pub bucket: String,
    pub key: String,
    pub kind: ChangeKind,
}

/// Object store change notification, `{"Records": [...]}`.
#[derive(Debug, Deserialize)]
pub struct ObjectChangeNotification {
    #[serde(rename = "Records")]
    pub records: Vec<NotificationRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub event_name: String,
    pub s3: NotificationEntity,
}

#[derive(Debug, Deserialize)]
pub struct NotificationEntity {
    pub bucket: NotificationBucket,
    pub object: NotificationObject,
}

#[derive(Debug, Deserialize)]
pub struct NotificationBucket {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NotificationObject {
    pub key: String,
}

impl ObjectChangeNotification {
    pub fn from_slice(body: &[u8]) -> Result<Self, AppError> {
        serde_json::from_slice(body).map_err(|e| {
            AppError::Validation(format!("Body is not an object change notification: {e}"))
        })
    }

    pub fn into_events(self) -> Result<Vec<ChangeEvent>, AppError> {
        self.records
            .into_iter()
            .map(|record| {
                Ok(ChangeEvent {
                    kind: ChangeKind::from_event_name(&record.event_name)?,
                    bucket: record.s3.bucket.name,
                    key: record.s3.object.key,
                })
            })
            .collect()
    }
}

/// Client token for an event-driven ingestion start.
///
/// SHA-256 over the sorted, de-duplicated `(bucket, key, kind)` triples and the
/// index of the `window` that `now` falls in. Re-deliveries of the same
/// notification inside one window yield the same token.
pub fn idempotency_token(events: &[ChangeEvent], now: DateTime<Utc>, window: Duration) -> String {
    let mut triples: Vec<&ChangeEvent> = events.iter().collect();
    triples.sort();
    triples.dedup();

    let window_secs = window.as_secs().max(1);
    let window_index = u64::try_from(now.timestamp()).unwrap_or(0) / window_secs;

    let mut hasher = Sha256::new();
    for event in triples {
        hasher.update(event.bucket.as_bytes());
        hasher.update(b"\n");
        hasher.update(event.key.as_bytes());
        hasher.update(b"\n");
        hasher.update(event.kind.as_str().as_bytes());
        hasher.update(b"\n");
    }
    hasher.update(window_index.to_string().as_bytes());

    format!("{:x}", hasher.finalize())
}
