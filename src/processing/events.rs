//! Parsing of object-storage notifications into upload and delete events.
//!
//! Two payload shapes are accepted: the MinIO webhook form `{"EventName", "Key"}` where the key
//! is `<bucket>/<object>`, and the S3 form `{"Records": [{"eventName", "s3": {...}}]}`. When
//! records are present the last complete one wins.

use serde_json::Value;
use thiserror::Error;

/// Object name written next to uploaded documents by the controller; never processed.
pub const METADATA_FILENAME: &str = ".metadata.json";

/// Errors raised for payloads that are not notifications at all.
#[derive(Debug, Error)]
pub enum NotificationParseError {
    /// Body is not valid JSON.
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),
    /// Body is JSON but not an object.
    #[error("notification payload must be a JSON object")]
    NotAnObject,
}

/// What happened to the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Object created or overwritten.
    Created,
    /// Object removed.
    Removed,
}

/// An upload or delete of one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Created or removed.
    pub kind: EventKind,
    /// Bucket name, which is also the index name.
    pub index_name: String,
    /// Object key within the bucket.
    pub filename: String,
}

/// Result of interpreting a well-formed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// An event the pipeline should act on.
    Event(StorageEvent),
    /// A notification that requires no work, with the reason.
    Ignored(String),
}

/// Interpret a raw notification body.
pub fn parse_notification(body: &[u8]) -> Result<Notification, NotificationParseError> {
    let payload: Value = serde_json::from_slice(body)
        .map_err(|e| NotificationParseError::InvalidJson(e.to_string()))?;
    let payload = payload
        .as_object()
        .ok_or(NotificationParseError::NotAnObject)?;

    let mut event_name = string_field(payload.get("EventName")).to_string();
    let mut key = string_field(payload.get("Key")).to_string();

    if let Some(Value::Array(records)) = payload.get("Records") {
        for record in records {
            if let Some(name) = record.get("eventName").and_then(Value::as_str) {
                event_name = name.to_string();
            }
            let s3 = record.get("s3");
            let bucket = string_field(s3.and_then(|s3| s3.pointer("/bucket/name")));
            let object = string_field(s3.and_then(|s3| s3.pointer("/object/key")));
            if !bucket.is_empty() && !object.is_empty() {
                key = format!("{bucket}/{object}");
            }
        }
    }

    Ok(classify(&event_name, &key))
}

fn string_field(value: Option<&Value>) -> &str {
    value.and_then(Value::as_str).unwrap_or_default()
}

fn classify(event_name: &str, key: &str) -> Notification {
    let Some((bucket, filename)) = key.split_once('/') else {
        return Notification::Ignored(format!("invalid key: {key:?}"));
    };
    if bucket.is_empty() {
        return Notification::Ignored(format!("invalid key: {key:?}"));
    }
    if filename.is_empty() {
        return Notification::Ignored(format!("no filename in key: {key:?}"));
    }
    if filename == METADATA_FILENAME {
        return Notification::Ignored("metadata file".to_string());
    }

    let kind = if event_name.contains("ObjectCreated") || event_name.contains("Put") {
        EventKind::Created
    } else if event_name.contains("ObjectRemoved") || event_name.contains("Delete") {
        EventKind::Removed
    } else {
        return Notification::Ignored(format!("unsupported event: {event_name}"));
    };

    Notification::Event(StorageEvent {
        kind,
        index_name: bucket.to_string(),
        filename: filename.to_string(),
    })
}
