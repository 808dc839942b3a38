//! Object storage trigger events.
//!
//! The trigger delivers an S3-style notification document:
//!
//! ```json
//! {"Records": [{"eventName": "ObjectCreated:Put",
//!               "s3": {"bucket": {"name": "uploads"},
//!                      "object": {"key": "My+Video.mp4", "size": 1048576}}}]}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Notification document delivered by the storage trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageEvent {
    #[serde(rename = "Records", default)]
    pub records: Vec<EventRecord>,
}

/// One notification record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    #[serde(default)]
    pub event_name: Option<String>,
    #[serde(default)]
    pub event_time: Option<DateTime<Utc>>,
    pub s3: S3Entity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3Entity {
    pub bucket: BucketEntity,
    pub object: ObjectEntity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketEntity {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectEntity {
    /// URL-encoded object key
    pub key: String,
    #[serde(default)]
    pub size: Option<u64>,
}

/// A newly created object named by a trigger event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectCreated {
    pub bucket: String,
    /// Decoded object key
    pub key: String,
    pub size: Option<u64>,
}

impl StorageEvent {
    pub fn from_json(json: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_slice(bytes: &[u8]) -> ModelResult<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// The single object this event names.
    pub fn single_object(&self) -> ModelResult<ObjectCreated> {
        let record = match self.records.as_slice() {
            [record] => record,
            [] => return Err(ModelError::invalid_event("event contains no records")),
            records => {
                return Err(ModelError::invalid_event(format!(
                    "expected exactly one record, got {}",
                    records.len()
                )))
            }
        };

        if record.s3.bucket.name.is_empty() {
            return Err(ModelError::invalid_event("bucket name is empty"));
        }

        let key = decode_object_key(&record.s3.object.key)?;
        if key.is_empty() {
            return Err(ModelError::invalid_event("object key is empty"));
        }

        Ok(ObjectCreated {
            bucket: record.s3.bucket.name.clone(),
            key,
            size: record.s3.object.size,
        })
    }
}

impl ObjectCreated {
    /// Case-insensitive suffix match; an empty filter matches every key.
    pub fn matches_suffix(&self, suffix: &str) -> bool {
        suffix.is_empty() || self.key.to_lowercase().ends_with(&suffix.to_lowercase())
    }
}

/// Decode an event object key (form encoding: `+` is a space).
pub fn decode_object_key(raw: &str) -> ModelResult<String> {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .map_err(|e| ModelError::invalid_event(format!("object key is not valid UTF-8: {}", e)))
}
