//! Queue item and its identity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{Error, Result};
use crate::types::WebhookAlert;

/// Field names added by intake and stripped before analysis
pub const QUEUE_METADATA_FIELDS: [&str; 2] = ["queue_number", "received_at"];

/// Identity of a queue item inside the mirror
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemKey {
    pub sid: String,
    pub row_number: i64,
}

impl ItemKey {
    pub fn new(sid: impl Into<String>, row_number: i64) -> Self {
        Self {
            sid: sid.into(),
            row_number,
        }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SID {}/Row {}", self.sid, self.row_number)
    }
}

/// An accepted alert waiting to be analyzed
///
/// Everything besides the identity and queue metadata is kept as an opaque
/// JSON map and passed through to the processor untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    pub sid: String,
    pub row_number: i64,
    /// Position assigned at intake; informational only
    pub queue_number: u64,
    pub received_at: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl QueueItem {
    /// Stamp a validated alert with its queue metadata
    pub fn from_alert(
        alert: WebhookAlert,
        queue_number: u64,
        received_at: DateTime<Utc>,
    ) -> Result<Self> {
        let sid = alert.sid.clone();
        let row_number = alert.row_number;

        let mut payload = match serde_json::to_value(alert)? {
            Value::Object(map) => map,
            _ => return Err(Error::internal("alert did not serialize to an object")),
        };
        payload.remove("sid");
        payload.remove("row_number");

        Ok(Self {
            sid,
            row_number,
            queue_number,
            received_at,
            payload,
        })
    }

    pub fn key(&self) -> ItemKey {
        ItemKey::new(self.sid.clone(), self.row_number)
    }

    pub fn matches(&self, key: &ItemKey) -> bool {
        self.sid == key.sid && self.row_number == key.row_number
    }

    /// The item as submitted, with the intake-assigned fields stripped
    pub fn without_queue_metadata(&self) -> Map<String, Value> {
        let mut map = Map::with_capacity(self.payload.len() + 2);
        map.insert("sid".to_string(), Value::String(self.sid.clone()));
        map.insert("row_number".to_string(), Value::from(self.row_number));
        for (field, value) in &self.payload {
            if !QUEUE_METADATA_FIELDS.contains(&field.as_str()) {
                map.insert(field.clone(), value.clone());
            }
        }
        map
    }

    /// Look up a string field of the payload
    pub fn payload_str(&self, field: &str) -> Option<&str> {
        self.payload.get(field).and_then(Value::as_str)
    }
}
