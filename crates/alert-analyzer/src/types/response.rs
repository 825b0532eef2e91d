//! Response types for the HTTP API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::QueueItem;

/// Response to an accepted webhook submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub message: String,
    pub accepted: usize,
}

impl WebhookResponse {
    pub fn accepted(count: usize) -> Self {
        Self {
            message: format!("{} item(s) accepted and queued for processing.", count),
            accepted: count,
        }
    }
}

/// Point-in-time queue counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Items waiting in the work queue
    pub queued: usize,
    /// Items dequeued but not yet marked done
    pub in_flight: usize,
    /// Items in the durable mirror (not yet confirmed processed)
    pub pending_on_disk: usize,
}

/// Short description of one pending item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingItemSummary {
    pub sid: String,
    pub row_number: i64,
    pub queue_number: u64,
    pub received_at: DateTime<Utc>,
}

impl From<&QueueItem> for PendingItemSummary {
    fn from(item: &QueueItem) -> Self {
        Self {
            sid: item.sid.clone(),
            row_number: item.row_number,
            queue_number: item.queue_number,
            received_at: item.received_at,
        }
    }
}

/// GET /api/v1/queue body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatusResponse {
    #[serde(flatten)]
    pub stats: QueueStats,
    pub pending: Vec<PendingItemSummary>,
}
