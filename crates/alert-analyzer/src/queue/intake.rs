//! Intake: turn validated alerts into stamped queue items

use chrono::Utc;

use crate::error::Result;
use crate::types::{QueueItem, WebhookAlert};

/// Stamp a batch with consecutive queue numbers starting after `queue_size`
///
/// The numbers are advisory: two batches accepted concurrently may overlap.
/// Identity stays `(sid, row_number)`.
pub fn stamp_batch(alerts: Vec<WebhookAlert>, queue_size: usize) -> Result<Vec<QueueItem>> {
    let base = queue_size as u64;
    alerts
        .into_iter()
        .enumerate()
        .map(|(index, alert)| {
            let item = QueueItem::from_alert(alert, base + index as u64 + 1, Utc::now())?;
            tracing::debug!(
                "Validated webhook item: {} (queue #{})",
                item.key(),
                item.queue_number
            );
            Ok(item)
        })
        .collect()
}
