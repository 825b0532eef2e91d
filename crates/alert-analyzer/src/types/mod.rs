//! Core types for the alert analyzer

pub mod alert;
pub mod queue_item;
pub mod response;

pub use alert::{parse_alert_batch, WebhookAlert};
pub use queue_item::{ItemKey, QueueItem};
pub use response::{PendingItemSummary, QueueStats, QueueStatusResponse, WebhookResponse};
