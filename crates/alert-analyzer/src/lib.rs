//! alert-analyzer: durable webhook intake for detection-search results
//!
//! Incoming alerts are validated, stamped, and written both to an in-memory
//! work queue and to an on-disk mirror. A single background worker drains the
//! queue, runs each alert through an LLM analysis pipeline, and only drops the
//! alert from the mirror once its analysis has been saved. Anything left in the
//! mirror is replayed on the next start.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod generation;
pub mod processing;
pub mod queue;
pub mod server;
pub mod types;

pub use config::AnalyzerConfig;
pub use error::{Error, Result};
pub use queue::{DurableMirror, QueueService, WorkQueue};
pub use types::{ItemKey, QueueItem, WebhookAlert};
