//! Durable work queue: in-memory FIFO plus on-disk mirror

pub mod intake;
mod mirror;
mod service;
mod work_queue;

pub use mirror::DurableMirror;
pub use service::QueueService;
pub use work_queue::WorkQueue;
