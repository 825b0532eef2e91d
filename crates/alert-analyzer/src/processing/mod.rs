//! Background processing: the analysis pipeline and the worker that drives it

mod processor;
mod worker;

pub use processor::{AnalysisProcessor, ProcessOutcome, Processor};
pub use worker::{
    QueueWorker, ShutdownOutcome, WorkerHandle, DEFAULT_ERROR_COOLDOWN, DEFAULT_SHUTDOWN_TIMEOUT,
};
