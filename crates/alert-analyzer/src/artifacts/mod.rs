//! Analysis artifacts: response cleanup and per-SID files

mod cleanup;
mod store;

pub use cleanup::{AnalysisCleaner, AnalysisSource, CleanedAnalysis, THINK_SEPARATOR};
pub use store::{ArtifactStore, SearchMetadata};
