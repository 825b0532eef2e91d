//! The per-item analysis pipeline behind the worker

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;

use crate::artifacts::{ArtifactStore, SearchMetadata};
use crate::config::AnalyzerConfig;
use crate::error::{Error, Result};
use crate::generation::{LlmProvider, PromptBuilder};
use crate::types::QueueItem;

/// Outcome of processing one queue item
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessOutcome {
    /// Analysis saved; the item can leave the mirror
    Success { artifact: Option<PathBuf> },
    /// Something failed; the item stays in the mirror
    Failure { reason: String },
}

impl ProcessOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self::Failure {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Processes one dequeued item
///
/// Implementations fold every sub-step failure into
/// [`ProcessOutcome::Failure`]; they never return errors.
#[async_trait]
pub trait Processor: Send + Sync + 'static {
    async fn process(&self, item: &QueueItem) -> ProcessOutcome;
}

/// Metadata save, LLM call, and analysis save for one alert row
pub struct AnalysisProcessor {
    llm: Arc<dyn LlmProvider>,
    artifacts: Arc<ArtifactStore>,
    prompt_path: PathBuf,
    save_raw_payloads: bool,
}

impl AnalysisProcessor {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        artifacts: Arc<ArtifactStore>,
        prompt_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            llm,
            artifacts,
            prompt_path: prompt_path.into(),
            save_raw_payloads: false,
        }
    }

    pub fn from_config(
        config: &AnalyzerConfig,
        llm: Arc<dyn LlmProvider>,
        artifacts: Arc<ArtifactStore>,
    ) -> Self {
        Self::new(llm, artifacts, config.llm.prompt_path.clone())
            .with_raw_payloads(config.storage.save_raw_payloads)
    }

    pub fn with_raw_payloads(mut self, enabled: bool) -> Self {
        self.save_raw_payloads = enabled;
        self
    }

    /// `row_data` fields overlaid with every other field of the alert
    pub fn analysis_input(item: &QueueItem) -> Map<String, Value> {
        let mut input = item
            .payload
            .get("row_data")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        for (field, value) in item.without_queue_metadata() {
            if field != "row_data" {
                input.insert(field, value);
            }
        }
        input
    }

    async fn run(&self, item: &QueueItem) -> Result<PathBuf> {
        let key = item.key();

        let artifacts = Arc::clone(&self.artifacts);
        let sid = item.sid.clone();
        let metadata = SearchMetadata::from_item(item);
        blocking(move || artifacts.save_metadata(&sid, &metadata)).await?;
        tracing::debug!("Metadata saved for SID {}", item.sid);

        if self.save_raw_payloads {
            let artifacts = Arc::clone(&self.artifacts);
            let raw = item.clone();
            if let Err(e) = blocking(move || artifacts.save_raw(&raw)).await {
                tracing::warn!("Could not save raw payload for {}: {}", key, e);
            }
        }

        let template = PromptBuilder::load_template(&self.prompt_path)?;
        let prompt = PromptBuilder::build_analysis_prompt(&template, &Self::analysis_input(item))?;

        tracing::info!(
            "Calling {} ({}) for {}...",
            self.llm.name(),
            self.llm.model(),
            key
        );
        let response = self.llm.generate(&prompt).await?;
        tracing::info!("Received result from {} for {}", self.llm.name(), key);

        let artifacts = Arc::clone(&self.artifacts);
        let sid = item.sid.clone();
        let row_number = item.row_number;
        blocking(move || artifacts.save_analysis(&sid, row_number, &response)).await
    }
}

/// Run filesystem work on the blocking pool
async fn blocking<T, F>(work: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))?
}

#[async_trait]
impl Processor for AnalysisProcessor {
    async fn process(&self, item: &QueueItem) -> ProcessOutcome {
        let key = item.key();
        if item.sid.is_empty() {
            tracing::error!("Invalid item received, missing SID: {}", key);
            return ProcessOutcome::failure("missing SID");
        }

        tracing::info!(
            "Starting processing for Queue# {} - {}",
            item.queue_number,
            key
        );

        match self.run(item).await {
            Ok(path) => {
                tracing::info!(
                    "Successfully processed and saved analysis for {} to {}",
                    key,
                    path.display()
                );
                ProcessOutcome::Success {
                    artifact: Some(path),
                }
            }
            Err(e) => {
                let stage = match &e {
                    Error::Llm(_) => "analysis",
                    Error::Prompt(_) => "prompt",
                    _ => "artifact",
                };
                tracing::error!("Processing failed at {} stage for {}: {}", stage, key, e);
                ProcessOutcome::failure(e.to_string())
            }
        }
    }
}
