//! Application state for the webhook server

use parking_lot::RwLock;
use std::sync::Arc;

use crate::artifacts::ArtifactStore;
use crate::config::AnalyzerConfig;
use crate::error::Result;
use crate::generation::{LlmProvider, OllamaClient};
use crate::processing::{AnalysisProcessor, Processor, QueueWorker};
use crate::queue::QueueService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: AnalyzerConfig,
    /// Durable queue shared with the worker
    queue: Arc<QueueService>,
    /// Processor handed to the worker
    processor: Arc<dyn Processor>,
    /// LLM provider, kept for health reporting
    llm: Option<Arc<dyn LlmProvider>>,
    /// Ready state
    ready: RwLock<bool>,
}

impl AppState {
    /// Build the full production state: mirror replay, Ollama client, artifact store
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        tracing::info!("Initializing analyzer state...");

        let queue = Arc::new(QueueService::new(config.queue.mirror_path.clone()));
        let replayed = queue.initialize();
        tracing::info!(
            "Queue initialized from {} ({} pending items)",
            config.queue.mirror_path.display(),
            replayed
        );

        let llm: Arc<dyn LlmProvider> = Arc::new(OllamaClient::new(&config.llm)?);
        tracing::info!(
            "Ollama client initialized (model: {}, url: {})",
            config.llm.model,
            config.llm.base_url
        );

        let artifacts = Arc::new(ArtifactStore::new(config.storage.data_dir.clone())?);
        tracing::info!("Artifacts stored under {}", artifacts.data_dir().display());

        let processor: Arc<dyn Processor> = Arc::new(AnalysisProcessor::from_config(
            &config,
            Arc::clone(&llm),
            artifacts,
        ));

        Ok(Self::from_parts(config, queue, processor, Some(llm)))
    }

    /// Assemble state from pre-built components
    pub fn from_parts(
        config: AnalyzerConfig,
        queue: Arc<QueueService>,
        processor: Arc<dyn Processor>,
        llm: Option<Arc<dyn LlmProvider>>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                queue,
                processor,
                llm,
                ready: RwLock::new(true),
            }),
        }
    }

    /// Get configuration
    pub fn config(&self) -> &AnalyzerConfig {
        &self.inner.config
    }

    /// Get the queue service
    pub fn queue(&self) -> &Arc<QueueService> {
        &self.inner.queue
    }

    /// Get the LLM provider, if one is configured
    pub fn llm(&self) -> Option<&Arc<dyn LlmProvider>> {
        self.inner.llm.as_ref()
    }

    /// A worker wired to this state's queue and processor
    pub fn worker(&self) -> QueueWorker {
        QueueWorker::new(Arc::clone(&self.inner.queue), Arc::clone(&self.inner.processor))
            .with_error_cooldown(self.inner.config.queue.error_cooldown())
    }

    /// Check if the server is ready
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.read()
    }

    /// Set ready state
    pub fn set_ready(&self, ready: bool) {
        *self.inner.ready.write() = ready;
    }
}
