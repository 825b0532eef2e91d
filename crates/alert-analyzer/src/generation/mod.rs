//! Text generation for alert analysis

pub mod ollama;
pub mod prompt;

use async_trait::async_trait;

use crate::error::Result;

pub use ollama::OllamaClient;
pub use prompt::PromptBuilder;

/// Trait for LLM-backed text generation
///
/// Implementations:
/// - `OllamaClient`: local Ollama server (llama3, mistral, etc.)
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate free-form text for a fully assembled prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;
}
