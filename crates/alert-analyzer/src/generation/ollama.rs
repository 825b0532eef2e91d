//! Ollama client for alert analysis with optional retries

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

use super::LlmProvider;

/// Ollama API client
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: LlmConfig,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Clone, Copy, Serialize)]
struct GenerateOptions {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    num_predict: u32,
    repeat_penalty: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaClient {
    /// Create a new Ollama client
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(2)
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/api/generate", self.config.base_url)
    }

    fn options(&self) -> GenerateOptions {
        GenerateOptions {
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            top_k: self.config.top_k,
            num_predict: self.config.max_tokens,
            repeat_penalty: self.config.repetition_penalty,
        }
    }

    /// Retry a request with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_retries = self.config.max_retries;
        let mut last_error = None;

        for attempt in 0..=max_retries {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    last_error = Some(e);
                    if attempt < max_retries {
                        let delay = backoff_delay(attempt);
                        tracing::warn!(
                            "Ollama request failed (attempt {}/{}), retrying in {:?}",
                            attempt + 1,
                            max_retries + 1,
                            delay
                        );
                        sleep(delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::llm("Unknown error")))
    }

    /// Send one non-streaming generate request
    async fn generate_once(&self, prompt: &str) -> Result<String> {
        let url = self.generate_url();
        let request = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: self.options(),
        };

        tracing::debug!(
            "Ollama request to {} - model: {}, options: {:?}, prompt length: {} chars",
            url,
            request.model,
            request.options,
            prompt.len()
        );

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| describe_send_error(&url, self.config.timeout_secs, e))?;

        let status = response.status();
        tracing::info!("Received response from Ollama. Status Code: {}", status);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("Ollama HTTP error: {} - {}", status, body);
            return Err(Error::llm(format!(
                "Ollama HTTP error {} - Check Ollama logs",
                status.as_u16()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::llm(format!("Failed to read Ollama response: {}", e)))?;
        let parsed: GenerateResponse = serde_json::from_str(&body).map_err(|e| {
            tracing::error!("Failed to decode Ollama JSON response: {} - Response text: {}", e, body);
            Error::llm(format!("Failed to decode Ollama JSON response - {}", e))
        })?;

        tracing::debug!(
            "Ollama analysis text ({} chars): {}...",
            parsed.response.len(),
            parsed.response.chars().take(100).collect::<String>()
        );

        Ok(parsed.response)
    }
}

/// Longest pause between two attempts
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// 1s, 2s, 4s, ... capped at [`MAX_BACKOFF`]
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(2u64.saturating_pow(attempt)).min(MAX_BACKOFF)
}

fn describe_send_error(url: &str, timeout_secs: u64, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        tracing::error!("Ollama request timed out after {} seconds to {}", timeout_secs, url);
        Error::llm("Ollama request timed out")
    } else if err.is_connect() {
        tracing::error!(
            "Ollama connection error. Could not connect to {}. Is Ollama running and accessible?",
            url
        );
        Error::llm("Ollama connection error")
    } else {
        tracing::error!("Ollama request failed: {}", err);
        Error::llm(format!("Ollama request failed - {}", err))
    }
}

#[async_trait]
impl LlmProvider for OllamaClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        tracing::info!("Sending request to Ollama model '{}'...", self.config.model);
        let text = self.retry_request(|| self.generate_once(prompt)).await?;
        tracing::info!(
            "Successfully received analysis from Ollama for model '{}'",
            self.config.model
        );
        Ok(text)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.config.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}
