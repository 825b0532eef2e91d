//! Configuration for the alert analyzer

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::processing::{DEFAULT_ERROR_COOLDOWN, DEFAULT_SHUTDOWN_TIMEOUT};

/// Main analyzer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Ollama/LLM configuration
    #[serde(default)]
    pub llm: LlmConfig,
    /// Durable queue configuration
    #[serde(default)]
    pub queue: QueueConfig,
    /// Artifact storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl AnalyzerConfig {
    /// Load configuration from an optional TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Parse a TOML configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        toml::from_str(&content).map_err(|e| {
            Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
        })
    }

    /// Apply the service's environment variables on top of the current values
    ///
    /// The lookup is injected so tests don't have to mutate the process environment.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = parse_env(&lookup, "PORT")? {
            self.server.port = port;
        }
        if let Some(host) = lookup("OLLAMA_HOST") {
            self.llm.base_url = host.trim_end_matches('/').to_string();
        }
        if let Some(model) = lookup("OLLAMA_MODEL") {
            self.llm.model = model;
        }
        if let Some(temperature) = parse_env(&lookup, "TEMPERATURE")? {
            self.llm.temperature = temperature;
        }
        if let Some(top_p) = parse_env(&lookup, "TOP_P")? {
            self.llm.top_p = top_p;
        }
        if let Some(top_k) = parse_env(&lookup, "TOP_K")? {
            self.llm.top_k = top_k;
        }
        if let Some(max_tokens) = parse_env(&lookup, "MAX_TOKENS")? {
            self.llm.max_tokens = max_tokens;
        }
        if let Some(penalty) = parse_env(&lookup, "REPETITION_PENALTY")? {
            self.llm.repetition_penalty = penalty;
        }
        if let Some(path) = lookup("PENDING_QUEUE_FILE") {
            self.queue.mirror_path = PathBuf::from(path);
        }
        if let Some(dir) = lookup("DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        Ok(())
    }
}

fn parse_env<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| Error::Config(format!("Invalid value for {}: {:?} ({})", key, raw, e))),
        None => Ok(None),
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum webhook body size in bytes (default: 10MB)
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8001,
            enable_cors: true,
            max_body_size: 10 * 1024 * 1024,
        }
    }
}

/// LLM (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Generation model name
    pub model: String,
    /// Sampling temperature
    pub temperature: f32,
    /// Nucleus sampling cutoff
    pub top_p: f32,
    /// Top-k sampling cutoff
    pub top_k: u32,
    /// Maximum tokens to generate (`num_predict`)
    pub max_tokens: u32,
    /// Repetition penalty (`repeat_penalty`)
    pub repetition_penalty: f32,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
    /// Prompt template prepended to every alert
    pub prompt_path: PathBuf,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            model: "llama3".to_string(),
            temperature: 0.2,
            top_p: 0.5,
            top_k: 20,
            max_tokens: 256,
            repetition_penalty: 1.2,
            timeout_secs: 1200, // local models can take a long time on CPU
            max_retries: 0,
            prompt_path: PathBuf::from("prompt").join("prompt.md"),
        }
    }
}

/// Durable queue configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// JSON file mirroring every accepted but unconfirmed item
    pub mirror_path: PathBuf,
    /// Pause after an unexpected worker loop error
    pub error_cooldown_secs: u64,
    /// How long shutdown waits for the worker to stop
    pub shutdown_timeout_secs: u64,
}

impl QueueConfig {
    pub fn error_cooldown(&self) -> Duration {
        Duration::from_secs(self.error_cooldown_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            mirror_path: PathBuf::from("pending_queue.json"),
            error_cooldown_secs: DEFAULT_ERROR_COOLDOWN.as_secs(),
            shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT.as_secs(),
        }
    }
}

/// Artifact storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root directory for per-SID artifacts
    pub data_dir: PathBuf,
    /// Also keep the raw queue item next to the analysis
    pub save_raw_payloads: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("Data"),
            save_raw_payloads: false,
        }
    }
}
