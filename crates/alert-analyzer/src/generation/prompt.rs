//! Prompt assembly for alert analysis

use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::queue_item::QUEUE_METADATA_FIELDS;

/// Prompt builder for analysis requests
pub struct PromptBuilder;

impl PromptBuilder {
    /// Read the prompt template from disk
    ///
    /// Read on every request so the template can be edited without a restart.
    pub fn load_template(path: &Path) -> Result<String> {
        fs::read_to_string(path).map_err(|e| {
            tracing::error!("Error reading prompt file {}: {}", path.display(), e);
            Error::Prompt(format!("Could not read prompt template {}: {}", path.display(), e))
        })
    }

    /// Template followed by the alert data as indented JSON
    pub fn build_analysis_prompt(template: &str, input: &Map<String, Value>) -> Result<String> {
        let filtered: Map<String, Value> = input
            .iter()
            .filter(|(k, _)| !QUEUE_METADATA_FIELDS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let input_data = serde_json::to_string_pretty(&filtered)?;

        Ok(format!("{}\n\n### Input Data:\n{}", template, input_data))
    }
}
