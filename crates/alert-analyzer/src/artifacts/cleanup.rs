//! Extraction of structured JSON from free-form model output

use regex::Regex;
use serde_json::{json, Value};

use crate::error::{Error, Result};

/// Separator between multiple `<think>` blocks in the saved reasoning file
pub const THINK_SEPARATOR: &str = "\n\n---\n\n";

/// Result of cleaning one model response
#[derive(Debug, Clone, PartialEq)]
pub struct CleanedAnalysis {
    /// Trimmed contents of every `<think>` block, in order
    pub think_blocks: Vec<String>,
    /// JSON to persist as the analysis
    pub analysis: Value,
    /// How `analysis` was obtained
    pub source: AnalysisSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisSource {
    /// Parsed from a ```json fenced block
    FencedJson,
    /// A fenced block was found but did not parse
    InvalidFencedJson,
    /// The whole cleaned response parsed as JSON
    WholeResponse,
    /// Nothing parsed; stored as `analysis_text`
    PlainText,
}

/// Compiled patterns for response cleanup
pub struct AnalysisCleaner {
    think_pattern: Regex,
    json_block_pattern: Regex,
}

impl AnalysisCleaner {
    pub fn new() -> Result<Self> {
        let think_pattern = Regex::new(r"(?s)<think>(.*?)</think>")
            .map_err(|e| Error::internal(format!("Invalid think pattern: {}", e)))?;
        let json_block_pattern = Regex::new(r"(?s)```json\s*(.*?)\s*```")
            .map_err(|e| Error::internal(format!("Invalid json block pattern: {}", e)))?;
        Ok(Self {
            think_pattern,
            json_block_pattern,
        })
    }

    /// Split reasoning from the answer and pick the best JSON representation
    pub fn clean(&self, raw: &str) -> CleanedAnalysis {
        let think_blocks: Vec<String> = self
            .think_pattern
            .captures_iter(raw)
            .filter_map(|cap| cap.get(1))
            .map(|m| m.as_str().trim().to_string())
            .collect();
        let cleaned = self.think_pattern.replace_all(raw, "");
        let cleaned = cleaned.trim();

        if let Some(block) = self
            .json_block_pattern
            .captures(cleaned)
            .and_then(|cap| cap.get(1))
            .map(|m| m.as_str().trim())
        {
            if block.is_empty() {
                tracing::warn!("Found empty ```json block in model response");
            } else {
                return match serde_json::from_str::<Value>(block) {
                    Ok(analysis) => CleanedAnalysis {
                        think_blocks,
                        analysis,
                        source: AnalysisSource::FencedJson,
                    },
                    Err(e) => {
                        tracing::error!(
                            "JSON error parsing ```json block: {}. Problematic text (first 500 chars): {}",
                            e,
                            block.chars().take(500).collect::<String>()
                        );
                        CleanedAnalysis {
                            think_blocks,
                            analysis: json!({
                                "error": format!("Invalid JSON format extracted from triple backticks: {}", e),
                                "extracted_text": block,
                            }),
                            source: AnalysisSource::InvalidFencedJson,
                        }
                    }
                };
            }
        } else {
            tracing::warn!("Could not find ```json block in model response");
        }

        match serde_json::from_str::<Value>(cleaned) {
            Ok(analysis) => CleanedAnalysis {
                think_blocks,
                analysis,
                source: AnalysisSource::WholeResponse,
            },
            Err(_) => CleanedAnalysis {
                think_blocks,
                analysis: json!({ "analysis_text": cleaned }),
                source: AnalysisSource::PlainText,
            },
        }
    }
}
