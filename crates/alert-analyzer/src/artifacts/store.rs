//! Per-SID artifact files under the data directory
//!
//! Layout:
//! - `<data_dir>/<sid>/metadata.json`
//! - `<data_dir>/<sid>/raw_row_<row>.json` (optional)
//! - `<data_dir>/<sid>/analysis_row_<row>.json`
//! - `<data_dir>/<sid>/think_row_<row>.txt` (only when the model emitted reasoning)
//!
//! Every write overwrites, so reprocessing an item is harmless.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::cleanup::{AnalysisCleaner, THINK_SEPARATOR};
use crate::error::{Error, Result};
use crate::types::QueueItem;

/// Search-level metadata shared by every row of a SID
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMetadata {
    pub search_name: Option<String>,
    pub search_query: Option<String>,
    pub description: Option<String>,
    pub severity: Option<String>,
    pub kill_chain: Option<String>,
    pub mitre_tactics: Vec<String>,
    pub mitre_techniques: Vec<String>,
}

impl SearchMetadata {
    pub fn from_item(item: &QueueItem) -> Self {
        let text = |field: &str| item.payload_str(field).map(str::to_string);
        let list = |field: &str| -> Vec<String> {
            item.payload
                .get(field)
                .and_then(|v| v.as_array())
                .map(|values| {
                    values
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect()
                })
                .unwrap_or_default()
        };

        Self {
            search_name: text("search_name"),
            search_query: text("search_query"),
            description: text("description"),
            severity: text("severity"),
            kill_chain: text("kill_chain"),
            mitre_tactics: list("mitre_tactics"),
            mitre_techniques: list("mitre_techniques"),
        }
    }
}

/// Filesystem store for analysis artifacts
pub struct ArtifactStore {
    data_dir: PathBuf,
    cleaner: AnalysisCleaner,
}

impl ArtifactStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Result<Self> {
        Ok(Self {
            data_dir: data_dir.into(),
            cleaner: AnalysisCleaner::new()?,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding every artifact of one SID, created on demand
    fn sid_dir(&self, sid: &str) -> Result<PathBuf> {
        if sid.is_empty() {
            return Err(Error::artifact("SID missing"));
        }
        let dir = self.data_dir.join(sid);
        fs::create_dir_all(&dir).map_err(|e| {
            Error::artifact(format!("Failed to create directory {}: {}", dir.display(), e))
        })?;
        Ok(dir)
    }

    /// Write `metadata.json` for the item's SID
    pub fn save_metadata(&self, sid: &str, metadata: &SearchMetadata) -> Result<PathBuf> {
        let path = self.sid_dir(sid)?.join("metadata.json");
        write_json(&path, metadata)?;
        tracing::debug!("Metadata saved to {}", path.display());
        Ok(path)
    }

    /// Write the raw queue item as `raw_row_<row>.json`
    pub fn save_raw(&self, item: &QueueItem) -> Result<PathBuf> {
        let path = self
            .sid_dir(&item.sid)?
            .join(format!("raw_row_{}.json", item.row_number));
        write_json(&path, item)?;
        tracing::debug!("Raw webhook data saved to {}", path.display());
        Ok(path)
    }

    /// Clean a model response and save it as `analysis_row_<row>.json`
    ///
    /// Reasoning blocks go to `think_row_<row>.txt`; failing to write them is
    /// logged but does not fail the analysis.
    pub fn save_analysis(&self, sid: &str, row_number: i64, raw: &str) -> Result<PathBuf> {
        let dir = self.sid_dir(sid)?;
        let cleaned = self.cleaner.clean(raw);

        if !cleaned.think_blocks.is_empty() {
            let think_path = dir.join(format!("think_row_{}.txt", row_number));
            match fs::write(&think_path, cleaned.think_blocks.join(THINK_SEPARATOR)) {
                Ok(()) => tracing::debug!("Think content saved to {}", think_path.display()),
                Err(e) => tracing::error!(
                    "Error saving think text to {}: {}",
                    think_path.display(),
                    e
                ),
            }
        }

        tracing::info!(
            "Analysis for SID {}/Row {} extracted as {:?}",
            sid,
            row_number,
            cleaned.source
        );

        let path = dir.join(format!("analysis_row_{}.json", row_number));
        write_json(&path, &cleaned.analysis)?;
        tracing::debug!("Analysis JSON saved to {}", path.display());
        Ok(path)
    }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    fs::write(path, content)
        .map_err(|e| Error::artifact(format!("Failed to write {}: {}", path.display(), e)))
}
