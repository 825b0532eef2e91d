//! On-disk mirror of every accepted but unconfirmed queue item
//!
//! The mirror is a single JSON array rewritten in full on each change. It is
//! the source of truth across restarts; the in-memory work queue is rebuilt
//! from it at startup. Persistence failures are logged and swallowed so a bad
//! disk degrades durability instead of taking the service down.

use parking_lot::Mutex;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{ItemKey, QueueItem};

/// Durable list of pending items backed by a JSON file
pub struct DurableMirror {
    path: PathBuf,
    /// Guarded together with the file so writes never interleave
    items: Mutex<Vec<QueueItem>>,
}

impl DurableMirror {
    /// Create an empty mirror bound to `path` without touching the file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            items: Mutex::new(Vec::new()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the in-memory list with the file contents and return them
    pub fn load(&self) -> Vec<QueueItem> {
        let loaded = read_items(&self.path);
        let mut items = self.items.lock();
        *items = loaded.clone();
        loaded
    }

    /// Rewrite the backing file with the current list
    pub fn save(&self) {
        let items = self.items.lock();
        Self::save_locked(&self.path, &items);
    }

    /// Add an item and persist
    pub fn append(&self, item: QueueItem) {
        let mut items = self.items.lock();
        items.push(item);
        Self::save_locked(&self.path, &items);
    }

    /// Drop every entry matching `key`; persists only if something was removed
    pub fn remove(&self, key: &ItemKey) -> bool {
        let mut items = self.items.lock();
        let initial_len = items.len();
        items.retain(|item| !item.matches(key));

        if items.len() < initial_len {
            Self::save_locked(&self.path, &items);
            tracing::info!("Item {} removed from disk mirror", key);
            true
        } else {
            tracing::warn!("Could not find item {} in disk mirror for removal", key);
            false
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    /// Copy of the current list in mirror order
    pub fn snapshot(&self) -> Vec<QueueItem> {
        self.items.lock().clone()
    }

    fn save_locked(path: &Path, items: &[QueueItem]) {
        match write_items(path, items) {
            Ok(()) => tracing::debug!("Saved {} items to {}", items.len(), path.display()),
            Err(e) => tracing::error!("Error saving disk queue to {}: {}", path.display(), e),
        }
    }
}

/// Write the list as indented JSON via a sibling temp file and rename
fn write_items(path: &Path, items: &[QueueItem]) -> Result<()> {
    let content = serde_json::to_string_pretty(items)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, content)?;
    fs::rename(&tmp_path, path).map_err(|e| {
        Error::Persistence(format!(
            "failed to move {} into place: {}",
            tmp_path.display(),
            e
        ))
    })
}

/// Read the mirror file, degrading every failure to an empty list
fn read_items(path: &Path) -> Vec<QueueItem> {
    if !path.exists() {
        tracing::info!("{} not found. Starting with empty queue", path.display());
        return Vec::new();
    }

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            tracing::error!("Error loading disk queue from {}: {}", path.display(), e);
            return Vec::new();
        }
    };

    if content.trim().is_empty() {
        tracing::warn!("{} is empty. Starting with empty queue", path.display());
        return Vec::new();
    }

    let values = match serde_json::from_str::<Value>(&content) {
        Ok(Value::Array(values)) => values,
        Ok(_) => {
            tracing::warn!("Content in {} is not a list. Ignoring", path.display());
            return Vec::new();
        }
        Err(e) => {
            tracing::error!(
                "Error decoding JSON from {}: {}. Starting with empty queue",
                path.display(),
                e
            );
            return Vec::new();
        }
    };

    let total = values.len();
    let items: Vec<QueueItem> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value::<QueueItem>(value) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!("Skipping malformed entry {} in {}: {}", index, path.display(), e);
                None
            }
        })
        .collect();

    tracing::info!(
        "Loaded {} of {} items from {}",
        items.len(),
        total,
        path.display()
    );
    items
}
