//! Persisted history (`history.json`).
//!
//! Entries are carried through a run untouched: loaded at startup and written
//! back wholesale at shutdown.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::storage::{self, StorageError};

/// History entries keyed by identifier, with arbitrary JSON metadata.
///
/// Keys keep the order they had in the file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: serde_json::Map<String, serde_json::Value>,
}

impl History {
    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Looks up one entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.entries.get(key)
    }
}

/// Loads and saves [`History`].
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored history, or an empty one when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the file is unreadable or not a JSON object.
    pub fn load(&self) -> Result<History, StorageError> {
        let Some(raw) = storage::read_optional(&self.path)? else {
            return Ok(History::default());
        };
        let history: History =
            serde_json::from_str(&raw).map_err(|error| StorageError::json(&self.path, error))?;
        debug!(entries = history.len(), "loaded history");
        Ok(history)
    }

    /// Writes the whole history and returns the entry count.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when encoding or writing fails.
    pub fn save(&self, history: &History) -> Result<usize, StorageError> {
        let encoded = serde_json::to_vec_pretty(history)
            .map_err(|error| StorageError::json(&self.path, error))?;
        storage::write_private_file(&self.path, &encoded)?;
        debug!(entries = history.len(), path = %self.path.display(), "saved history");
        Ok(history.len())
    }
}
