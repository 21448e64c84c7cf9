//! Persisted session cookies (`session.json`).
//!
//! The file is a flat JSON object of cookie name to value. It is written after
//! every successful login and deleted when the session check rejects it.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::http::{CookieSet, SessionJar};
use crate::storage::{self, StorageError};

/// Loads, saves and clears the persisted cookie set.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// Creates a store backed by the given session file.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Session file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted cookie set without touching any jar.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the file is unreadable or not a JSON
    /// object of strings.
    pub fn read(&self) -> Result<Option<CookieSet>, StorageError> {
        let Some(raw) = storage::read_optional(&self.path)? else {
            return Ok(None);
        };
        let cookies: CookieSet =
            serde_json::from_str(&raw).map_err(|error| StorageError::json(&self.path, error))?;
        Ok(Some(cookies))
    }

    /// Reads the persisted cookie set and seeds `jar` with it.
    ///
    /// Returns `Ok(None)` when no session file exists.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the file is unreadable or malformed.
    pub fn load(&self, jar: &SessionJar) -> Result<Option<CookieSet>, StorageError> {
        let cookies = self.read()?;
        if let Some(cookies) = &cookies {
            jar.extend(cookies);
            info!(
                cookies = cookies.len(),
                path = %self.path.display(),
                "Loaded persisted session"
            );
        }
        Ok(cookies)
    }

    /// Writes the cookie set, replacing any previous session file.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when encoding or writing fails.
    pub fn save(&self, cookies: &CookieSet) -> Result<(), StorageError> {
        let encoded = serde_json::to_vec_pretty(cookies)
            .map_err(|error| StorageError::json(&self.path, error))?;
        storage::write_private_file(&self.path, &encoded)?;
        info!(
            cookies = cookies.len(),
            path = %self.path.display(),
            "Persisted session"
        );
        Ok(())
    }

    /// Empties `jar` and deletes the session file. Missing files are fine.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the file exists but cannot be removed.
    pub fn clear(&self, jar: &SessionJar) -> Result<(), StorageError> {
        jar.clear();
        let removed = storage::remove_if_exists(&self.path)?;
        debug!(removed, path = %self.path.display(), "cleared session");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn cookies(pairs: &[(&str, &str)]) -> CookieSet {
        pairs
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect()
    }

    fn store(tempdir: &TempDir) -> SessionStore {
        SessionStore::new(tempdir.path().join("session.json"))
    }

    #[test]
    fn test_load_after_save_returns_same_cookies() {
        let tempdir = TempDir::new().unwrap();
        let store = store(&tempdir);
        let saved = cookies(&[("session", "abc"), ("keeplogged", "1|2|3")]);

        store.save(&saved).unwrap();
        let jar = SessionJar::new("tracker.test");
        let loaded = store.load(&jar).unwrap();

        assert_eq!(loaded, Some(saved.clone()));
        assert_eq!(jar.snapshot(), saved);
    }

    #[test]
    fn test_round_trip_empty_set() {
        let tempdir = TempDir::new().unwrap();
        let store = store(&tempdir);

        store.save(&CookieSet::new()).unwrap();
        assert_eq!(store.read().unwrap(), Some(CookieSet::new()));
    }

    #[test]
    fn test_load_without_file_leaves_jar_empty() {
        let tempdir = TempDir::new().unwrap();
        let jar = SessionJar::new("tracker.test");
        assert!(store(&tempdir).load(&jar).unwrap().is_none());
        assert!(jar.is_empty());
    }

    #[test]
    fn test_clear_then_load_is_absent() {
        let tempdir = TempDir::new().unwrap();
        let store = store(&tempdir);
        let jar = SessionJar::new("tracker.test");
        store.save(&cookies(&[("session", "abc")])).unwrap();
        store.load(&jar).unwrap();

        store.clear(&jar).unwrap();

        assert!(jar.is_empty());
        assert!(store.load(&jar).unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_clear_twice_is_idempotent() {
        let tempdir = TempDir::new().unwrap();
        let store = store(&tempdir);
        let jar = SessionJar::new("tracker.test");

        store.clear(&jar).unwrap();
        store.clear(&jar).unwrap();
        assert!(store.read().unwrap().is_none());
    }

    #[test]
    fn test_file_is_flat_json_object() {
        let tempdir = TempDir::new().unwrap();
        let store = store(&tempdir);
        store.save(&cookies(&[("session", "abc")])).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value, serde_json::json!({ "session": "abc" }));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let tempdir = TempDir::new().unwrap();
        let store = store(&tempdir);
        fs::write(store.path(), "[1, 2, 3]").unwrap();

        assert!(matches!(store.read(), Err(StorageError::Json { .. })));
    }
}
