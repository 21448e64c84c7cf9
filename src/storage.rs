//! On-disk layout for credentials, session cookies and history.
//!
//! Everything lives in one data directory:
//! `$XDG_CONFIG_HOME/tracker-session/` (or `~/.config/tracker-session/`,
//! or `%APPDATA%\tracker-session\`), unless overridden on the command line.

use std::env;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

const APP_DIR_NAME: &str = "tracker-session";
const CONFIG_FILE_NAME: &str = "config.toml";
const SESSION_FILE_NAME: &str = "session.json";
const HISTORY_FILE_NAME: &str = "history.json";

/// Errors for persisted state.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// No suitable user config directory is available.
    #[error("unable to determine data directory (set XDG_CONFIG_HOME or HOME, or pass --data-dir)")]
    DataDirUnavailable,

    /// Filesystem I/O failed.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File or directory involved.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// JSON file could not be parsed or encoded.
    #[error("invalid JSON in {path}: {source}")]
    Json {
        /// File involved.
        path: PathBuf,
        /// The serde error.
        #[source]
        source: serde_json::Error,
    },

    /// TOML file could not be parsed.
    #[error("invalid TOML in {path}: {source}")]
    TomlParse {
        /// File involved.
        path: PathBuf,
        /// The parse error.
        #[source]
        source: toml::de::Error,
    },

    /// TOML could not be encoded.
    #[error("failed to encode TOML for {path}: {source}")]
    TomlEncode {
        /// File involved.
        path: PathBuf,
        /// The encode error.
        #[source]
        source: toml::ser::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

/// File locations inside the data directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    dir: PathBuf,
}

impl DataPaths {
    /// Uses `dir` as the data directory.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Resolves the default data directory from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::DataDirUnavailable`] when no usable base is set.
    pub fn from_env() -> Result<Self, StorageError> {
        resolve_data_dir(
            sanitize_env_path(env::var_os("XDG_CONFIG_HOME")),
            sanitize_env_path(env::var_os("HOME")),
            sanitize_env_path(env::var_os("APPDATA")),
        )
        .map(Self::new)
    }

    /// The data directory itself.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `config.toml`: account credentials and client settings.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.dir.join(CONFIG_FILE_NAME)
    }

    /// `session.json`: persisted cookie set.
    #[must_use]
    pub fn session_file(&self) -> PathBuf {
        self.dir.join(SESSION_FILE_NAME)
    }

    /// `history.json`: inert history map.
    #[must_use]
    pub fn history_file(&self) -> PathBuf {
        self.dir.join(HISTORY_FILE_NAME)
    }
}

fn sanitize_env_path(value: Option<OsString>) -> Option<PathBuf> {
    let value = value?;
    if value.to_string_lossy().trim().is_empty() {
        return None;
    }

    Some(PathBuf::from(value))
}

fn resolve_data_dir(
    xdg_config_home: Option<PathBuf>,
    home: Option<PathBuf>,
    app_data: Option<PathBuf>,
) -> Result<PathBuf, StorageError> {
    if let Some(xdg) = xdg_config_home {
        return Ok(xdg.join(APP_DIR_NAME));
    }
    if let Some(home) = home {
        return Ok(home.join(".config").join(APP_DIR_NAME));
    }
    if let Some(app_data) = app_data {
        return Ok(app_data.join(APP_DIR_NAME));
    }

    Err(StorageError::DataDirUnavailable)
}

/// Reads a file, returning `Ok(None)` when it does not exist.
pub(crate) fn read_optional(path: &Path) -> Result<Option<String>, StorageError> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(error) => Err(StorageError::io(path, error)),
    }
}

/// Writes a file readable only by the owner, creating parent directories.
pub(crate) fn write_private_file(path: &Path, contents: &[u8]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|error| StorageError::io(parent, error))?;
    }

    fs::write(path, contents).map_err(|error| StorageError::io(path, error))?;
    set_owner_only_permissions(path)
}

/// Removes a file; a missing file is not an error.
///
/// Returns `true` when a file was actually deleted.
pub(crate) fn remove_if_exists(path: &Path) -> Result<bool, StorageError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(error) => Err(StorageError::io(path, error)),
    }
}

#[cfg(unix)]
fn set_owner_only_permissions(path: &Path) -> Result<(), StorageError> {
    use std::os::unix::fs::PermissionsExt;

    let permissions = fs::Permissions::from_mode(0o600);
    fs::set_permissions(path, permissions).map_err(|error| StorageError::io(path, error))
}

#[cfg(not(unix))]
fn set_owner_only_permissions(_path: &Path) -> Result<(), StorageError> {
    Ok(())
}
