//! Configuration file and effective run settings.
//!
//! `config.toml` holds two optional tables:
//!
//! ```toml
//! [account]
//! username = "alice"
//! password = "hunter2"
//!
//! [client]
//! base_url = "https://gazellegames.net"
//! timeout_secs = 60
//! browse_pause_secs = 3
//! ```
//!
//! Command-line values override file values, which override built-in defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::auth::Credentials;
use crate::storage::{self, DataPaths, StorageError};

/// Tracker the crate talks to when nothing else is configured.
pub const DEFAULT_BASE_URL: &str = "https://gazellegames.net";
/// Per-request timeout applied to every call.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
/// Pause after the landing-page fetch.
pub const DEFAULT_BROWSE_PAUSE_SECS: u64 = 3;

const MAX_TIMEOUT_SECS: u64 = 3600;
const MAX_BROWSE_PAUSE_SECS: u64 = 600;

/// Errors while resolving settings.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A numeric setting is out of range.
    #[error("invalid value for `{field}`: {value}. Expected range: {expected}")]
    OutOfRange {
        /// Setting name.
        field: &'static str,
        /// Rejected value.
        value: u64,
        /// Accepted range, for display.
        expected: &'static str,
    },

    /// The base URL is not an absolute http(s) URL.
    #[error("invalid base URL '{url}': expected an absolute http(s) URL")]
    InvalidBaseUrl {
        /// Rejected value.
        url: String,
    },

    /// Config file could not be read or parsed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Parsed `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileConfig {
    /// Stored tracker account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<Credentials>,
    /// Client overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<ClientSection>,
}

/// `[client]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSection {
    /// Tracker base URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
    /// Pause after the landing-page fetch, in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browse_pause_secs: Option<u64>,
}

impl FileConfig {
    /// Reads `path`, returning the default config when the file is absent or empty.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the file cannot be read or is not valid TOML.
    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let Some(raw) = storage::read_optional(path)? else {
            return Ok(Self::default());
        };
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        toml::from_str(&raw).map_err(|source| StorageError::TomlParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Writes the config to `path` with owner-only permissions.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when encoding or writing fails.
    pub fn save(&self, path: &Path) -> Result<(), StorageError> {
        let encoded = toml::to_string_pretty(self).map_err(|source| StorageError::TomlEncode {
            path: path.to_path_buf(),
            source,
        })?;
        storage::write_private_file(path, encoded.as_bytes())
    }
}

/// Values supplied on the command line.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    /// Data directory override.
    pub data_dir: Option<PathBuf>,
    /// Base URL override.
    pub base_url: Option<String>,
    /// Timeout override in seconds.
    pub timeout_secs: Option<u64>,
    /// Browse pause override in seconds.
    pub browse_pause_secs: Option<u64>,
    /// Skip the post-login landing-page fetch.
    pub skip_browse: bool,
}

/// Effective settings for one run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Where config, session and history files live.
    pub paths: DataPaths,
    /// Tracker base URL.
    pub base_url: Url,
    /// Timeout applied to every request.
    pub timeout: Duration,
    /// Pause after the landing-page fetch.
    pub browse_pause: Duration,
    /// Whether to run the landing-page fetch.
    pub browse: bool,
}

impl Settings {
    /// Resolves settings from overrides, the config file and defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the data directory cannot be determined,
    /// the config file is unreadable, or a value is out of range.
    pub fn resolve(overrides: &SettingsOverrides) -> Result<Self, ConfigError> {
        let paths = match &overrides.data_dir {
            Some(dir) => DataPaths::new(dir),
            None => DataPaths::from_env()?,
        };
        let file_config = FileConfig::load(&paths.config_file())?;
        let settings = Self::merge(paths, overrides, file_config.client.as_ref())?;
        debug!(
            data_dir = %settings.paths.dir().display(),
            base_url = %settings.base_url,
            timeout_secs = settings.timeout.as_secs(),
            "settings resolved"
        );
        Ok(settings)
    }

    fn merge(
        paths: DataPaths,
        overrides: &SettingsOverrides,
        client: Option<&ClientSection>,
    ) -> Result<Self, ConfigError> {
        let base_url = overrides
            .base_url
            .clone()
            .or_else(|| client.and_then(|c| c.base_url.clone()))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout_secs = overrides
            .timeout_secs
            .or_else(|| client.and_then(|c| c.timeout_secs))
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let browse_pause_secs = overrides
            .browse_pause_secs
            .or_else(|| client.and_then(|c| c.browse_pause_secs))
            .unwrap_or(DEFAULT_BROWSE_PAUSE_SECS);

        if !(1..=MAX_TIMEOUT_SECS).contains(&timeout_secs) {
            return Err(ConfigError::OutOfRange {
                field: "timeout_secs",
                value: timeout_secs,
                expected: "1..=3600",
            });
        }
        if browse_pause_secs > MAX_BROWSE_PAUSE_SECS {
            return Err(ConfigError::OutOfRange {
                field: "browse_pause_secs",
                value: browse_pause_secs,
                expected: "0..=600",
            });
        }

        Ok(Self {
            paths,
            base_url: parse_base_url(&base_url)?,
            timeout: Duration::from_secs(timeout_secs),
            browse_pause: Duration::from_secs(browse_pause_secs),
            browse: !overrides.skip_browse,
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
    };
    let url = Url::parse(raw.trim()).map_err(|_| invalid())?;
    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(invalid());
    }
    Ok(url)
}
