//! Tracker account credentials stored in the `[account]` table of `config.toml`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::FileConfig;
use crate::interaction::{InteractionError, UserInteraction};
use crate::storage::StorageError;

/// Username and password for the tracker.
///
/// The password is intentionally redacted in Debug output to prevent
/// accidental logging.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Account password (sensitive, never log).
    password: String,
}

impl Credentials {
    /// Creates a credential pair.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the password.
    ///
    /// Passwords are sensitive; avoid logging the return value.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Errors from credential loading and prompting.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// Config file could not be read or written.
    #[error("credential storage failed: {0}")]
    Storage(#[from] StorageError),

    /// The user could not be prompted.
    #[error("credential prompt failed: {0}")]
    Interaction(#[from] InteractionError),
}

/// Loads and saves [`Credentials`] in the config file.
///
/// Saving rewrites only the `[account]` table; other tables are preserved.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Creates a store backed by the given `config.toml`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Config file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the stored credentials, if any.
    ///
    /// An `[account]` table with a blank username counts as absent.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the config file is unreadable or invalid.
    pub fn load(&self) -> Result<Option<Credentials>, StorageError> {
        let account = FileConfig::load(&self.path)?
            .account
            .filter(|credentials| !credentials.username.trim().is_empty());
        debug!(found = account.is_some(), "loaded stored credentials");
        Ok(account)
    }

    /// Stores credentials, overwriting any previous account.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] when the config file cannot be read or written.
    pub fn save(&self, credentials: &Credentials) -> Result<(), StorageError> {
        let mut config = FileConfig::load(&self.path)?;
        config.account = Some(credentials.clone());
        config.save(&self.path)?;
        info!(
            username = %credentials.username,
            path = %self.path.display(),
            "saved account credentials"
        );
        Ok(())
    }

    /// Asks for username then password and persists them immediately.
    ///
    /// # Errors
    ///
    /// Returns [`CredentialError`] when prompting or saving fails.
    #[instrument(level = "debug", skip(self, interaction))]
    pub fn prompt_interactive(
        &self,
        interaction: &mut dyn UserInteraction,
    ) -> Result<Credentials, CredentialError> {
        let username = interaction.prompt("Username")?;
        let password = interaction.prompt("Password")?;
        let credentials = Credentials::new(username, password);
        self.save(&credentials)?;
        interaction.say("-");
        Ok(credentials)
    }
}
