use url::Url;

use super::TransportError;

const LOGIN_PATH: &str = "login.php";

/// Tracker endpoints derived from the configured base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteEndpoints {
    root: Url,
    login: Url,
}

impl SiteEndpoints {
    /// Builds endpoints from a base URL such as `https://gazellegames.net`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] when the base is not an absolute
    /// http(s) URL.
    pub fn new(base: &Url) -> Result<Self, TransportError> {
        if !matches!(base.scheme(), "http" | "https") || base.host_str().is_none() {
            return Err(TransportError::invalid_url(base.as_str()));
        }

        let mut root = base.clone();
        root.set_query(None);
        root.set_fragment(None);
        if !root.path().ends_with('/') {
            let path = format!("{}/", root.path());
            root.set_path(&path);
        }

        let login = root
            .join(LOGIN_PATH)
            .map_err(|_| TransportError::invalid_url(root.as_str()))?;

        Ok(Self { root, login })
    }

    /// Parses and builds endpoints from a string.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::InvalidUrl`] for unparseable or non-http input.
    pub fn parse(base: &str) -> Result<Self, TransportError> {
        let url = Url::parse(base).map_err(|_| TransportError::invalid_url(base))?;
        Self::new(&url)
    }

    /// Site root, also used for the session check.
    #[must_use]
    pub fn root(&self) -> &Url {
        &self.root
    }

    /// Login endpoint (GET for the form, POST for credentials and 2FA).
    #[must_use]
    pub fn login(&self) -> &Url {
        &self.login
    }

    /// Host name the session cookies belong to.
    #[must_use]
    pub fn host(&self) -> &str {
        self.root.host_str().unwrap_or_default()
    }
}
