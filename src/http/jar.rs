//! Session cookie store shared by the tracker clients.
//!
//! The tracker session is a flat `name -> value` map scoped to one host. A
//! dedicated [`CookieStore`] (rather than `reqwest::cookie::Jar`) is needed so
//! the session can be snapshotted to disk, re-seeded on startup and cleared
//! when the session check rejects it.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use reqwest::cookie::CookieStore;
use reqwest::header::HeaderValue;
use tracing::{debug, trace};
use url::Url;

/// Cookie name to value mapping, as persisted in the session file.
pub type CookieSet = BTreeMap<String, String>;

/// Host-scoped cookie store plugged into `reqwest::ClientBuilder::cookie_provider`.
pub struct SessionJar {
    host: String,
    cookies: RwLock<CookieSet>,
}

impl SessionJar {
    /// Creates an empty jar for the given host.
    #[must_use]
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into().to_ascii_lowercase(),
            cookies: RwLock::new(CookieSet::new()),
        }
    }

    /// Returns a copy of every cookie currently held.
    #[must_use]
    pub fn snapshot(&self) -> CookieSet {
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Merges cookies into the jar, overwriting same-named entries.
    pub fn extend(&self, cookies: &CookieSet) {
        let mut guard = self.cookies.write().unwrap_or_else(PoisonError::into_inner);
        for (name, value) in cookies {
            guard.insert(name.clone(), value.clone());
        }
        debug!(count = cookies.len(), "seeded session jar");
    }

    /// Drops every cookie.
    pub fn clear(&self) {
        self.cookies
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Number of cookies held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns true when the jar holds no cookies.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the cookie value for `name`.
    ///
    /// Cookie values are sensitive; avoid logging the return value.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        self.cookies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    fn matches_host(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();
        host == self.host
            || host
                .strip_suffix(self.host.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }

    fn apply_set_cookie(&self, header: &str) {
        let Some(update) = parse_set_cookie(header, SystemTime::now()) else {
            trace!("ignoring unparseable Set-Cookie header");
            return;
        };

        let mut guard = self.cookies.write().unwrap_or_else(PoisonError::into_inner);
        match update {
            CookieUpdate::Store { name, value } => {
                debug!(name = %name, "storing session cookie");
                guard.insert(name, value);
            }
            CookieUpdate::Remove { name } => {
                debug!(name = %name, "server expired session cookie");
                guard.remove(&name);
            }
        }
    }
}

// Values are redacted so the jar can sit inside Debug-derived structs.
impl fmt::Debug for SessionJar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.snapshot().into_keys().collect();
        f.debug_struct("SessionJar")
            .field("host", &self.host)
            .field("cookies", &names)
            .finish()
    }
}

impl CookieStore for SessionJar {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, url: &Url) {
        if !self.matches_host(url) {
            trace!(url = %url, "ignoring cookies from foreign host");
            return;
        }
        for header in cookie_headers {
            if let Ok(raw) = header.to_str() {
                self.apply_set_cookie(raw);
            }
        }
    }

    fn cookies(&self, url: &Url) -> Option<HeaderValue> {
        if !self.matches_host(url) {
            return None;
        }
        let guard = self.cookies.read().unwrap_or_else(PoisonError::into_inner);
        if guard.is_empty() {
            return None;
        }
        let header = guard
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ");
        HeaderValue::from_str(&header).ok()
    }
}

#[derive(Debug, PartialEq, Eq)]
enum CookieUpdate {
    Store { name: String, value: String },
    Remove { name: String },
}

/// Parses the name/value pair of a `Set-Cookie` header and decides whether the
/// server is setting or expiring it.
fn parse_set_cookie(header: &str, now: SystemTime) -> Option<CookieUpdate> {
    let mut parts = header.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim();
    if name.is_empty() {
        return None;
    }
    let value = value.trim().trim_matches('"');

    let mut expired = false;
    for attribute in parts {
        let Some((key, attr_value)) = attribute.split_once('=') else {
            continue;
        };
        let attr_value = attr_value.trim();
        match key.trim().to_ascii_lowercase().as_str() {
            "max-age" if attr_value.parse::<i64>().is_ok_and(|age| age <= 0) => expired = true,
            "expires" if httpdate::parse_http_date(attr_value).is_ok_and(|at| at <= now) => {
                expired = true;
            }
            _ => {}
        }
    }

    if expired {
        Some(CookieUpdate::Remove {
            name: name.to_string(),
        })
    } else {
        Some(CookieUpdate::Store {
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}
