//! User-Agent string for tracker requests.
//!
//! The tracker serves its regular login form to browsers, so every client in
//! a run presents the same desktop browser identity.

/// Desktop Chrome User-Agent presented to the tracker.
pub(crate) const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/72.0.3626.121 Safari/537.36";
