//! HTTP transport for tracker requests.
//!
//! - [`Transport`] - Async trait the login flow talks to
//! - [`ReqwestTransport`] - Production transport backed by `reqwest`
//! - [`SessionJar`] - Cookie store shared by every client in a run
//! - [`SiteEndpoints`] - The tracker URLs the crate touches

mod client;
mod error;
#[cfg(test)]
pub(crate) mod fake;
mod jar;
mod site;

pub use client::ReqwestTransport;
pub use error::TransportError;
pub use jar::{CookieSet, SessionJar};
pub use site::SiteEndpoints;

use async_trait::async_trait;
use url::Url;

/// Whether a GET should follow redirects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectPolicy {
    /// Follow redirects and report the final URL.
    Follow,
    /// Return the first response as-is (used by the session check).
    Manual,
}

/// A fully-read response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code of the final response.
    pub status: u16,
    /// URL of the final response after any redirects.
    pub url: Url,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Creates a response from its parts.
    #[must_use]
    pub fn new(status: u16, url: Url, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            url,
            body: body.into(),
        }
    }

    /// Returns the body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Request surface used by the session validator, login orchestrator and
/// post-login action.
///
/// Except for [`Transport::get_any_status`], implementations must return
/// `Err` for 4xx/5xx responses, mirroring a raise-for-status check. All
/// methods keep cookies flowing through the shared jar.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issues a GET request.
    async fn get(&self, url: &Url, redirects: RedirectPolicy)
    -> Result<HttpResponse, TransportError>;

    /// Issues a GET request following redirects and returns the response
    /// whatever its status. Only network failures and timeouts are errors.
    async fn get_any_status(&self, url: &Url) -> Result<HttpResponse, TransportError>;

    /// Issues a form-encoded POST request, following redirects.
    async fn post_form(
        &self,
        url: &Url,
        form: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError>;
}
