//! `reqwest`-backed transport.
//!
//! Two clients share one [`SessionJar`]: one follows redirects (login flow,
//! landing page) and one does not (session check). Both apply the same
//! timeout, User-Agent and gzip settings.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder, RequestBuilder, redirect};
use tracing::{debug, instrument};
use url::Url;

use super::{HttpResponse, RedirectPolicy, SessionJar, Transport, TransportError};
use crate::user_agent::BROWSER_USER_AGENT;

/// Production [`Transport`] using `reqwest`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    following: Client,
    manual: Client,
}

impl ReqwestTransport {
    /// Builds both clients around the shared cookie jar.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ClientBuild`] when `reqwest` rejects the
    /// configuration (e.g. TLS backend initialisation failure).
    #[instrument(level = "debug", skip(jar))]
    pub fn new(jar: Arc<SessionJar>, timeout: Duration) -> Result<Self, TransportError> {
        let following = base_client_builder(Arc::clone(&jar), timeout)
            .redirect(redirect::Policy::limited(10))
            .build()
            .map_err(|source| TransportError::ClientBuild { source })?;
        let manual = base_client_builder(jar, timeout)
            .redirect(redirect::Policy::none())
            .build()
            .map_err(|source| TransportError::ClientBuild { source })?;
        Ok(Self { following, manual })
    }

    fn client(&self, redirects: RedirectPolicy) -> &Client {
        match redirects {
            RedirectPolicy::Follow => &self.following,
            RedirectPolicy::Manual => &self.manual,
        }
    }
}

fn base_client_builder(jar: Arc<SessionJar>, timeout: Duration) -> ClientBuilder {
    Client::builder()
        .cookie_provider(jar)
        .user_agent(BROWSER_USER_AGENT)
        .connect_timeout(timeout)
        .timeout(timeout)
        .gzip(true)
}

/// Whether 4xx/5xx responses become [`TransportError::HttpStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StatusCheck {
    Raise,
    Accept,
}

/// Sends a request and reads the full body.
async fn execute(
    url: &Url,
    request: RequestBuilder,
    check: StatusCheck,
) -> Result<HttpResponse, TransportError> {
    let response = request
        .send()
        .await
        .map_err(|error| TransportError::from_reqwest(url.as_str(), error))?;

    let status = response.status();
    let final_url = response.url().clone();
    debug!(status = status.as_u16(), final_url = %final_url, "response received");

    if check == StatusCheck::Raise && (status.is_client_error() || status.is_server_error()) {
        return Err(TransportError::http_status(
            final_url.as_str(),
            status.as_u16(),
        ));
    }

    let body = response
        .bytes()
        .await
        .map_err(|error| TransportError::from_reqwest(final_url.as_str(), error))?;

    Ok(HttpResponse::new(status.as_u16(), final_url, body.to_vec()))
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[instrument(level = "debug", skip(self), fields(url = %url))]
    async fn get(
        &self,
        url: &Url,
        redirects: RedirectPolicy,
    ) -> Result<HttpResponse, TransportError> {
        let request = self.client(redirects).get(url.clone());
        execute(url, request, StatusCheck::Raise).await
    }

    #[instrument(level = "debug", skip(self), fields(url = %url))]
    async fn get_any_status(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        let request = self.following.get(url.clone());
        execute(url, request, StatusCheck::Accept).await
    }

    // Form values carry the password; only the URL is recorded.
    #[instrument(level = "debug", skip(self, form), fields(url = %url))]
    async fn post_form(
        &self,
        url: &Url,
        form: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form.iter().copied())
            .finish();
        let request = self
            .following
            .post(url.clone())
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body);
        execute(url, request, StatusCheck::Raise).await
    }
}
