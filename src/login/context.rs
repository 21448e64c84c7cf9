use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::http::{
    HttpResponse, RedirectPolicy, ReqwestTransport, SessionJar, SiteEndpoints, Transport,
    TransportError,
};

/// Everything a run needs to talk to the tracker: the transport, the cookie
/// jar it writes into, and the endpoints.
///
/// Owned by the top-level controller and lent to each component in turn.
pub struct SessionContext {
    transport: Box<dyn Transport>,
    jar: Arc<SessionJar>,
    site: SiteEndpoints,
}

impl SessionContext {
    /// Wraps an existing transport. `jar` must be the store that transport
    /// reads and writes cookies through.
    #[must_use]
    pub fn new(transport: Box<dyn Transport>, jar: Arc<SessionJar>, site: SiteEndpoints) -> Self {
        Self {
            transport,
            jar,
            site,
        }
    }

    /// Builds the production `reqwest` transport for `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the URL is not usable or the client
    /// cannot be built.
    pub fn connect(base_url: &Url, timeout: Duration) -> Result<Self, TransportError> {
        let site = SiteEndpoints::new(base_url)?;
        let jar = Arc::new(SessionJar::new(site.host()));
        let transport = ReqwestTransport::new(Arc::clone(&jar), timeout)?;
        Ok(Self::new(Box::new(transport), jar, site))
    }

    /// Tracker endpoints.
    #[must_use]
    pub fn site(&self) -> &SiteEndpoints {
        &self.site
    }

    /// Live cookie jar.
    #[must_use]
    pub fn jar(&self) -> &SessionJar {
        &self.jar
    }

    /// GET through the transport.
    ///
    /// # Errors
    ///
    /// Propagates [`TransportError`].
    pub async fn get(
        &self,
        url: &Url,
        redirects: RedirectPolicy,
    ) -> Result<HttpResponse, TransportError> {
        self.transport.get(url, redirects).await
    }

    /// GET that follows redirects and returns 4xx/5xx responses as-is.
    ///
    /// # Errors
    ///
    /// Propagates network and timeout [`TransportError`]s.
    pub async fn get_any_status(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        self.transport.get_any_status(url).await
    }

    /// Form POST through the transport.
    ///
    /// # Errors
    ///
    /// Propagates [`TransportError`].
    pub async fn post_form(
        &self,
        url: &Url,
        form: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        self.transport.post_form(url, form).await
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("site", &self.site)
            .field("jar", &self.jar)
            .finish_non_exhaustive()
    }
}
