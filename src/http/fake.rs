//! Scripted in-memory [`Transport`] for unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use url::Url;

use super::{CookieSet, HttpResponse, RedirectPolicy, SessionJar, Transport, TransportError};

/// One request as seen by [`FakeTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecordedRequest {
    pub method: &'static str,
    pub url: Url,
    pub redirects: Option<RedirectPolicy>,
    pub form: Vec<(String, String)>,
}

impl RecordedRequest {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.form
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

struct Reply {
    result: Result<HttpResponse, TransportError>,
    cookies: CookieSet,
}

/// Answers requests from a queue in order; panics when the queue runs dry.
pub(crate) struct FakeTransport {
    jar: Arc<SessionJar>,
    replies: Mutex<VecDeque<Reply>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeTransport {
    pub fn new(jar: Arc<SessionJar>) -> Self {
        Self {
            jar,
            replies: Mutex::new(VecDeque::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queues a response with the given final URL and body.
    pub fn reply(self, status: u16, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.reply_setting(status, url, body, &[])
    }

    /// Queues a response that also stores cookies in the jar.
    pub fn reply_setting(
        self,
        status: u16,
        url: &str,
        body: impl Into<Vec<u8>>,
        cookies: &[(&str, &str)],
    ) -> Self {
        let response = HttpResponse::new(status, url.parse().expect("test URL"), body);
        self.push(Ok(response), cookies)
    }

    /// Queues a transport failure.
    pub fn fail(self, error: TransportError) -> Self {
        self.push(Err(error), &[])
    }

    /// Shared handle to the request log; stays valid after the transport is boxed.
    pub fn requests(&self) -> Arc<Mutex<Vec<RecordedRequest>>> {
        Arc::clone(&self.requests)
    }

    fn push(self, result: Result<HttpResponse, TransportError>, cookies: &[(&str, &str)]) -> Self {
        let cookies = cookies
            .iter()
            .map(|(name, value)| ((*name).to_string(), (*value).to_string()))
            .collect();
        self.replies
            .lock()
            .unwrap()
            .push_back(Reply { result, cookies });
        self
    }

    fn answer(&self, request: RecordedRequest) -> Result<HttpResponse, TransportError> {
        let url = request.url.clone();
        self.requests.lock().unwrap().push(request);
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected request to {url}"));
        self.jar.extend(&reply.cookies);
        reply.result
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(
        &self,
        url: &Url,
        redirects: RedirectPolicy,
    ) -> Result<HttpResponse, TransportError> {
        self.answer(RecordedRequest {
            method: "GET",
            url: url.clone(),
            redirects: Some(redirects),
            form: Vec::new(),
        })
    }

    async fn get_any_status(&self, url: &Url) -> Result<HttpResponse, TransportError> {
        self.answer(RecordedRequest {
            method: "GET",
            url: url.clone(),
            redirects: Some(RedirectPolicy::Follow),
            form: Vec::new(),
        })
    }

    async fn post_form(
        &self,
        url: &Url,
        form: &[(&str, &str)],
    ) -> Result<HttpResponse, TransportError> {
        self.answer(RecordedRequest {
            method: "POST",
            url: url.clone(),
            redirects: None,
            form: form
                .iter()
                .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
                .collect(),
        })
    }
}
