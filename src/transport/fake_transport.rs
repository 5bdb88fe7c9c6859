//! Fake transport for testing
//!
//! Serves fixture responses from a route table instead of real HTTP calls.
//! Unrouted URLs answer 404.

use crate::transport::types::{HttpResponse, HttpTransport, RedirectPolicy, TransportError};
use std::collections::HashMap;
use std::sync::Mutex;

/// Request observed by the fake transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub url: String,
    pub body: Option<String>,
}

#[derive(Debug, Clone)]
enum Route {
    Respond(HttpResponse),
    Fail(String),
    Timeout,
}

/// Fake transport for testing (uses fixture strings)
#[derive(Debug, Default)]
pub struct FakeTransport {
    gets: HashMap<String, Route>,
    posts: HashMap<String, Route>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl FakeTransport {
    /// Create fake transport with no routes
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer GET `url` with `status` and `body`
    pub fn with_get(mut self, url: &str, status: u16, body: &str) -> Self {
        self.gets
            .insert(url.to_string(), Route::Respond(HttpResponse::new(status, body)));
        self
    }

    /// Answer GET `url` with a redirect to `location`
    pub fn with_redirect(mut self, url: &str, status: u16, location: &str) -> Self {
        self.gets.insert(
            url.to_string(),
            Route::Respond(HttpResponse::redirect(status, location)),
        );
        self
    }

    /// Answer POST `url` with `status` and `body`
    pub fn with_post(mut self, url: &str, status: u16, body: &str) -> Self {
        self.posts
            .insert(url.to_string(), Route::Respond(HttpResponse::new(status, body)));
        self
    }

    /// Fail GET `url` with a network error
    pub fn with_network_error(mut self, url: &str, msg: &str) -> Self {
        self.gets.insert(url.to_string(), Route::Fail(msg.to_string()));
        self
    }

    /// Fail GET `url` with a timeout
    pub fn with_timeout(mut self, url: &str) -> Self {
        self.gets.insert(url.to_string(), Route::Timeout);
        self
    }

    /// All requests issued so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Number of requests issued so far
    pub fn request_count(&self) -> usize {
        self.requests().len()
    }

    fn record(&self, method: &'static str, url: &str, body: Option<&str>) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                method,
                url: url.to_string(),
                body: body.map(str::to_string),
            });
        }
    }

    fn answer(route: Option<&Route>) -> Result<HttpResponse, TransportError> {
        match route {
            Some(Route::Respond(response)) => Ok(response.clone()),
            Some(Route::Fail(msg)) => Err(TransportError::Network(msg.clone())),
            Some(Route::Timeout) => Err(TransportError::Timeout(8_000)),
            None => Ok(HttpResponse::new(404, "Not Found")),
        }
    }
}

impl HttpTransport for FakeTransport {
    fn get(&self, url: &str, redirects: RedirectPolicy) -> Result<HttpResponse, TransportError> {
        self.record("GET", url, None);

        let mut response = Self::answer(self.gets.get(url))?;
        if redirects == RedirectPolicy::Follow {
            // Follow a single hop, enough for fixtures
            if let (true, Some(location)) = (response.is_redirect(), response.location.clone()) {
                self.record("GET", &location, None);
                response = Self::answer(self.gets.get(&location))?;
            }
        }
        Ok(response)
    }

    fn post(
        &self,
        url: &str,
        _content_type: &str,
        body: &str,
    ) -> Result<HttpResponse, TransportError> {
        self.record("POST", url, Some(body));
        Self::answer(self.posts.get(url))
    }
}
