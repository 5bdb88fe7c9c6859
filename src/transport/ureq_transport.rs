//! Real HTTP transport using ureq
//!
//! Synchronous blocking client. Every call carries the per-call timeout;
//! there are no retries.

use crate::transport::types::{HttpResponse, HttpTransport, RedirectPolicy, TransportError};
use std::time::Duration;
use ureq::{Agent, AgentBuilder};

/// Real HTTP transport using ureq
///
/// Holds two agents: one following redirects and one returning
/// 3xx responses untouched (used by the checkout step).
#[derive(Debug)]
pub struct UreqTransport {
    following: Agent,
    manual: Agent,
    timeout_ms: u64,
}

impl UreqTransport {
    /// Create transport with default timeout (8s)
    pub fn new(user_agent: &str) -> Self {
        Self::with_timeout(user_agent, 8_000)
    }

    /// Create transport with custom timeout
    pub fn with_timeout(user_agent: &str, timeout_ms: u64) -> Self {
        let timeout = Duration::from_millis(timeout_ms);
        let following = AgentBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirects(5)
            .build();
        let manual = AgentBuilder::new()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirects(0)
            .build();

        Self {
            following,
            manual,
            timeout_ms,
        }
    }

    fn agent(&self, redirects: RedirectPolicy) -> &Agent {
        match redirects {
            RedirectPolicy::Follow => &self.following,
            RedirectPolicy::Manual => &self.manual,
        }
    }

    fn read_response(
        &self,
        result: Result<ureq::Response, ureq::Error>,
    ) -> Result<HttpResponse, TransportError> {
        let response = match result {
            Ok(response) => response,
            // Non-2xx statuses are answers, not failures
            Err(ureq::Error::Status(_, response)) => response,
            Err(ureq::Error::Transport(err)) => {
                let message = err.to_string();
                if message.contains("timed out") {
                    return Err(TransportError::Timeout(self.timeout_ms));
                }
                if matches!(err.kind(), ureq::ErrorKind::InvalidUrl) {
                    return Err(TransportError::InvalidUrl(message));
                }
                return Err(TransportError::Network(message));
            }
        };

        let status = response.status();
        let location = response.header("location").map(str::to_string);
        let body = response.into_string()?;

        Ok(HttpResponse {
            status,
            body,
            location,
        })
    }
}

impl HttpTransport for UreqTransport {
    fn get(&self, url: &str, redirects: RedirectPolicy) -> Result<HttpResponse, TransportError> {
        tracing::debug!(url, ?redirects, "GET");
        let result = self.agent(redirects).get(url).call();
        self.read_response(result)
    }

    fn post(
        &self,
        url: &str,
        content_type: &str,
        body: &str,
    ) -> Result<HttpResponse, TransportError> {
        tracing::debug!(url, content_type, body_len = body.len(), "POST");
        let result = self
            .following
            .post(url)
            .set("Content-Type", content_type)
            .set("Accept", "application/json, text/html;q=0.9")
            .send_string(body);
        self.read_response(result)
    }
}
