//! Transport types
//!
//! Common types shared across transport implementations.

/// Transport errors
///
/// HTTP status codes are NOT errors at this layer: a 404 or 422 is a
/// response the probe steps classify themselves.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Network error (DNS failure, connection refused, TLS, etc.)
    #[error("Network error: {0}")]
    Network(String),

    /// Request exceeded the per-call timeout
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// Response body could not be read
    #[error("IO error: {0}")]
    Io(String),

    /// Malformed request URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

/// Redirect handling for a single GET
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectPolicy {
    /// Follow redirects up to the client limit
    Follow,
    /// Return the 3xx response as-is, with its `Location`
    Manual,
}

/// Response returned by a transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    /// `Location` header, present on redirects
    pub location: Option<String>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            location: None,
        }
    }

    pub fn redirect(status: u16, location: impl Into<String>) -> Self {
        Self {
            status,
            body: String::new(),
            location: Some(location.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirect(&self) -> bool {
        matches!(self.status, 301 | 302 | 303 | 307 | 308)
    }
}

/// Synchronous HTTP transport
///
/// Abstraction over the HTTP client so probe steps can be exercised
/// against `FakeTransport` route tables.
pub trait HttpTransport: Send + Sync {
    /// GET a URL
    fn get(&self, url: &str, redirects: RedirectPolicy) -> Result<HttpResponse, TransportError>;

    /// POST a body with the given content type
    fn post(
        &self,
        url: &str,
        content_type: &str,
        body: &str,
    ) -> Result<HttpResponse, TransportError>;
}
