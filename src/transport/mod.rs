//! HTTP transport for probe steps
//!
//! Provides the synchronous client the probe uses for every outbound call.
//! The real transport uses ureq; tests swap in `FakeTransport`.

mod fake_transport;
mod types;
mod ureq_transport;

pub use fake_transport::{FakeTransport, RecordedRequest};
pub use types::{HttpResponse, HttpTransport, RedirectPolicy, TransportError};
pub use ureq_transport::UreqTransport;

/// Concrete transport enum
///
/// Wraps all transport types so the prober owns one value without boxing.
#[derive(Debug)]
pub enum Transport {
    Real(UreqTransport),
    Fake(FakeTransport),
}

impl Transport {
    /// The fake transport, if this is one (test inspection)
    pub fn as_fake(&self) -> Option<&FakeTransport> {
        match self {
            Transport::Fake(t) => Some(t),
            Transport::Real(_) => None,
        }
    }
}

impl HttpTransport for Transport {
    fn get(&self, url: &str, redirects: RedirectPolicy) -> Result<HttpResponse, TransportError> {
        match self {
            Transport::Real(t) => t.get(url, redirects),
            Transport::Fake(t) => t.get(url, redirects),
        }
    }

    fn post(
        &self,
        url: &str,
        content_type: &str,
        body: &str,
    ) -> Result<HttpResponse, TransportError> {
        match self {
            Transport::Real(t) => t.post(url, content_type, body),
            Transport::Fake(t) => t.post(url, content_type, body),
        }
    }
}

impl From<FakeTransport> for Transport {
    fn from(t: FakeTransport) -> Self {
        Transport::Fake(t)
    }
}

impl From<UreqTransport> for Transport {
    fn from(t: UreqTransport) -> Self {
        Transport::Real(t)
    }
}
