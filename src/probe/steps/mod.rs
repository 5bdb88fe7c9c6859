//! Step executors
//!
//! Five stateless functions, one per commerce stage. Each takes the
//! typed outputs of earlier stages and returns a `StepOutcome`. Network
//! errors are caught here and become step failures; nothing propagates.

pub mod cart;
pub mod checkout;
pub mod discovery;
pub mod payment;
pub mod selection;

use crate::config::ProbeConfig;
use crate::transport::{HttpResponse, HttpTransport, RedirectPolicy, TransportError};

pub use cart::run_cart;
pub use checkout::run_checkout;
pub use discovery::run_discovery;
pub use payment::run_payment;
pub use selection::run_selection;

/// What a step needs to talk to the target host
pub struct StepEnv<'a> {
    pub transport: &'a dyn HttpTransport,
    pub config: &'a ProbeConfig,
    /// Scheme + host, no trailing slash
    pub base_url: &'a str,
}

impl<'a> StepEnv<'a> {
    pub fn new(transport: &'a dyn HttpTransport, config: &'a ProbeConfig, base_url: &'a str) -> Self {
        Self {
            transport,
            config,
            base_url,
        }
    }

    /// Absolute URL for a site path
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, url: &str, redirects: RedirectPolicy) -> Result<HttpResponse, TransportError> {
        self.transport.get(url, redirects)
    }

    pub fn post(
        &self,
        url: &str,
        content_type: &str,
        body: &str,
    ) -> Result<HttpResponse, TransportError> {
        self.transport.post(url, content_type, body)
    }
}
