//! Stage-indexed probe context
//!
//! Each step produces a distinct typed output. The orchestrator merges the
//! ones later steps consume into `ProbeContext`. A step whose input is absent
//! fails with its stage's natural reason instead of being skipped.

use crate::probe::types::{BlockerKind, Product, Severity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Where discovery found its candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoverySource {
    Sitemap,
    Homepage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryOutput {
    pub candidate_urls: Vec<String>,
    pub product_url: String,
    pub source: DiscoverySource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionOutput {
    pub product: Product,
}

/// Mechanism that placed the product in a cart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CartMethod {
    /// JSON cart-add endpoint keyed by variant id
    JsonCartApi,
    /// Form-encoded AJAX add-to-cart action keyed by SKU
    AjaxForm,
}

impl fmt::Display for CartMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CartMethod::JsonCartApi => f.write_str("json_cart_api"),
            CartMethod::AjaxForm => f.write_str("ajax_form"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartOutput {
    pub method: CartMethod,
    pub endpoint: String,
    pub status: u16,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOutput {
    pub path: String,
    pub url: String,
}

/// Where the agent payment capability was found
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProtocolSource {
    PriorScan,
    WellKnown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOutput {
    pub protocol: String,
    pub source: ProtocolSource,
}

/// Structured failure cause, one closed set across all stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum FailureReason {
    /// Neither the sitemap nor homepage links yielded product URLs
    NoProductUrls,
    /// Product page fetch failed (`status` absent on network errors)
    PageUnavailable { status: Option<u16> },
    /// No product name from structured data, metadata or headings
    NoProductData,
    /// CAPTCHA or bot challenge markers in the response
    Captcha,
    /// Cart API answered with a status other than 2xx or 422
    CartRejected { status: u16 },
    /// No cart endpoint or page reachable
    CartUnreachable,
    /// Cart page loads but no programmatic add-to-cart exists
    JavascriptRequired,
    /// Checkout sits behind a login or account wall
    LoginRequired,
    /// None of the candidate checkout paths answered
    CheckoutUnreachable,
    /// No agent payment protocol detected or advertised
    NoAgentProtocol,
    /// Well-known path answered but the manifest is unusable
    InvalidManifest,
}

impl FailureReason {
    pub fn blocker_kind(self) -> BlockerKind {
        match self {
            FailureReason::NoProductUrls
            | FailureReason::PageUnavailable { .. }
            | FailureReason::NoProductData => BlockerKind::NoStructuredData,
            FailureReason::Captcha => BlockerKind::CaptchaBlocked,
            FailureReason::CartRejected { .. }
            | FailureReason::CartUnreachable
            | FailureReason::CheckoutUnreachable => BlockerKind::NoApiCheckout,
            FailureReason::JavascriptRequired => BlockerKind::JavascriptRequired,
            FailureReason::LoginRequired => BlockerKind::NoGuestCheckout,
            FailureReason::NoAgentProtocol => BlockerKind::NoAgentProtocol,
            FailureReason::InvalidManifest => BlockerKind::Other,
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            FailureReason::NoAgentProtocol | FailureReason::InvalidManifest => Severity::Degraded,
            _ => Severity::Blocking,
        }
    }
}

/// A failed step: structured reason plus human-readable message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    pub reason: FailureReason,
    pub message: String,
}

impl StepFailure {
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
        }
    }
}

impl fmt::Display for StepFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Result of one step executor
pub type StepOutcome<T> = Result<T, StepFailure>;

/// Outputs of earlier steps that later steps consume
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProbeContext {
    pub discovery: Option<DiscoveryOutput>,
    pub selection: Option<SelectionOutput>,
    pub cart: Option<CartOutput>,
}

impl ProbeContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_discovery(self, output: DiscoveryOutput) -> Self {
        Self {
            discovery: Some(output),
            ..self
        }
    }

    pub fn with_selection(self, output: SelectionOutput) -> Self {
        Self {
            selection: Some(output),
            ..self
        }
    }

    pub fn with_cart(self, output: CartOutput) -> Self {
        Self {
            cart: Some(output),
            ..self
        }
    }

    /// Discovery output, or the failure selection reports without it
    pub fn require_discovery(&self) -> StepOutcome<&DiscoveryOutput> {
        self.discovery.as_ref().ok_or_else(|| {
            StepFailure::new(FailureReason::NoProductUrls, "No product URL from discovery")
        })
    }

    /// Selection output, or the failure cart and checkout report without it
    pub fn require_selection(&self) -> StepOutcome<&SelectionOutput> {
        self.selection.as_ref().ok_or_else(|| {
            StepFailure::new(FailureReason::NoProductData, "No product from selection")
        })
    }

    /// Cart output, or the failure checkout reports without it
    pub fn require_cart(&self) -> StepOutcome<&CartOutput> {
        self.cart.as_ref().ok_or_else(|| {
            StepFailure::new(FailureReason::CartUnreachable, "No cart from the cart step")
        })
    }
}
