//! Probe result types
//!
//! A `TestRun` is the finalized record of one probe against one domain:
//! the ordered step log, classified blockers, derived metrics and advice.

use crate::probe::context::{
    CartOutput, CheckoutOutput, DiscoveryOutput, FailureReason, PaymentOutput, SelectionOutput,
};
use crate::probe::platform::PlatformTag;
use crate::probe::revenue::RevenueImpact;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How deep a run goes into the commerce flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    Browse,
    Search,
    AddToCart,
    Checkout,
    FullFlow,
}

impl TestType {
    pub const ALL: [TestType; 5] = [
        TestType::Browse,
        TestType::Search,
        TestType::AddToCart,
        TestType::Checkout,
        TestType::FullFlow,
    ];

    /// Highest stage number this test type executes
    pub fn max_stage(self) -> u8 {
        match self {
            TestType::Browse => 1,
            TestType::Search => 2,
            TestType::AddToCart => 3,
            TestType::Checkout => 4,
            TestType::FullFlow => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TestType::Browse => "browse",
            TestType::Search => "search",
            TestType::AddToCart => "add_to_cart",
            TestType::Checkout => "checkout",
            TestType::FullFlow => "full_flow",
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TestType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TestType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| format!("unknown test type '{}'", s))
    }
}

/// The five commerce stages, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepAction {
    Discovery,
    Selection,
    Cart,
    Checkout,
    PaymentProtocol,
}

impl StepAction {
    pub const ALL: [StepAction; 5] = [
        StepAction::Discovery,
        StepAction::Selection,
        StepAction::Cart,
        StepAction::Checkout,
        StepAction::PaymentProtocol,
    ];

    /// 1-based stage number
    pub fn step_number(self) -> u8 {
        match self {
            StepAction::Discovery => 1,
            StepAction::Selection => 2,
            StepAction::Cart => 3,
            StepAction::Checkout => 4,
            StepAction::PaymentProtocol => 5,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StepAction::Discovery => "discovery",
            StepAction::Selection => "selection",
            StepAction::Cart => "cart",
            StepAction::Checkout => "checkout",
            StepAction::PaymentProtocol => "payment_protocol",
        }
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    Skipped,
}

/// Overall run status, derived from the step log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Passed,
    Partial,
    Failed,
    Blocked,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Passed => "passed",
            RunStatus::Partial => "partial",
            RunStatus::Failed => "failed",
            RunStatus::Blocked => "blocked",
        }
    }
}

/// Closed blocker taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockerKind {
    NoStructuredData,
    CaptchaBlocked,
    JavascriptRequired,
    NoGuestCheckout,
    NoApiCheckout,
    NoAgentProtocol,
    Other,
}

impl BlockerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BlockerKind::NoStructuredData => "no_structured_data",
            BlockerKind::CaptchaBlocked => "captcha_blocked",
            BlockerKind::JavascriptRequired => "javascript_required",
            BlockerKind::NoGuestCheckout => "no_guest_checkout",
            BlockerKind::NoApiCheckout => "no_api_checkout",
            BlockerKind::NoAgentProtocol => "no_agent_protocol",
            BlockerKind::Other => "other",
        }
    }
}

impl fmt::Display for BlockerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Blocking,
    Degraded,
}

/// A classified failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Blocker {
    #[serde(rename = "type")]
    pub kind: BlockerKind,
    pub description: String,
    pub severity: Severity,
    pub step_number: u8,
}

/// First stage and blocker that halted progress
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailurePoint {
    pub step: StepAction,
    pub step_number: u8,
    pub blocker: BlockerKind,
    pub description: String,
}

/// Canonical product record extracted by the selection step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub name: String,
    pub url: String,
    pub price: Option<f64>,
    pub currency: Option<String>,
    pub sku: Option<String>,
    pub availability: Option<String>,
    pub variant_id: Option<String>,
    pub platform: PlatformTag,
    /// Whether the name came from a structured Product block
    pub structured: bool,
}

/// Stage-specific payload recorded on a passing step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StepData {
    Discovery(DiscoveryOutput),
    Selection(SelectionOutput),
    Cart(CartOutput),
    Checkout(CheckoutOutput),
    PaymentProtocol(PaymentOutput),
}

/// One stage's outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepRecord {
    pub step_number: u8,
    pub action: StepAction,
    pub status: StepStatus,
    pub duration_ms: u64,
    pub error: Option<String>,
    /// Structured cause of a failure; drives blockers and recommendations
    pub reason: Option<FailureReason>,
    pub data: Option<StepData>,
}

impl StepRecord {
    pub fn skipped(action: StepAction) -> Self {
        Self {
            step_number: action.step_number(),
            action,
            status: StepStatus::Skipped,
            duration_ms: 0,
            error: None,
            reason: None,
            data: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Remediation advice derived from failed steps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub priority: Priority,
    pub action: String,
    pub detail: String,
    pub estimated_impact: String,
}

/// One complete probe against one domain
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRun {
    pub id: String,
    pub domain: String,
    pub test_type: TestType,
    pub category: String,
    pub status: RunStatus,
    pub steps: Vec<StepRecord>,
    pub blockers: Vec<Blocker>,
    pub failure_point: Option<FailurePoint>,
    pub success_rate: f64,
    pub revenue_impact: RevenueImpact,
    pub recommendations: Vec<Recommendation>,
    pub duration_ms: u64,
    pub tested_at: DateTime<Utc>,
}

impl TestRun {
    pub fn completed_steps(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| s.status == StepStatus::Passed)
            .count()
    }

    pub fn step(&self, action: StepAction) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.action == action)
    }

    /// Product extracted by the selection step, if it passed
    pub fn product(&self) -> Option<&Product> {
        self.steps.iter().find_map(|s| match &s.data {
            Some(StepData::Selection(selection)) => Some(&selection.product),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_test_type_stage_table() {
        let stages: Vec<u8> = TestType::ALL.iter().map(|t| t.max_stage()).collect();
        assert_eq!(stages, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_test_type_parse() {
        assert_eq!("add_to_cart".parse::<TestType>(), Ok(TestType::AddToCart));
        assert_eq!("full_flow".parse::<TestType>(), Ok(TestType::FullFlow));
        assert!("purchase".parse::<TestType>().is_err());
    }

    #[test]
    fn test_blocker_serializes_with_type_key() {
        let blocker = Blocker {
            kind: BlockerKind::CaptchaBlocked,
            description: "captcha".to_string(),
            severity: Severity::Blocking,
            step_number: 2,
        };
        let json = serde_json::to_value(&blocker).unwrap();
        assert_eq!(json["type"], "captcha_blocked");
        assert_eq!(json["stepNumber"], 2);
        assert_eq!(json["severity"], "blocking");
    }

    #[test]
    fn test_step_numbers_follow_action_order() {
        for (idx, action) in StepAction::ALL.iter().enumerate() {
            assert_eq!(action.step_number() as usize, idx + 1);
        }
    }
}
