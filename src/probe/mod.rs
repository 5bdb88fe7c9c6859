//! Synthetic checkout-flow probe
//!
//! Walks a storefront through five commerce stages over unauthenticated
//! HTTP (discovery, selection, cart, checkout, payment protocol) and
//! reports where and why an autonomous purchasing agent would get stuck.

pub mod context;
pub mod markup;
pub mod orchestrator;
pub mod platform;
pub mod recommendations;
pub mod revenue;
pub mod steps;
pub mod types;

pub use context::{FailureReason, ProbeContext, StepFailure, StepOutcome};
pub use orchestrator::{normalize_domain, ProbeError, ProbeRequest, Prober};
pub use platform::{detect_platform, strategy_for, PlatformStrategy, PlatformTag};
pub use recommendations::generate_recommendations;
pub use revenue::{estimate_revenue_impact, RevenueBaseline, RevenueBaselines, RevenueImpact};
pub use types::{
    Blocker, BlockerKind, FailurePoint, Priority, Product, Recommendation, RunStatus, Severity,
    StepAction, StepData, StepRecord, StepStatus, TestRun, TestType,
};
