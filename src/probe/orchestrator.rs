//! Probe orchestrator: stage sequencing and run assembly
//!
//! ## Sequencing
//!
//! Stages run strictly in order up to the test type's maximum stage. A stage
//! whose predecessor did not pass is recorded as skipped without any network
//! call. A fixed delay precedes every executed stage after the first.
//!
//! ## Failure Semantics
//!
//! * Step failures are values in the step log, never errors
//! * Store lookups that fail are logged and treated as "nothing known"
//! * Persisting the finished run is best-effort; its error is logged and dropped
//! * The only `Err` from `run` is an input domain that cannot be normalized

use crate::config::ProbeConfig;
use crate::probe::context::{ProbeContext, StepOutcome};
use crate::probe::recommendations::generate_recommendations;
use crate::probe::revenue::{estimate_revenue_impact, round2};
use crate::probe::steps::{
    run_cart, run_checkout, run_discovery, run_payment, run_selection, StepEnv,
};
use crate::probe::types::{
    Blocker, FailurePoint, RunStatus, Severity, StepAction, StepData, StepRecord, StepStatus,
    TestRun, TestType,
};
use crate::store::{NullStore, ProbeStore, ProtocolDetection};
use crate::transport::{Transport, UreqTransport};
use chrono::Utc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Probe errors
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Invalid domain '{0}'")]
    InvalidDomain(String),

    #[error("Probe of '{0}' aborted unexpectedly")]
    Aborted(String),
}

/// One probe to run
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeRequest {
    pub domain: String,
    pub test_type: TestType,
    /// Merchant category for revenue estimation; falls back to the prior scan
    pub category: Option<String>,
}

impl ProbeRequest {
    pub fn new(domain: impl Into<String>, test_type: TestType) -> Self {
        Self {
            domain: domain.into(),
            test_type,
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Normalize user input to a bare lowercase hostname
///
/// Accepts `Shop.Example.com`, `https://shop.example.com/path`,
/// `shop.example.com:443` and similar; rejects anything that is not a
/// syntactically valid hostname afterwards.
pub fn normalize_domain(input: &str) -> Result<String, ProbeError> {
    let invalid = || ProbeError::InvalidDomain(input.to_string());

    let trimmed = input.trim();
    let rest = trimmed
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(trimmed);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    let host = host_port
        .split(':')
        .next()
        .unwrap_or_default()
        .trim_end_matches('.')
        .to_ascii_lowercase();

    if host.is_empty() || host.len() > 253 {
        return Err(invalid());
    }
    let labels_ok = host.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    if !labels_ok {
        return Err(invalid());
    }
    Ok(host)
}

/// Runs probes against storefronts
///
/// Holds the transport, the persistence collaborator and the configuration.
/// `run` takes `&self`, so one prober can serve many concurrent runs.
pub struct Prober {
    transport: Transport,
    store: Arc<dyn ProbeStore>,
    config: ProbeConfig,
}

impl Prober {
    /// Prober with a real HTTP transport and no store
    pub fn new(config: ProbeConfig) -> Self {
        let transport = UreqTransport::with_timeout(&config.user_agent, config.request_timeout_ms);
        Self {
            transport: transport.into(),
            store: Arc::new(NullStore),
            config,
        }
    }

    pub fn with_transport(mut self, transport: impl Into<Transport>) -> Self {
        self.transport = transport.into();
        self
    }

    pub fn with_store(mut self, store: Arc<dyn ProbeStore>) -> Self {
        self.store = store;
        self
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    /// Probe one domain and return the finalized run
    pub fn run(&self, request: &ProbeRequest) -> Result<TestRun, ProbeError> {
        let domain = normalize_domain(&request.domain)?;
        let started = Instant::now();
        let tested_at = Utc::now();
        let id = Uuid::new_v4().to_string();
        let base_url = format!("{}://{}", self.config.scheme, domain);

        info!(%domain, test_type = %request.test_type, run_id = %id, "starting probe");

        let scan = self.store.lookup_prior_scan(&domain).unwrap_or_else(|e| {
            warn!(%domain, error = %e, "prior scan lookup failed");
            None
        });
        let detections: Vec<ProtocolDetection> = match &scan {
            Some(scan) => self
                .store
                .lookup_protocol_detections(&scan.scan_id)
                .unwrap_or_else(|e| {
                    warn!(%domain, scan_id = %scan.scan_id, error = %e, "protocol detection lookup failed");
                    Vec::new()
                }),
            None => Vec::new(),
        };
        let category = request
            .category
            .clone()
            .or_else(|| scan.as_ref().and_then(|s| s.category.clone()))
            .unwrap_or_else(|| "default".to_string());

        let env = StepEnv::new(&self.transport, &self.config, &base_url);
        let mut ctx = ProbeContext::new();
        let mut steps: Vec<StepRecord> = Vec::new();
        let mut blockers: Vec<Blocker> = Vec::new();

        let stage_count = usize::from(request.test_type.max_stage()).min(StepAction::ALL.len());
        for (index, &action) in StepAction::ALL[..stage_count].iter().enumerate() {
            let predecessor_passed = steps
                .last()
                .map_or(true, |s| s.status == StepStatus::Passed);
            if !predecessor_passed {
                debug!(%domain, step = %action, "skipping step");
                steps.push(StepRecord::skipped(action));
                continue;
            }

            if index > 0 && self.config.step_delay_ms > 0 {
                thread::sleep(Duration::from_millis(self.config.step_delay_ms));
            }

            let step_started = Instant::now();
            let outcome = execute(action, &env, &ctx, &detections);
            let duration_ms = step_started.elapsed().as_millis() as u64;

            let record = match outcome {
                Ok(data) => {
                    debug!(%domain, step = %action, duration_ms, "step passed");
                    ctx = merge(ctx, &data);
                    StepRecord {
                        step_number: action.step_number(),
                        action,
                        status: StepStatus::Passed,
                        duration_ms,
                        error: None,
                        reason: None,
                        data: Some(data),
                    }
                }
                Err(failure) => {
                    info!(%domain, step = %action, reason = ?failure.reason, error = %failure.message, "step failed");
                    blockers.push(Blocker {
                        kind: failure.reason.blocker_kind(),
                        description: failure.message.clone(),
                        severity: failure.reason.severity(),
                        step_number: action.step_number(),
                    });
                    StepRecord {
                        step_number: action.step_number(),
                        action,
                        status: StepStatus::Failed,
                        duration_ms,
                        error: Some(failure.message),
                        reason: Some(failure.reason),
                        data: None,
                    }
                }
            };
            steps.push(record);
        }

        let total = steps.len();
        let completed = steps
            .iter()
            .filter(|s| s.status == StepStatus::Passed)
            .count();
        let success_rate = if total == 0 {
            0.0
        } else {
            round2(100.0 * completed as f64 / total as f64)
        };
        let status = if completed == total {
            RunStatus::Passed
        } else if completed == 0 {
            if blockers.is_empty() {
                RunStatus::Failed
            } else {
                RunStatus::Blocked
            }
        } else {
            RunStatus::Partial
        };

        let run = TestRun {
            id,
            domain,
            test_type: request.test_type,
            failure_point: failure_point(&blockers),
            revenue_impact: estimate_revenue_impact(&self.config.baselines, &category, success_rate),
            recommendations: generate_recommendations(&steps),
            category,
            status,
            steps,
            blockers,
            success_rate,
            duration_ms: started.elapsed().as_millis() as u64,
            tested_at,
        };

        info!(
            domain = %run.domain,
            status = run.status.as_str(),
            success_rate = run.success_rate,
            duration_ms = run.duration_ms,
            "probe finished"
        );

        match self.store.upsert_test_run(&run) {
            Ok(id) => debug!(run_id = %id, "persisted test run"),
            Err(e) => warn!(domain = %run.domain, error = %e, "failed to persist test run"),
        }

        Ok(run)
    }

    /// Probe independent domains concurrently, one thread per request
    ///
    /// Results come back in request order.
    pub fn run_batch(&self, requests: &[ProbeRequest]) -> Vec<Result<TestRun, ProbeError>> {
        thread::scope(|scope| {
            let handles: Vec<_> = requests
                .iter()
                .map(|request| (request, scope.spawn(move || self.run(request))))
                .collect();

            handles
                .into_iter()
                .map(|(request, handle)| {
                    handle
                        .join()
                        .unwrap_or_else(|_| Err(ProbeError::Aborted(request.domain.clone())))
                })
                .collect()
        })
    }
}

/// Run one stage against the outputs of the stages before it
fn execute(
    action: StepAction,
    env: &StepEnv<'_>,
    ctx: &ProbeContext,
    detections: &[ProtocolDetection],
) -> StepOutcome<StepData> {
    match action {
        StepAction::Discovery => run_discovery(env).map(StepData::Discovery),
        StepAction::Selection => {
            run_selection(env, ctx.require_discovery()?).map(StepData::Selection)
        }
        StepAction::Cart => run_cart(env, ctx.require_selection()?).map(StepData::Cart),
        StepAction::Checkout => {
            run_checkout(env, ctx.require_selection()?, ctx.require_cart()?)
                .map(StepData::Checkout)
        }
        StepAction::PaymentProtocol => {
            run_payment(env, detections).map(StepData::PaymentProtocol)
        }
    }
}

fn merge(ctx: ProbeContext, data: &StepData) -> ProbeContext {
    match data {
        StepData::Discovery(out) => ctx.with_discovery(out.clone()),
        StepData::Selection(out) => ctx.with_selection(out.clone()),
        StepData::Cart(out) => ctx.with_cart(out.clone()),
        StepData::Checkout(_) | StepData::PaymentProtocol(_) => ctx,
    }
}

/// First blocking failure, else the first degraded one
fn failure_point(blockers: &[Blocker]) -> Option<FailurePoint> {
    let blocker = blockers
        .iter()
        .find(|b| b.severity == Severity::Blocking)
        .or_else(|| blockers.first())?;
    let step = StepAction::ALL
        .iter()
        .copied()
        .find(|a| a.step_number() == blocker.step_number)?;
    Some(FailurePoint {
        step,
        step_number: blocker.step_number,
        blocker: blocker.kind,
        description: blocker.description.clone(),
    })
}
