//! Test run rendering for terminal display
//!
//! Pure functions over a finalized `TestRun`; nothing is computed here that
//! the run does not already carry.

use crate::probe::types::{Priority, Severity, StepStatus, TestRun};

/// Render a run as a plain-text table
pub fn render_table(run: &TestRun) -> String {
    let mut output = format!("Agent checkout probe: {}\n", run.domain);
    output.push_str(&format!(
        "Test: {}  Status: {}  Success: {:.2}%  ({} ms)\n",
        run.test_type,
        run.status.as_str().to_uppercase(),
        run.success_rate,
        run.duration_ms
    ));
    output.push_str(&format!("Run: {}  At: {}\n\n", run.id, run.tested_at.to_rfc3339()));

    output.push_str(&format!(
        "{:<4} {:<18} {:<8} {:>8}  {}\n",
        "#", "STEP", "STATUS", "MS", "DETAIL"
    ));
    for step in &run.steps {
        let status = match step.status {
            StepStatus::Passed => "PASS",
            StepStatus::Failed => "FAIL",
            StepStatus::Skipped => "SKIP",
        };
        output.push_str(&format!(
            "{:<4} {:<18} {:<8} {:>8}  {}\n",
            step.step_number,
            step.action.as_str(),
            status,
            step.duration_ms,
            step.error.as_deref().unwrap_or("")
        ));
    }

    if let Some(product) = run.product() {
        output.push_str(&format!(
            "\nProduct: {} [{}]",
            product.name, product.platform
        ));
        if let (Some(price), Some(currency)) = (product.price, product.currency.as_deref()) {
            output.push_str(&format!(" {:.2} {}", price, currency));
        }
        output.push('\n');
    }

    if !run.blockers.is_empty() {
        output.push_str("\nBlockers:\n");
        for blocker in &run.blockers {
            let severity = match blocker.severity {
                Severity::Blocking => "blocking",
                Severity::Degraded => "degraded",
            };
            output.push_str(&format!(
                "  - step {} {} ({}): {}\n",
                blocker.step_number, blocker.kind, severity, blocker.description
            ));
        }
    }

    if let Some(point) = &run.failure_point {
        output.push_str(&format!(
            "\nFailure point: step {} ({}) {}\n",
            point.step_number, point.step, point.blocker
        ));
    }

    let impact = &run.revenue_impact;
    output.push_str(&format!(
        "\nRevenue impact ({}): {} projected visits, {} lost conversions, {:.2} lost revenue/month\n",
        impact.category, impact.projected_visits, impact.lost_conversions, impact.lost_revenue
    ));

    if !run.recommendations.is_empty() {
        output.push_str("\nRecommendations:\n");
        for rec in &run.recommendations {
            let priority = match rec.priority {
                Priority::High => "HIGH",
                Priority::Medium => "MEDIUM",
                Priority::Low => "LOW",
            };
            output.push_str(&format!("  [{}] {}\n", priority, rec.action));
            output.push_str(&format!("      {}\n", rec.detail));
            output.push_str(&format!("      Impact: {}\n", rec.estimated_impact));
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::context::FailureReason;
    use crate::probe::revenue::{estimate_revenue_impact, RevenueBaselines};
    use crate::probe::types::{
        Blocker, BlockerKind, FailurePoint, Recommendation, RunStatus, StepAction, StepRecord,
        TestType,
    };
    use chrono::Utc;

    fn run() -> TestRun {
        TestRun {
            id: "run-1".to_string(),
            domain: "shop.test".to_string(),
            test_type: TestType::AddToCart,
            category: "retail".to_string(),
            status: RunStatus::Blocked,
            steps: vec![
                StepRecord {
                    step_number: 1,
                    action: StepAction::Discovery,
                    status: StepStatus::Failed,
                    duration_ms: 12,
                    error: Some("No product URLs found".to_string()),
                    reason: Some(FailureReason::NoProductUrls),
                    data: None,
                },
                StepRecord::skipped(StepAction::Selection),
                StepRecord::skipped(StepAction::Cart),
            ],
            blockers: vec![Blocker {
                kind: BlockerKind::NoStructuredData,
                description: "No product URLs found".to_string(),
                severity: Severity::Blocking,
                step_number: 1,
            }],
            failure_point: Some(FailurePoint {
                step: StepAction::Discovery,
                step_number: 1,
                blocker: BlockerKind::NoStructuredData,
                description: "No product URLs found".to_string(),
            }),
            success_rate: 0.0,
            revenue_impact: estimate_revenue_impact(&RevenueBaselines::default(), "retail", 0.0),
            recommendations: vec![Recommendation {
                priority: Priority::Medium,
                action: "List product URLs in the sitemap".to_string(),
                detail: "Publish a sitemap".to_string(),
                estimated_impact: "Discoverable catalog".to_string(),
            }],
            duration_ms: 15,
            tested_at: Utc::now(),
        }
    }

    #[test]
    fn test_render_table_rows() {
        let rendered = render_table(&run());
        assert!(rendered.contains("shop.test"));
        assert!(rendered.contains("BLOCKED"));
        assert!(rendered.contains("FAIL"));
        assert_eq!(rendered.matches("SKIP").count(), 2);
        assert!(rendered.contains("Failure point: step 1 (discovery) no_structured_data"));
    }

    #[test]
    fn test_render_table_revenue_and_advice() {
        let rendered = render_table(&run());
        // retail at 0%: 500 visits * 0.03 = 15 conversions * 85.0
        assert!(rendered.contains("15 lost conversions"));
        assert!(rendered.contains("1275.00 lost revenue"));
        assert!(rendered.contains("[MEDIUM] List product URLs in the sitemap"));
    }
}
