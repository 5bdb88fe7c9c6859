//! Revenue estimator
//!
//! Converts a run's success rate and a category baseline into estimated
//! monthly lost conversions and revenue. Deterministic by contract: the same
//! `(category, success_rate)` always yields the same numbers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Monthly baseline for one merchant category
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RevenueBaseline {
    pub monthly_visits: u64,
    pub average_order_value: f64,
    pub conversion_rate: f64,
}

impl RevenueBaseline {
    pub const fn new(monthly_visits: u64, average_order_value: f64, conversion_rate: f64) -> Self {
        Self {
            monthly_visits,
            average_order_value,
            conversion_rate,
        }
    }
}

/// Category → baseline table with a generic fallback
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevenueBaselines {
    /// Used for unknown or missing categories
    pub default: RevenueBaseline,
    pub categories: BTreeMap<String, RevenueBaseline>,
}

impl Default for RevenueBaselines {
    fn default() -> Self {
        let categories = [
            ("retail", RevenueBaseline::new(500, 85.0, 0.03)),
            ("fashion", RevenueBaseline::new(800, 95.0, 0.025)),
            ("electronics", RevenueBaseline::new(400, 240.0, 0.015)),
            ("home", RevenueBaseline::new(350, 150.0, 0.02)),
            ("beauty", RevenueBaseline::new(600, 55.0, 0.035)),
            ("grocery", RevenueBaseline::new(900, 60.0, 0.05)),
        ]
        .into_iter()
        .map(|(name, baseline)| (name.to_string(), baseline))
        .collect();

        Self {
            default: RevenueBaseline::new(400, 75.0, 0.025),
            categories,
        }
    }
}

impl RevenueBaselines {
    /// Baseline for `category`, falling back to the default entry
    pub fn lookup(&self, category: &str) -> RevenueBaseline {
        self.resolve(category).1
    }

    /// Lowercase and trim category keys so lookups match regardless of case
    pub fn normalize_keys(&mut self) {
        self.categories = std::mem::take(&mut self.categories)
            .into_iter()
            .map(|(name, baseline)| (name.trim().to_ascii_lowercase(), baseline))
            .collect();
    }

    /// Resolved category name and its baseline
    fn resolve(&self, category: &str) -> (String, RevenueBaseline) {
        let key = category.trim().to_ascii_lowercase();
        match self.categories.get(&key) {
            Some(baseline) => (key, *baseline),
            None => ("default".to_string(), self.default),
        }
    }
}

/// Estimated monthly revenue lost to agent-blocking checkout flows
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueImpact {
    /// Category whose baseline was used ("default" when unknown)
    pub category: String,
    pub success_rate: f64,
    pub projected_visits: u64,
    pub lost_conversions: u64,
    pub lost_revenue: f64,
}

/// Estimate lost conversions and revenue for a run
///
/// `projected = visits * (1 + rate/100)`,
/// `lost_conversions = round(projected * (1 - rate/100) * conversion_rate)`,
/// `lost_revenue = round(lost_conversions * aov, 2)`.
pub fn estimate_revenue_impact(
    baselines: &RevenueBaselines,
    category: &str,
    success_rate: f64,
) -> RevenueImpact {
    let (category, baseline) = baselines.resolve(category);
    let rate = success_rate.clamp(0.0, 100.0) / 100.0;

    let projected_visits = (baseline.monthly_visits as f64 * (1.0 + rate)).round();
    let lost_conversions = (projected_visits * (1.0 - rate) * baseline.conversion_rate).round();
    let lost_revenue = round2(lost_conversions * baseline.average_order_value);

    RevenueImpact {
        category,
        success_rate,
        projected_visits: projected_visits as u64,
        lost_conversions: lost_conversions as u64,
        lost_revenue,
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
