//! Scoring helpers shared by the engine, the analyzers and the renderer.
//!
//! Completion scores run from 0 to 100, higher = more complete.

use serde::{Deserialize, Serialize};

use crate::model::{Severity, SeverityHistogram};

/// Weights used to turn a severity histogram into a work estimate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkWeights {
    pub critical: f64,
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl Default for WorkWeights {
    fn default() -> Self {
        Self {
            critical: 4.0,
            high: 2.0,
            medium: 1.0,
            low: 0.5,
        }
    }
}

impl WorkWeights {
    pub fn weight(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    /// Weighted sum over a histogram.
    pub fn total(&self, histogram: &SeverityHistogram) -> f64 {
        Severity::ALL
            .iter()
            .map(|s| histogram.get(*s) as f64 * self.weight(*s))
            .sum()
    }
}

/// Work estimate thresholds, checked in order (weighted total strictly below).
pub mod work {
    pub const NONE: &str = "No work remaining";
    pub const TIERS: &[(f64, &str)] = &[
        (5.0, "1-2 days"),
        (15.0, "3-5 days"),
        (30.0, "1-2 weeks"),
        (60.0, "2-4 weeks"),
    ];
    pub const BEYOND: &str = "1+ months";
}

/// Overall completion needed to call a project ready.
pub const READINESS_THRESHOLD: f64 = 80.0;

/// Analyzers scoring below this get their own recommendation line.
pub const LOW_ANALYZER_SCORE: f64 = 50.0;

/// Status label thresholds (score strictly below).
pub mod status {
    pub const CRITICAL_MAX: f64 = 50.0;
    pub const NEEDS_WORK_MAX: f64 = 70.0;
    pub const NEARLY_COMPLETE_MAX: f64 = 80.0;
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Arithmetic mean rounded to two decimals, 0 for an empty input.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    round2(values.iter().sum::<f64>() / values.len() as f64)
}

/// Human-readable remaining-work estimate for a histogram.
pub fn estimate_work(histogram: &SeverityHistogram, weights: &WorkWeights) -> String {
    let total = weights.total(histogram);
    if total <= 0.0 {
        return work::NONE.to_string();
    }
    for (limit, label) in work::TIERS {
        if total < *limit {
            return label.to_string();
        }
    }
    work::BEYOND.to_string()
}

/// Status label for an overall score.
pub fn status_label(score: f64) -> &'static str {
    match score {
        s if s < status::CRITICAL_MAX => "Critical",
        s if s < status::NEEDS_WORK_MAX => "Needs Work",
        s if s < status::NEARLY_COMPLETE_MAX => "Nearly Complete",
        _ => "Production Ready",
    }
}

/// Subtract a capped penalty from a running score.
pub fn capped(penalty: f64, cap: f64) -> f64 {
    penalty.min(cap).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hist(critical: usize, high: usize, medium: usize, low: usize) -> SeverityHistogram {
        SeverityHistogram {
            critical,
            high,
            medium,
            low,
        }
    }

    #[test]
    fn test_work_estimate_boundaries() {
        let w = WorkWeights::default();
        assert_eq!(estimate_work(&hist(0, 0, 0, 0), &w), "No work remaining");
        assert_eq!(estimate_work(&hist(1, 0, 0, 0), &w), "1-2 days");
        assert_eq!(estimate_work(&hist(0, 0, 0, 1), &w), "1-2 days");
        // exactly 5 moves to the next tier
        assert_eq!(estimate_work(&hist(0, 2, 1, 0), &w), "3-5 days");
        assert_eq!(estimate_work(&hist(3, 1, 0, 0), &w), "3-5 days");
        assert_eq!(estimate_work(&hist(0, 0, 15, 0), &w), "1-2 weeks");
        assert_eq!(estimate_work(&hist(7, 1, 0, 0), &w), "2-4 weeks");
        assert_eq!(estimate_work(&hist(15, 0, 0, 0), &w), "1+ months");
    }

    #[test]
    fn test_work_estimate_monotonic() {
        let w = WorkWeights::default();
        let order = [
            "No work remaining",
            "1-2 days",
            "3-5 days",
            "1-2 weeks",
            "2-4 weeks",
            "1+ months",
        ];
        let mut last = 0;
        for medium in 0..80 {
            let label = estimate_work(&hist(0, 0, medium, 0), &w);
            let idx = order.iter().position(|l| *l == label).unwrap();
            assert!(idx >= last);
            last = idx;
        }
    }

    #[test]
    fn test_mean_and_rounding() {
        assert_eq!(mean(&[80.0, 90.0]), 85.0);
        assert_eq!(mean(&[]), 0.0);
        assert_eq!(mean(&[100.0, 0.0, 0.0]), 33.33);
        assert_eq!(round2(66.666), 66.67);
    }

    #[test]
    fn test_status_labels() {
        assert_eq!(status_label(10.0), "Critical");
        assert_eq!(status_label(50.0), "Needs Work");
        assert_eq!(status_label(79.99), "Nearly Complete");
        assert_eq!(status_label(80.0), "Production Ready");
    }
}
