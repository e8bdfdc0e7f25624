//! Verification engine: runs every registered analyzer and merges the results.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures::future::join_all;
use thiserror::Error;

use crate::analyzer::Analyzer;
use crate::model::{
    AnalyzerResult, Effort, Gap, Severity, SeverityHistogram, Summary, VerificationReport,
    FAILED_KEY,
};
use crate::score::{self, WorkWeights, LOW_ANALYZER_SCORE, READINESS_THRESHOLD};

/// Number of critical gap recommendations quoted individually.
const QUOTED_CRITICAL_GAPS: usize = 3;

/// Configuration errors raised before any analysis runs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("analyzer {0:?} is already registered")]
    DuplicateAnalyzer(String),
    #[error("malformed analyzer: {0}")]
    MalformedAnalyzer(String),
    #[error("no analyzers registered")]
    NoAnalyzers,
}

/// Runs analyzers concurrently and aggregates their results.
pub struct Engine {
    project_path: PathBuf,
    analyzers: Vec<Arc<dyn Analyzer>>,
    weights: WorkWeights,
    readiness_threshold: f64,
}

impl Engine {
    /// Create an engine for a project.
    pub fn new<P: AsRef<Path>>(project_path: P) -> Self {
        Self {
            project_path: project_path.as_ref().to_path_buf(),
            analyzers: Vec::new(),
            weights: WorkWeights::default(),
            readiness_threshold: READINESS_THRESHOLD,
        }
    }

    /// Override the work-estimate weights.
    pub fn with_weights(mut self, weights: WorkWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Override the completion threshold used in the closing recommendation.
    pub fn with_readiness_threshold(mut self, threshold: f64) -> Self {
        self.readiness_threshold = threshold;
        self
    }

    /// Register an analyzer. Names must be non-blank and unique.
    pub fn register(&mut self, analyzer: Arc<dyn Analyzer>) -> Result<(), EngineError> {
        let name = analyzer.name();
        if name.trim().is_empty() {
            return Err(EngineError::MalformedAnalyzer(
                "analyzer name must not be empty".to_string(),
            ));
        }
        if self.analyzers.iter().any(|a| a.name() == name) {
            return Err(EngineError::DuplicateAnalyzer(name.to_string()));
        }
        tracing::debug!(analyzer = name, "registered analyzer");
        self.analyzers.push(analyzer);
        Ok(())
    }

    /// Names of registered analyzers, in registration order.
    pub fn analyzer_names(&self) -> Vec<&str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    /// Run every analyzer and build the report.
    ///
    /// Analyzer failures never escape: each one becomes a failed result.
    pub async fn analyze(&self) -> Result<VerificationReport, EngineError> {
        if self.analyzers.is_empty() {
            return Err(EngineError::NoAnalyzers);
        }

        tracing::info!(
            project = %self.project_path.display(),
            analyzers = self.analyzers.len(),
            "starting verification"
        );

        let handles: Vec<_> = self
            .analyzers
            .iter()
            .map(|analyzer| {
                let analyzer = Arc::clone(analyzer);
                let start = Instant::now();
                let handle = tokio::spawn(async move { analyzer.analyze().await });
                async move {
                    let joined = handle.await;
                    (joined, start.elapsed().as_millis() as u64)
                }
            })
            .collect();

        let outcomes = join_all(handles).await;

        // Registration order, used for deterministic recommendations.
        let mut ordered: Vec<AnalyzerResult> = Vec::with_capacity(outcomes.len());
        for (analyzer, (joined, elapsed)) in self.analyzers.iter().zip(outcomes) {
            let name = analyzer.name();
            let mut result = match joined {
                Ok(Ok(mut result)) => {
                    result.analyzer_name = name.to_string();
                    tracing::debug!(
                        analyzer = name,
                        score = result.score,
                        gaps = result.gaps.len(),
                        elapsed_ms = elapsed,
                        "analyzer finished"
                    );
                    result
                }
                Ok(Err(e)) => {
                    tracing::warn!(analyzer = name, error = %e, "analyzer failed");
                    failure_result(name, &format!("{:#}", e))
                }
                Err(join_err) => {
                    tracing::warn!(analyzer = name, error = %join_err, "analyzer task aborted");
                    failure_result(name, &join_err.to_string())
                }
            };
            result.execution_time = elapsed;
            ordered.push(result);
        }

        let report = self.build_report(ordered);
        tracing::info!(
            overall_score = report.overall_score,
            total_gaps = report.summary.total_gaps,
            "verification finished"
        );
        Ok(report)
    }

    fn build_report(&self, ordered: Vec<AnalyzerResult>) -> VerificationReport {
        let scores: Vec<f64> = ordered
            .iter()
            .filter(|r| !r.is_failed())
            .map(|r| r.score)
            .collect();
        let overall_score = score::mean(&scores);

        let mut histogram = SeverityHistogram::default();
        for gap in ordered.iter().flat_map(|r| r.gaps.iter()) {
            histogram.record(gap.severity);
        }

        let summary = Summary {
            total_gaps: histogram.total(),
            gaps_by_severity: histogram,
            total_analyzers: ordered.len(),
            failed_analyzers: ordered.iter().filter(|r| r.is_failed()).count(),
            estimated_work: score::estimate_work(&histogram, &self.weights),
        };

        let recommendations =
            build_recommendations(&ordered, &histogram, overall_score, self.readiness_threshold);

        let analyzer_results: BTreeMap<String, AnalyzerResult> = ordered
            .into_iter()
            .map(|r| (r.analyzer_name.clone(), r))
            .collect();

        VerificationReport {
            timestamp: Utc::now(),
            project_path: self.project_path.to_string_lossy().to_string(),
            overall_score,
            analyzer_results,
            summary,
            recommendations,
        }
    }
}

/// Result standing in for an analyzer that returned an error or panicked.
pub fn failure_result(name: &str, message: &str) -> AnalyzerResult {
    let gap = Gap::new(
        format!("{}-failure", name),
        Severity::Critical,
        "analyzer",
        format!("Analyzer '{}' failed: {}", name, message),
        format!(
            "Investigate why the {} analyzer failed ({}) and rerun the verification",
            name, message
        ),
    )
    .with_effort(Effort::Medium);

    AnalyzerResult::new(name)
        .with_score(0.0)
        .with_gaps(vec![gap])
        .with_meta(FAILED_KEY, true)
        .with_meta("error", message)
}

fn build_recommendations(
    ordered: &[AnalyzerResult],
    histogram: &SeverityHistogram,
    overall_score: f64,
    threshold: f64,
) -> Vec<String> {
    let mut recommendations = Vec::new();

    if histogram.critical > 0 {
        recommendations.push(format!(
            "Address {} critical issue(s) immediately",
            histogram.critical
        ));
        recommendations.extend(
            ordered
                .iter()
                .flat_map(|r| r.gaps.iter())
                .filter(|g| g.severity == Severity::Critical)
                .take(QUOTED_CRITICAL_GAPS)
                .map(|g| format!("  - {}", g.recommendation)),
        );
    }

    if histogram.high > 0 {
        recommendations.push(format!(
            "Resolve {} high-priority issue(s) before release",
            histogram.high
        ));
    }

    for result in ordered.iter().filter(|r| !r.is_failed()) {
        if result.score < LOW_ANALYZER_SCORE {
            recommendations.push(format!(
                "Improve {} (score: {:.0}/100)",
                result.analyzer_name, result.score
            ));
        }
    }

    if overall_score >= threshold {
        recommendations.push(format!(
            "Overall completion is {:.1}%, above the {:.0}% readiness threshold; polish the remaining gaps",
            overall_score, threshold
        ));
    } else {
        recommendations.push(format!(
            "Overall completion is {:.1}%, below the {:.0}% readiness threshold; focus on critical and high severity gaps first",
            overall_score, threshold
        ));
    }

    recommendations
}
