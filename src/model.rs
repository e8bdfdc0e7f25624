//! Core value types shared by analyzers, the engine and the renderer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Severity levels for gaps.
///
/// Variants are declared lowest first so the derived ordering gives
/// `Critical > High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// All severities, worst first.
    pub const ALL: [Severity; 4] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Severity::Critical),
            "high" => Ok(Severity::High),
            "medium" => Ok(Severity::Medium),
            "low" => Ok(Severity::Low),
            _ => Err(format!("unknown severity: {}", s)),
        }
    }
}

/// Rough size of the work needed to close a gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Effort {
    Low,
    Medium,
    High,
}

/// One discovered problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gap {
    /// Unique within one analyzer's output.
    pub id: String,
    pub severity: Severity,
    pub category: String,
    pub description: String,
    pub recommendation: String,
    #[serde(default)]
    pub affected_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_effort: Option<Effort>,
}

impl Gap {
    pub fn new(
        id: impl Into<String>,
        severity: Severity,
        category: impl Into<String>,
        description: impl Into<String>,
        recommendation: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            category: category.into(),
            description: description.into(),
            recommendation: recommendation.into(),
            affected_files: Vec::new(),
            estimated_effort: None,
        }
    }

    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_effort(mut self, effort: Effort) -> Self {
        self.estimated_effort = Some(effort);
        self
    }
}

/// Analyzer-specific metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
    Map(BTreeMap<String, f64>),
}

impl From<bool> for MetadataValue {
    fn from(v: bool) -> Self {
        MetadataValue::Bool(v)
    }
}

impl From<usize> for MetadataValue {
    fn from(v: usize) -> Self {
        MetadataValue::Int(v as i64)
    }
}

impl From<i64> for MetadataValue {
    fn from(v: i64) -> Self {
        MetadataValue::Int(v)
    }
}

impl From<f64> for MetadataValue {
    fn from(v: f64) -> Self {
        MetadataValue::Float(v)
    }
}

impl From<String> for MetadataValue {
    fn from(v: String) -> Self {
        MetadataValue::Text(v)
    }
}

impl From<&str> for MetadataValue {
    fn from(v: &str) -> Self {
        MetadataValue::Text(v.to_string())
    }
}

impl From<Vec<String>> for MetadataValue {
    fn from(v: Vec<String>) -> Self {
        MetadataValue::List(v)
    }
}

impl From<BTreeMap<String, f64>> for MetadataValue {
    fn from(v: BTreeMap<String, f64>) -> Self {
        MetadataValue::Map(v)
    }
}

/// Metadata key marking a result synthesized from a caught failure.
pub const FAILED_KEY: &str = "failed";

/// The output of one analyzer run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzerResult {
    pub analyzer_name: String,
    pub score: f64,
    /// Milliseconds, measured by the engine.
    pub execution_time: u64,
    pub gaps: Vec<Gap>,
    #[serde(default)]
    pub metadata: BTreeMap<String, MetadataValue>,
}

impl AnalyzerResult {
    pub fn new(analyzer_name: impl Into<String>) -> Self {
        Self {
            analyzer_name: analyzer_name.into(),
            score: 0.0,
            execution_time: 0,
            gaps: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Set the score, clamped to [0, 100].
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = if score.is_nan() {
            0.0
        } else {
            score.clamp(0.0, 100.0)
        };
        self
    }

    pub fn with_gaps(mut self, gaps: Vec<Gap>) -> Self {
        self.gaps = gaps;
        self
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// True when this result stands in for a caught analyzer failure.
    pub fn is_failed(&self) -> bool {
        matches!(self.metadata.get(FAILED_KEY), Some(MetadataValue::Bool(true)))
    }

    pub fn count_by_severity(&self, severity: Severity) -> usize {
        self.gaps.iter().filter(|g| g.severity == severity).count()
    }
}

/// Gap counts per severity. Every severity is always present.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityHistogram {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl SeverityHistogram {
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
        }
    }

    pub fn get(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.critical + self.high + self.medium + self.low
    }
}

/// Derived totals for a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_gaps: usize,
    pub gaps_by_severity: SeverityHistogram,
    pub total_analyzers: usize,
    pub failed_analyzers: usize,
    pub estimated_work: String,
}

/// Aggregate output of one engine run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub timestamp: DateTime<Utc>,
    pub project_path: String,
    pub overall_score: f64,
    pub analyzer_results: BTreeMap<String, AnalyzerResult>,
    pub summary: Summary,
    pub recommendations: Vec<String>,
}

impl VerificationReport {
    /// Iterate over every gap with the name of the analyzer that produced it.
    pub fn gaps(&self) -> impl Iterator<Item = (&str, &Gap)> {
        self.analyzer_results
            .iter()
            .flat_map(|(name, r)| r.gaps.iter().map(move |g| (name.as_str(), g)))
    }
}
