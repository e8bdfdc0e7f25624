//! The analyzer plugin interface.

use async_trait::async_trait;

use crate::model::AnalyzerResult;

/// A pluggable unit that inspects a project and returns a score plus gaps.
///
/// Implementations must treat the project tree as read-only. Calling
/// `analyze` twice on an unchanged tree yields the same result apart from
/// timing. An unrecoverable condition is reported as `Err`; the engine turns
/// it into a failed result so sibling analyzers are not affected.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Stable name used as the registry key and the report key.
    fn name(&self) -> &str;

    /// Run the analysis.
    async fn analyze(&self) -> anyhow::Result<AnalyzerResult>;
}
