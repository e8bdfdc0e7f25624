//! gapcheck - implementation gap analysis for React/TypeScript projects.
//!
//! gapcheck estimates how complete a product implementation is. Independent
//! analyzers inspect the project tree and each return a 0-100 score plus a
//! list of gaps; the engine runs them concurrently, isolates failures, and
//! merges everything into one severity-ranked `VerificationReport`.
//!
//! # Architecture
//!
//! - `model`: gaps, analyzer results and the aggregate report
//! - `analyzer`: the `Analyzer` trait, the only extension point
//! - `engine`: registry, concurrent execution and aggregation
//! - `analyzers`: the built-in analyzers and their shared helpers
//! - `parser`: tree-sitter TypeScript/TSX fact extraction
//! - `config`: YAML configuration schema
//! - `score`: scoring constants and helpers
//! - `report`: output formatting (pretty, JSON, Markdown)
//!
//! # Adding an Analyzer
//!
//! Implement `Analyzer` and register it with `Engine::register`. Returning
//! an error from `analyze` is safe: the engine turns it into a failed result
//! with a critical gap instead of aborting the run.

pub mod analyzer;
pub mod analyzers;
pub mod cli;
pub mod config;
pub mod engine;
pub mod model;
pub mod parser;
pub mod report;
pub mod score;

pub use analyzer::Analyzer;
pub use analyzers::{
    ComponentAnalyzer, DependencyAnalyzer, FeatureAnalyzer, Project, QualityAnalyzer,
    StructureAnalyzer, ANALYZER_NAMES,
};
pub use config::{Config, FeatureDescriptor};
pub use engine::{Engine, EngineError};
pub use model::{
    AnalyzerResult, Effort, Gap, MetadataValue, Severity, SeverityHistogram, Summary,
    VerificationReport,
};
