//! The built-in analyzers.
//!
//! Each analyzer walks the project on its own and returns an
//! `AnalyzerResult`. They share nothing but the read-only `Project`.

pub mod accessibility;
pub mod files;
pub mod imports;
pub mod typecheck;

mod components;
mod dependencies;
mod features;
mod quality;
mod structure;

pub use components::{ComponentAnalyzer, ComponentReport};
pub use dependencies::{DependencyAnalyzer, DependencyReport};
pub use features::{FeatureAnalyzer, FeatureStatus};
pub use quality::QualityAnalyzer;
pub use structure::StructureAnalyzer;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analyzer::Analyzer;
use crate::config::Config;
use files::Walk;

pub const COMPONENTS: &str = "components";
pub const STRUCTURE: &str = "structure";
pub const FEATURES: &str = "features";
pub const QUALITY: &str = "quality";
pub const DEPENDENCIES: &str = "dependencies";

/// Names of all built-in analyzers, in default registration order.
pub const ANALYZER_NAMES: &[&str] = &[COMPONENTS, STRUCTURE, FEATURES, QUALITY, DEPENDENCIES];

/// A project tree plus the configuration describing it.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
    config: Config,
}

impl Project {
    pub fn new<P: AsRef<Path>>(root: P, config: Config) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Absolute path for a project-relative path.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Project-relative path with forward slashes.
    pub fn rel(&self, path: &Path) -> String {
        files::relative(path, &self.root)
    }

    /// Walk a project-relative directory, honouring `excluded_paths`.
    pub fn walk(&self, rel_dir: &str, walk: Walk) -> Vec<PathBuf> {
        walk.collect(&self.path(rel_dir))
            .into_iter()
            .filter(|p| !self.config.is_path_excluded(&self.rel(p)))
            .collect()
    }
}

/// Build the analyzers enabled in the project's configuration.
pub fn build(project: Arc<Project>) -> Vec<Arc<dyn Analyzer>> {
    let mut analyzers: Vec<Arc<dyn Analyzer>> = Vec::new();
    for name in ANALYZER_NAMES {
        if !project.config().is_enabled(name) {
            continue;
        }
        let project = Arc::clone(&project);
        let analyzer: Arc<dyn Analyzer> = match *name {
            COMPONENTS => Arc::new(ComponentAnalyzer::new(project)),
            STRUCTURE => Arc::new(StructureAnalyzer::new(project)),
            FEATURES => Arc::new(FeatureAnalyzer::new(project)),
            QUALITY => Arc::new(QualityAnalyzer::new(project)),
            DEPENDENCIES => Arc::new(DependencyAnalyzer::new(project)),
            _ => continue,
        };
        analyzers.push(analyzer);
    }
    analyzers
}

/// Run blocking analysis work off the async executor.
pub(crate) async fn blocking<T, F>(f: F) -> anyhow::Result<T>
where
    F: FnOnce() -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| anyhow::anyhow!("analysis task failed: {}", e))?
}

/// Shorten a list of names for a message (`a, b, c and 4 more`).
pub(crate) fn summarize_names(names: &[String], limit: usize) -> String {
    if names.len() <= limit {
        return names.join(", ");
    }
    format!(
        "{} and {} more",
        names[..limit].join(", "),
        names.len() - limit
    )
}
