//! Feature-completeness analyzer.
//!
//! Checks each configured feature descriptor against the artifacts that
//! exist on disk, and reports components that belong to no feature.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use super::files::{self, Walk};
use super::{blocking, summarize_names, Project, FEATURES};
use crate::analyzer::Analyzer;
use crate::config::{FeatureDescriptor, Layout};
use crate::model::{AnalyzerResult, Effort, Gap, Severity};
use crate::score::round2;

/// Completion at or above which a feature counts as complete.
pub const COMPLETE_AT: f64 = 70.0;

/// Completion below which an incomplete feature is high severity.
pub const HIGH_BELOW: f64 = 50.0;

lazy_static! {
    static ref TYPE_DECL_RE: Regex =
        Regex::new(r"\b(?:interface|type)\s+([A-Za-z_$][\w$]*)").unwrap();
}

/// Artifact kinds a feature can require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ArtifactKind {
    Component,
    Service,
    Type,
    Page,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] = [
        ArtifactKind::Component,
        ArtifactKind::Service,
        ArtifactKind::Type,
        ArtifactKind::Page,
    ];

    pub fn plural(&self) -> &'static str {
        match self {
            ArtifactKind::Component => "components",
            ArtifactKind::Service => "services",
            ArtifactKind::Type => "types",
            ArtifactKind::Page => "pages",
        }
    }

    fn required<'a>(&self, feature: &'a FeatureDescriptor) -> &'a [String] {
        match self {
            ArtifactKind::Component => &feature.components,
            ArtifactKind::Service => &feature.services,
            ArtifactKind::Type => &feature.types,
            ArtifactKind::Page => &feature.pages,
        }
    }

    /// Where an artifact of this kind conventionally lives.
    pub fn conventional_path(&self, layout: &Layout, name: &str) -> String {
        match self {
            ArtifactKind::Component => format!("{}/{}.tsx", layout.components_dir, name),
            ArtifactKind::Service => format!("{}/{}.ts", layout.services_dir, name),
            ArtifactKind::Type => format!("{}/index.ts", layout.types_dir),
            ArtifactKind::Page => format!("{}/{}.tsx", layout.pages_dir, name),
        }
    }
}

/// Completion of one feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStatus {
    pub name: String,
    pub required: usize,
    pub found: usize,
    /// Missing artifact names per kind; kinds with nothing missing are absent.
    pub missing: BTreeMap<ArtifactKind, Vec<String>>,
}

impl FeatureStatus {
    pub fn completion(&self) -> f64 {
        if self.required == 0 {
            100.0
        } else {
            self.found as f64 / self.required as f64 * 100.0
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completion() >= COMPLETE_AT
    }
}

/// What exists in the project, indexed once per run.
#[derive(Debug, Default)]
pub struct ArtifactIndex {
    /// Base names of component-style files anywhere under the source root.
    component_files: HashSet<String>,
    /// Stems of all script sources under the source root.
    source_stems: HashSet<String>,
    /// Lowercased names of declared interfaces and type aliases.
    type_names: HashSet<String>,
}

impl ArtifactIndex {
    pub fn build(project: &Project) -> Self {
        let root = &project.config().layout.source_root;
        let mut index = ArtifactIndex::default();

        for path in project.walk(root, Walk::components()) {
            index.component_files.insert(files::base_name(&path));
        }
        for path in project.walk(root, Walk::sources()) {
            index.source_stems.insert(files::stem(&path));
            if let Some(source) = files::read_text(&path) {
                for caps in TYPE_DECL_RE.captures_iter(&source) {
                    index.type_names.insert(caps[1].to_lowercase());
                }
            }
        }
        index
    }

    pub fn contains(&self, kind: ArtifactKind, name: &str) -> bool {
        match kind {
            ArtifactKind::Component | ArtifactKind::Page => self.component_files.contains(name),
            ArtifactKind::Service => self.source_stems.contains(name),
            ArtifactKind::Type => self.type_names.contains(&name.to_lowercase()),
        }
    }
}

/// Evaluate one feature against the index.
pub fn evaluate(feature: &FeatureDescriptor, index: &ArtifactIndex) -> FeatureStatus {
    let mut missing = BTreeMap::new();
    let mut found = 0;
    for kind in ArtifactKind::ALL {
        let absent: Vec<String> = kind
            .required(feature)
            .iter()
            .filter(|name| !index.contains(kind, name))
            .cloned()
            .collect();
        found += kind.required(feature).len() - absent.len();
        if !absent.is_empty() {
            missing.insert(kind, absent);
        }
    }
    FeatureStatus {
        name: feature.name.clone(),
        required: feature.required_count(),
        found,
        missing,
    }
}

/// Components under the components directory that no feature references.
pub fn orphan_components(project: &Project) -> Vec<String> {
    let config = project.config();
    let referenced: HashSet<String> = config
        .features
        .iter()
        .flat_map(|f| f.components.iter().chain(f.pages.iter()))
        .map(|n| loose(n))
        .collect();
    let allowed: HashSet<String> = config.orphan_allowlist.iter().map(|n| loose(n)).collect();

    let names: BTreeSet<String> = project
        .walk(&config.layout.components_dir, Walk::components())
        .iter()
        .map(|p| files::base_name(p))
        .filter(|n| n != "index")
        .collect();

    names
        .into_iter()
        .filter(|n| {
            let key = loose(n);
            !referenced.contains(&key) && !allowed.contains(&key)
        })
        .collect()
}

/// Lowercase with dashes and underscores removed (`alert-dialog` == `AlertDialog`).
fn loose(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '-' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Checks configured features for completeness.
pub struct FeatureAnalyzer {
    project: Arc<Project>,
}

impl FeatureAnalyzer {
    pub fn new(project: Arc<Project>) -> Self {
        Self { project }
    }
}

#[async_trait]
impl Analyzer for FeatureAnalyzer {
    fn name(&self) -> &str {
        FEATURES
    }

    async fn analyze(&self) -> anyhow::Result<AnalyzerResult> {
        let project = Arc::clone(&self.project);
        blocking(move || Ok(analyze_features(&project))).await
    }
}

fn analyze_features(project: &Project) -> AnalyzerResult {
    let config = project.config();
    let index = ArtifactIndex::build(project);
    let statuses: Vec<FeatureStatus> = config
        .features
        .iter()
        .map(|f| evaluate(f, &index))
        .collect();
    let orphans = orphan_components(project);

    let mut gaps = Vec::new();
    for status in &statuses {
        gaps.extend(feature_gaps(&config.layout, status));
    }
    if !orphans.is_empty() {
        gaps.push(
            Gap::new(
                "feature-orphan-components",
                Severity::Low,
                "feature",
                format!(
                    "{} component(s) are not part of any feature: {}",
                    orphans.len(),
                    summarize_names(&orphans, 10)
                ),
                "Wire each orphaned component into a feature, add it to a feature descriptor, \
                 or delete it if it is dead code"
                    .to_string(),
            )
            .with_files(
                orphans
                    .iter()
                    .map(|n| format!("{}/{}.tsx", config.layout.components_dir, n)),
            )
            .with_effort(Effort::Low),
        );
    }

    let score = if statuses.is_empty() {
        100.0
    } else {
        round2(statuses.iter().map(FeatureStatus::completion).sum::<f64>() / statuses.len() as f64)
    };
    let completion: BTreeMap<String, f64> = statuses
        .iter()
        .map(|s| (s.name.clone(), round2(s.completion())))
        .collect();

    tracing::debug!(features = statuses.len(), orphans = orphans.len(), "feature analysis done");
    AnalyzerResult::new(FEATURES)
        .with_score(score)
        .with_meta("featureCount", statuses.len())
        .with_meta(
            "completeFeatures",
            statuses.iter().filter(|s| s.is_complete()).count(),
        )
        .with_meta("completion", completion)
        .with_meta("orphanComponents", orphans)
        .with_gaps(gaps)
}

fn feature_gaps(layout: &Layout, status: &FeatureStatus) -> Vec<Gap> {
    let mut gaps = Vec::new();
    let completion = status.completion();
    let slug = loose(&status.name);

    let bucket_severity = if status.is_complete() {
        Severity::Low
    } else {
        let severity = if completion < HIGH_BELOW {
            Severity::High
        } else {
            Severity::Medium
        };
        let summary: Vec<String> = status
            .missing
            .iter()
            .map(|(kind, names)| format!("{} {}", names.len(), kind.plural()))
            .collect();
        gaps.push(
            Gap::new(
                format!("feature-incomplete:{}", slug),
                severity,
                "feature",
                format!(
                    "Feature {} is {:.0}% complete ({}/{} artifacts); missing {}",
                    status.name,
                    completion,
                    status.found,
                    status.required,
                    summary.join(", ")
                ),
                format!(
                    "Implement the missing {} artifacts to reach at least {:.0}% completion",
                    status.name, COMPLETE_AT
                ),
            )
            .with_effort(if completion < HIGH_BELOW {
                Effort::High
            } else {
                Effort::Medium
            }),
        );
        severity
    };

    for (kind, names) in &status.missing {
        let paths: Vec<String> = names
            .iter()
            .map(|n| kind.conventional_path(layout, n))
            .collect();
        let listing: Vec<String> = names
            .iter()
            .zip(&paths)
            .map(|(n, p)| format!("{} ({})", n, p))
            .collect();
        gaps.push(
            Gap::new(
                format!("feature-missing-{}:{}", kind.plural(), slug),
                bucket_severity,
                "feature",
                format!(
                    "Feature {} is missing {}: {}",
                    status.name,
                    kind.plural(),
                    names.join(", ")
                ),
                format!("Create {}", listing.join(", ")),
            )
            .with_files(paths),
        );
    }

    gaps
}
