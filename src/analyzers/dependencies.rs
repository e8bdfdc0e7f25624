//! Dependency analyzer: manifest versus actual imports.

use anyhow::Context;
use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use lazy_static::lazy_static;
use regex::RegexSet;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::files::{self, Walk, FIXTURE_DIRS, SOURCE_EXTENSIONS, VENDOR_DIRS};
use super::{blocking, imports, summarize_names, Project, DEPENDENCIES};
use crate::analyzer::Analyzer;
use crate::model::{AnalyzerResult, Effort, Gap, Severity};

/// Score deductions.
pub mod penalty {
    pub const CRITICAL_MISSING: f64 = 30.0;
    pub const MISSING: f64 = 10.0;
    pub const UNUSED: f64 = 2.0;
}

/// Packages whose absence breaks the application outright.
pub const CRITICAL_PACKAGES: &[&str] = &[
    "react",
    "react-dom",
    "react-router-dom",
    "@tanstack/react-query",
    "zod",
];

/// Build and type-only tooling that is used without being imported.
pub const IMPLICITLY_USED: &[&str] = &[
    "typescript",
    "vite",
    "vitest",
    "jest",
    "jsdom",
    "happy-dom",
    "eslint",
    "prettier",
    "tailwindcss",
    "postcss",
    "autoprefixer",
    "globals",
    "typescript-eslint",
    "husky",
    "lint-staged",
    "lovable-tagger",
];

/// Plugin ecosystems whose packages are loaded by their host tool.
pub const PLUGIN_PATTERNS: &[&str] = &[
    r"^@types/",
    r"^eslint-(plugin|config)-",
    r"^@typescript-eslint/",
    r"^@eslint/",
    r"^prettier-plugin-",
    r"^@tailwindcss/",
    r"^tailwindcss-",
    r"^postcss-",
    r"^@vitejs/",
    r"^vite-plugin-",
    r"^@?babel[-/]",
    r"^@testing-library/",
];

/// Runtime dependencies of generated UI-kit components, never suggested for removal.
pub const PROTECTED: &[&str] = &[
    "class-variance-authority",
    "clsx",
    "tailwind-merge",
    "lucide-react",
    "cmdk",
    "vaul",
    "sonner",
    "input-otp",
    "next-themes",
    "date-fns",
    "react-day-picker",
    "embla-carousel-react",
    "react-resizable-panels",
    "recharts",
];

/// Scoped prefixes protected as a whole.
pub const PROTECTED_PREFIXES: &[&str] = &["@radix-ui/"];

/// Root-level configuration files scanned for imports.
pub const ROOT_CONFIG_FILES: &[&str] = &[
    "vite.config.*",
    "tailwind.config.*",
    "postcss.config.*",
    "eslint.config.*",
    ".eslintrc.cjs",
    "vitest.config.*",
    "jest.config.*",
];

/// Number of removable packages named in the removal gap.
const NAMED_REMOVABLE: usize = 5;

lazy_static! {
    static ref PLUGIN_SET: RegexSet = RegexSet::new(PLUGIN_PATTERNS).unwrap();
}

/// Declared dependency sections of a `package.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub dev_dependencies: BTreeMap<String, serde_json::Value>,
}

impl Manifest {
    /// Load a manifest. A missing file is an empty manifest; invalid JSON is an error.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.is_file() {
            tracing::debug!(path = %path.display(), "no manifest, treating as empty");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading manifest {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("manifest {} is not valid JSON", path.display()))
    }

    pub fn declared(&self) -> BTreeSet<String> {
        self.dependencies
            .keys()
            .chain(self.dev_dependencies.keys())
            .cloned()
            .collect()
    }
}

/// Declared versus imported packages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyReport {
    pub declared: BTreeSet<String>,
    pub imported: BTreeSet<String>,
    /// Imported but not declared (built-ins excluded).
    pub missing: BTreeSet<String>,
    /// Subset of `missing` on the critical list.
    pub critical_missing: BTreeSet<String>,
    /// Declared but never imported, tooling and plugins excluded.
    pub unused: BTreeSet<String>,
    /// Subset of `unused` not on the protect list.
    pub removable: BTreeSet<String>,
}

impl DependencyReport {
    pub fn compute(
        declared: BTreeSet<String>,
        imported: BTreeSet<String>,
        project_name: Option<&str>,
    ) -> Self {
        let missing: BTreeSet<String> = imported
            .iter()
            .filter(|p| !declared.contains(*p))
            .filter(|p| !imports::is_builtin(p))
            .filter(|p| Some(p.as_str()) != project_name)
            .cloned()
            .collect();
        let critical_missing = missing
            .iter()
            .filter(|p| CRITICAL_PACKAGES.contains(&p.as_str()))
            .cloned()
            .collect();
        let unused: BTreeSet<String> = declared
            .iter()
            .filter(|p| !imported.contains(*p))
            .filter(|p| !is_implicitly_used(p))
            .cloned()
            .collect();
        let removable = unused.iter().filter(|p| !is_protected(p)).cloned().collect();

        Self {
            declared,
            imported,
            missing,
            critical_missing,
            unused,
            removable,
        }
    }

    pub fn other_missing(&self) -> impl Iterator<Item = &String> {
        self.missing
            .iter()
            .filter(|p| !self.critical_missing.contains(*p))
    }

    pub fn score(&self) -> f64 {
        let other = self.missing.len() - self.critical_missing.len();
        let score = 100.0
            - self.critical_missing.len() as f64 * penalty::CRITICAL_MISSING
            - other as f64 * penalty::MISSING
            - self.unused.len() as f64 * penalty::UNUSED;
        score.clamp(0.0, 100.0)
    }

    pub fn gaps(&self, manifest: &str) -> Vec<Gap> {
        let mut gaps = Vec::new();

        for package in &self.critical_missing {
            gaps.push(
                Gap::new(
                    format!("dependency-missing:{}", package),
                    Severity::Critical,
                    "dependency",
                    format!("Critical package {} is imported but not declared", package),
                    format!("Run `npm install {}` so it is recorded in {}", package, manifest),
                )
                .with_files([manifest.to_string()])
                .with_effort(Effort::Low),
            );
        }

        for package in self.other_missing() {
            gaps.push(
                Gap::new(
                    format!("dependency-missing:{}", package),
                    Severity::High,
                    "dependency",
                    format!("Package {} is imported but not declared", package),
                    format!(
                        "Run `npm install {}` or remove the imports that use it",
                        package
                    ),
                )
                .with_files([manifest.to_string()])
                .with_effort(Effort::Low),
            );
        }

        if !self.removable.is_empty() {
            let names: Vec<String> = self.removable.iter().cloned().collect();
            let listed = summarize_names(&names, NAMED_REMOVABLE);
            gaps.push(
                Gap::new(
                    "dependency-removable",
                    Severity::Low,
                    "dependency",
                    format!(
                        "{} declared package(s) are never imported: {}",
                        names.len(),
                        listed
                    ),
                    format!(
                        "Remove unused packages with `npm uninstall {}`",
                        names[..names.len().min(NAMED_REMOVABLE)].join(" ")
                    ),
                )
                .with_files([manifest.to_string()])
                .with_effort(Effort::Low),
            );
        }

        let protected_unused = self.unused.len() - self.removable.len();
        if protected_unused > 0 {
            gaps.push(
                Gap::new(
                    "dependency-unused",
                    Severity::Low,
                    "dependency",
                    format!(
                        "{} more declared package(s) are not imported directly",
                        protected_unused
                    ),
                    "Review these UI-kit runtime packages and remove the ones no generated \
                     component uses"
                        .to_string(),
                )
                .with_files([manifest.to_string()]),
            );
        }

        gaps
    }
}

fn is_implicitly_used(package: &str) -> bool {
    IMPLICITLY_USED.contains(&package) || PLUGIN_SET.is_match(package)
}

fn is_protected(package: &str) -> bool {
    PROTECTED.contains(&package) || PROTECTED_PREFIXES.iter().any(|p| package.starts_with(p))
}

/// Walk used for import scanning: test files count, fixtures and vendor code do not.
fn scan_walk() -> Walk<'static> {
    Walk {
        extensions: SOURCE_EXTENSIONS,
        skip_dirs: &[VENDOR_DIRS, FIXTURE_DIRS],
        skip_test_files: false,
    }
}

fn root_config_matcher() -> anyhow::Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in ROOT_CONFIG_FILES {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Root configuration files present in the project.
fn root_config_files(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let matcher = root_config_matcher()?;
    let Ok(entries) = std::fs::read_dir(root) else {
        return Ok(Vec::new());
    };
    let mut found: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .filter(|p| {
            p.file_name()
                .map(|n| matcher.is_match(Path::new(n)))
                .unwrap_or(false)
        })
        .collect();
    found.sort();
    Ok(found)
}

/// Every package imported by project sources and root configuration files.
pub fn imported_packages(project: &Project) -> anyhow::Result<BTreeSet<String>> {
    let mut paths = project.walk(&project.config().layout.source_root, scan_walk());
    paths.extend(root_config_files(project.root())?);

    let mut packages = BTreeSet::new();
    for path in &paths {
        if let Some(source) = files::read_text(path) {
            packages.extend(imports::extract_packages(&source));
        }
    }
    tracing::debug!(files = paths.len(), packages = packages.len(), "scanned imports");
    Ok(packages)
}

/// Cross-checks the manifest against imports.
pub struct DependencyAnalyzer {
    project: Arc<Project>,
}

impl DependencyAnalyzer {
    pub fn new(project: Arc<Project>) -> Self {
        Self { project }
    }
}

#[async_trait]
impl Analyzer for DependencyAnalyzer {
    fn name(&self) -> &str {
        DEPENDENCIES
    }

    async fn analyze(&self) -> anyhow::Result<AnalyzerResult> {
        let project = Arc::clone(&self.project);
        blocking(move || analyze_dependencies(&project)).await
    }
}

fn analyze_dependencies(project: &Project) -> anyhow::Result<AnalyzerResult> {
    let manifest_rel = &project.config().layout.manifest;
    let manifest = Manifest::load(&project.path(manifest_rel))?;
    let imported = imported_packages(project)?;
    let report = DependencyReport::compute(manifest.declared(), imported, manifest.name.as_deref());

    Ok(AnalyzerResult::new(DEPENDENCIES)
        .with_score(report.score())
        .with_meta("declared", report.declared.len())
        .with_meta("imported", report.imported.len())
        .with_meta("missing", report.missing.iter().cloned().collect::<Vec<_>>())
        .with_meta(
            "criticalMissing",
            report.critical_missing.iter().cloned().collect::<Vec<_>>(),
        )
        .with_meta("unused", report.unused.iter().cloned().collect::<Vec<_>>())
        .with_meta("removable", report.removable.len())
        .with_gaps(report.gaps(manifest_rel)))
}
