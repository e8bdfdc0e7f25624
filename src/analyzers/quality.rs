//! Quality analyzer.
//!
//! Six independent checks feed one 100-point deduction model. Each check
//! has a per-unit penalty and a cap, and emits its own gap when it deducts
//! anything.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::files::{self, Walk};
use super::typecheck::{self, TypecheckOutcome};
use super::{accessibility, blocking, summarize_names, Project, QUALITY};
use crate::analyzer::Analyzer;
use crate::model::{AnalyzerResult, Effort, Gap, Severity};
use crate::score::{capped, round2};

/// Per-unit penalties and caps of each check.
pub mod penalty {
    pub const TYPE_ERROR: f64 = 0.5;
    pub const TYPE_ERROR_CAP: f64 = 40.0;
    pub const NAMING: f64 = 0.5;
    pub const NAMING_CAP: f64 = 10.0;
    pub const ERROR_HANDLING: f64 = 5.0;
    pub const ERROR_HANDLING_CAP: f64 = 25.0;
    pub const LOADING_STATE: f64 = 3.0;
    pub const LOADING_STATE_CAP: f64 = 15.0;
    pub const ACCESSIBILITY: f64 = 2.0;
    pub const ACCESSIBILITY_CAP: f64 = 10.0;
    /// Points per percent of missing test coverage.
    pub const COVERAGE: f64 = 0.1;
}

/// Diagnostic counts above which the type-check gap is critical / high.
pub const TYPE_ERRORS_CRITICAL_ABOVE: usize = 50;
pub const TYPE_ERRORS_HIGH_ABOVE: usize = 10;

/// Coverage percentages below which the coverage gap is high / medium.
pub const COVERAGE_HIGH_BELOW: f64 = 20.0;
pub const COVERAGE_MEDIUM_BELOW: f64 = 50.0;

lazy_static! {
    static ref PASCAL_RE: Regex = Regex::new(r"^[A-Z][A-Za-z0-9]*$").unwrap();
    static ref CAMEL_RE: Regex = Regex::new(r"^[a-z][A-Za-z0-9]*$").unwrap();
    static ref KEBAB_RE: Regex = Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]+)*$").unwrap();

    static ref TRY_CATCH_RE: Regex = Regex::new(r"\btry\s*\{").unwrap();
    static ref BOUNDARY_RE: Regex = Regex::new(r"\bErrorBoundary\b").unwrap();
    static ref CATCH_PARAM_RE: Regex =
        Regex::new(r"(?:\.catch\s*\(|\bcatch\s*\(\s*\w*(?:err|error|e)\w*\s*[:)])").unwrap();

    // `const [loading, ...] =`, `const { isLoading } =` or `const isLoading =`
    static ref LOADING_DECL_RE: Regex = Regex::new(
        r"\b(?:const|let|var)\s*(?:[\[{][^=;]*\b\w*[Ll]oading\w*|\w*[Ll]oading\w*\s*[=:])"
    )
    .unwrap();
    static ref LOADING_COND_RE: Regex = Regex::new(
        r"\b\w*[Ll]oading\w*\s*(?:\?|&&|\|\|)|\bif\s*\(\s*!?\s*\w*[Ll]oading\w*"
    )
    .unwrap();
    static ref SUSPENSE_RE: Regex = Regex::new(r"<(?:React\.)?Suspense\b").unwrap();
}

/// Whether source contains an error-handling idiom.
pub fn has_error_handling(source: &str) -> bool {
    TRY_CATCH_RE.is_match(source) || BOUNDARY_RE.is_match(source) || CATCH_PARAM_RE.is_match(source)
}

/// Whether source renders a loading state.
pub fn has_loading_state(source: &str) -> bool {
    SUSPENSE_RE.is_match(source)
        || (LOADING_DECL_RE.is_match(source) && LOADING_COND_RE.is_match(source))
}

/// Results of the file-system checks (everything but type diagnostics).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StaticChecks {
    /// Files violating their directory's naming convention.
    pub naming_violations: Vec<String>,
    pub pages_without_error_handling: Vec<String>,
    pub pages_without_loading_state: Vec<String>,
    pub components_with_a11y_issues: Vec<String>,
    pub component_count: usize,
    /// Components without a test file of the same base name.
    pub untested_components: Vec<String>,
}

impl StaticChecks {
    /// Test coverage percentage; 100 when there are no components.
    pub fn test_coverage(&self) -> f64 {
        if self.component_count == 0 {
            return 100.0;
        }
        let tested = self.component_count - self.untested_components.len();
        round2(tested as f64 / self.component_count as f64 * 100.0)
    }
}

/// Run every check that only reads files.
pub fn static_checks(project: &Project) -> StaticChecks {
    let layout = &project.config().layout;
    let components = project.walk(&layout.components_dir, Walk::components());
    let pages = project.walk(&layout.pages_dir, Walk::components());
    let ui_kit = Path::new(&layout.ui_kit_dir);
    let owned: Vec<&PathBuf> = components
        .iter()
        .filter(|p| !Path::new(&project.rel(p)).starts_with(ui_kit))
        .collect();
    let mut checks = StaticChecks {
        component_count: owned.len(),
        ..Default::default()
    };

    for path in owned.iter().copied().chain(pages.iter()) {
        let name = files::base_name(path);
        if name != "index" && !PASCAL_RE.is_match(&name) {
            checks.naming_violations.push(project.rel(path));
        }
    }
    for dir in &layout.utility_dirs {
        for path in project.walk(dir, Walk::sources()) {
            let name = files::base_name(&path);
            if name != "index" && !CAMEL_RE.is_match(&name) && !KEBAB_RE.is_match(&name) {
                checks.naming_violations.push(project.rel(&path));
            }
        }
    }

    for path in &pages {
        let Some(source) = files::read_text(path) else {
            continue;
        };
        if !has_error_handling(&source) {
            checks.pages_without_error_handling.push(project.rel(path));
        }
        if !has_loading_state(&source) {
            checks.pages_without_loading_state.push(project.rel(path));
        }
    }

    for path in &components {
        let Some(source) = files::read_text(path) else {
            continue;
        };
        if accessibility::scan(&source).issue_count() > 0 {
            checks.components_with_a11y_issues.push(project.rel(path));
        }
    }

    let tested: HashSet<String> = test_files(project)
        .iter()
        .map(|p| files::base_name(p))
        .collect();
    checks.untested_components = owned
        .iter()
        .filter(|p| !tested.contains(&files::base_name(p)))
        .map(|p| project.rel(p))
        .collect();

    checks
}

fn test_files(project: &Project) -> Vec<PathBuf> {
    project
        .walk("", Walk::tests())
        .into_iter()
        .filter(|p| files::is_test_file(p) || files::in_test_dir(Path::new(&project.rel(p))))
        .collect()
}

/// Per-check deductions.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Deductions {
    pub type_errors: f64,
    pub naming: f64,
    pub error_handling: f64,
    pub loading_state: f64,
    pub accessibility: f64,
    pub test_coverage: f64,
}

impl Deductions {
    pub fn compute(type_errors: usize, checks: &StaticChecks) -> Self {
        Self {
            type_errors: capped(type_errors as f64 * penalty::TYPE_ERROR, penalty::TYPE_ERROR_CAP),
            naming: capped(
                checks.naming_violations.len() as f64 * penalty::NAMING,
                penalty::NAMING_CAP,
            ),
            error_handling: capped(
                checks.pages_without_error_handling.len() as f64 * penalty::ERROR_HANDLING,
                penalty::ERROR_HANDLING_CAP,
            ),
            loading_state: capped(
                checks.pages_without_loading_state.len() as f64 * penalty::LOADING_STATE,
                penalty::LOADING_STATE_CAP,
            ),
            accessibility: capped(
                checks.components_with_a11y_issues.len() as f64 * penalty::ACCESSIBILITY,
                penalty::ACCESSIBILITY_CAP,
            ),
            test_coverage: round2((100.0 - checks.test_coverage()) * penalty::COVERAGE),
        }
    }

    pub fn total(&self) -> f64 {
        self.type_errors
            + self.naming
            + self.error_handling
            + self.loading_state
            + self.accessibility
            + self.test_coverage
    }

    fn as_map(&self) -> BTreeMap<String, f64> {
        [
            ("typeErrors", self.type_errors),
            ("naming", self.naming),
            ("errorHandling", self.error_handling),
            ("loadingState", self.loading_state),
            ("accessibility", self.accessibility),
            ("testCoverage", self.test_coverage),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
    }
}

/// Code-quality checks.
pub struct QualityAnalyzer {
    project: Arc<Project>,
}

impl QualityAnalyzer {
    pub fn new(project: Arc<Project>) -> Self {
        Self { project }
    }

    async fn run_typecheck(&self) -> TypecheckOutcome {
        let settings = &self.project.config().typecheck;
        if !settings.enabled {
            return TypecheckOutcome {
                skipped: true,
                reason: Some("disabled".to_string()),
                diagnostics: Vec::new(),
            };
        }
        typecheck::run(self.project.root(), &settings.command).await
    }
}

#[async_trait]
impl Analyzer for QualityAnalyzer {
    fn name(&self) -> &str {
        QUALITY
    }

    async fn analyze(&self) -> anyhow::Result<AnalyzerResult> {
        let project = Arc::clone(&self.project);
        let (outcome, checks) = tokio::join!(
            self.run_typecheck(),
            blocking(move || Ok(static_checks(&project)))
        );
        Ok(build_result(&outcome, &checks?))
    }
}

/// Turn check outcomes into a scored result.
pub fn build_result(outcome: &TypecheckOutcome, checks: &StaticChecks) -> AnalyzerResult {
    let type_errors = outcome.problem_count();
    let deductions = Deductions::compute(type_errors, checks);
    let coverage = checks.test_coverage();
    let mut gaps = Vec::new();

    if type_errors > 0 {
        let severity = if type_errors > TYPE_ERRORS_CRITICAL_ABOVE {
            Severity::Critical
        } else if type_errors > TYPE_ERRORS_HIGH_ABOVE {
            Severity::High
        } else {
            Severity::Medium
        };
        let mut affected: Vec<String> = outcome
            .diagnostics
            .iter()
            .filter(|d| !d.is_informational() && !d.file.contains("node_modules"))
            .map(|d| d.file.clone())
            .collect();
        affected.sort();
        affected.dedup();
        gaps.push(
            Gap::new(
                "quality-type-errors",
                severity,
                "quality",
                format!("Type checker reports {} error(s)", type_errors),
                "Fix the reported type errors; run the type checker locally until it is clean"
                    .to_string(),
            )
            .with_files(affected)
            .with_effort(if type_errors > TYPE_ERRORS_HIGH_ABOVE {
                Effort::High
            } else {
                Effort::Medium
            }),
        );
    }

    if !checks.naming_violations.is_empty() {
        gaps.push(
            Gap::new(
                "quality-naming",
                Severity::Low,
                "quality",
                format!(
                    "{} file(s) break the naming convention of their directory",
                    checks.naming_violations.len()
                ),
                "Use PascalCase for component and page files, camelCase or kebab-case for \
                 utility and hook files"
                    .to_string(),
            )
            .with_files(checks.naming_violations.clone())
            .with_effort(Effort::Low),
        );
    }

    if !checks.pages_without_error_handling.is_empty() {
        gaps.push(
            Gap::new(
                "quality-error-handling",
                Severity::Medium,
                "quality",
                format!(
                    "{} page(s) have no error handling",
                    checks.pages_without_error_handling.len()
                ),
                "Wrap data loading in try/catch or handle promise rejections, and render pages \
                 inside an ErrorBoundary"
                    .to_string(),
            )
            .with_files(checks.pages_without_error_handling.clone())
            .with_effort(Effort::Medium),
        );
    }

    if !checks.pages_without_loading_state.is_empty() {
        gaps.push(
            Gap::new(
                "quality-loading-state",
                Severity::Low,
                "quality",
                format!(
                    "{} page(s) render no loading state",
                    checks.pages_without_loading_state.len()
                ),
                "Track an isLoading flag and render a spinner or skeleton while data loads, or \
                 use <Suspense fallback={...}>"
                    .to_string(),
            )
            .with_files(checks.pages_without_loading_state.clone())
            .with_effort(Effort::Low),
        );
    }

    if !checks.components_with_a11y_issues.is_empty() {
        gaps.push(
            Gap::new(
                "quality-accessibility",
                Severity::Medium,
                "quality",
                format!(
                    "{} component(s) contain accessibility anti-patterns",
                    checks.components_with_a11y_issues.len()
                ),
                "Label interactive elements, add alt text to images, and give clickable \
                 non-interactive elements a role and keyboard handler"
                    .to_string(),
            )
            .with_files(checks.components_with_a11y_issues.clone())
            .with_effort(Effort::Medium),
        );
    }

    if deductions.test_coverage > 0.0 {
        let severity = if coverage < COVERAGE_HIGH_BELOW {
            Severity::High
        } else if coverage < COVERAGE_MEDIUM_BELOW {
            Severity::Medium
        } else {
            Severity::Low
        };
        let names: Vec<String> = checks
            .untested_components
            .iter()
            .map(|f| files::base_name(Path::new(f)))
            .collect();
        gaps.push(
            Gap::new(
                "quality-test-coverage",
                severity,
                "quality",
                format!(
                    "Component test coverage is {:.0}% ({} of {} components untested)",
                    coverage,
                    checks.untested_components.len(),
                    checks.component_count
                ),
                format!(
                    "Add a <Name>.test.tsx for each untested component: {}",
                    summarize_names(&names, 8)
                ),
            )
            .with_files(checks.untested_components.clone())
            .with_effort(if coverage < COVERAGE_MEDIUM_BELOW {
                Effort::High
            } else {
                Effort::Medium
            }),
        );
    }

    let mut result = AnalyzerResult::new(QUALITY)
        .with_score(100.0 - deductions.total())
        .with_meta("typecheckSkipped", outcome.skipped)
        .with_meta("typeErrors", type_errors)
        .with_meta("namingViolations", checks.naming_violations.len())
        .with_meta(
            "pagesWithoutErrorHandling",
            checks.pages_without_error_handling.len(),
        )
        .with_meta(
            "pagesWithoutLoadingState",
            checks.pages_without_loading_state.len(),
        )
        .with_meta(
            "componentsWithAccessibilityIssues",
            checks.components_with_a11y_issues.len(),
        )
        .with_meta("testCoverage", coverage)
        .with_meta("deductions", deductions.as_map())
        .with_gaps(gaps);
    if let Some(reason) = &outcome.reason {
        result = result.with_meta("typecheckSkipReason", reason.as_str());
    }
    result
}
