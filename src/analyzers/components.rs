//! Component/declaration analyzer.
//!
//! Scores every UI component file on a 100-point completeness scale: props
//! typing, error isolation, accessibility, and the health of its local
//! component imports.

use async_trait::async_trait;
use rayon::prelude::*;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use super::accessibility;
use super::files::{self, Walk};
use super::{blocking, Project, COMPONENTS};
use crate::analyzer::Analyzer;
use crate::model::{AnalyzerResult, Effort, Gap, Severity};
use crate::parser::{self, ImportDecl, SourceFacts};
use crate::score::round2;

/// Suffix of a props type declaration (`ButtonProps`).
pub const PROPS_SUFFIX: &str = "Props";

/// Text markers of an error-isolation idiom.
pub const ERROR_ISOLATION_MARKERS: &[&str] = &[
    "componentDidCatch",
    "getDerivedStateFromError",
    "ErrorBoundary",
];

/// Import prefixes of external UI kits, icon sets and form libraries.
pub const EXTERNAL_ALLOWLIST: &[&str] = &[
    "@/components/ui/",
    "@radix-ui/",
    "lucide-react",
    "react-icons",
    "@heroicons/",
    "react-hook-form",
    "@hookform/",
];

/// Extensions tried when resolving an import without one.
pub const RESOLVE_EXTENSIONS: &[&str] = &["tsx", "ts", "jsx", "js"];

/// Hooks never reported as unused.
pub const EXEMPT_HOOKS: &[&str] = &[
    "useState",
    "useEffect",
    "useCallback",
    "useMemo",
    "useRef",
    "useContext",
    "useReducer",
    "useLayoutEffect",
];

/// Accessibility score below which a file gets a gap.
pub const ACCESSIBILITY_THRESHOLD: f64 = 70.0;

/// Completeness weights per criterion.
pub mod weights {
    pub const PROPS_INTERFACE: f64 = 25.0;
    pub const PROP_VALIDATION: f64 = 20.0;
    pub const ERROR_ISOLATION: f64 = 15.0;
    pub const ACCESSIBILITY: f64 = 30.0;
    pub const NO_MISSING_IMPORTS: f64 = 5.0;
    pub const NO_UNUSED_IMPORTS: f64 = 5.0;
}

/// What the analyzer found in one component file.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentReport {
    /// Project-relative path.
    pub file: String,
    /// Primary declared component, or the file's base name.
    pub component: String,
    pub has_props_interface: bool,
    /// Same signal as `has_props_interface`: static typing is the validation.
    pub has_prop_validation: bool,
    pub has_error_isolation: bool,
    pub accessibility: accessibility::Findings,
    /// Local component imports that do not resolve to a file.
    pub missing_imports: Vec<String>,
    /// Component-sourced bindings never used in the file body.
    pub unused_imports: Vec<String>,
}

impl ComponentReport {
    pub fn accessibility_score(&self) -> f64 {
        self.accessibility.score()
    }

    /// Weighted completeness in [0, 100].
    pub fn completeness(&self) -> f64 {
        let mut score = 0.0;
        if self.has_props_interface {
            score += weights::PROPS_INTERFACE;
        }
        if self.has_prop_validation {
            score += weights::PROP_VALIDATION;
        }
        if self.has_error_isolation {
            score += weights::ERROR_ISOLATION;
        }
        score += self.accessibility_score() / 100.0 * weights::ACCESSIBILITY;
        if self.missing_imports.is_empty() {
            score += weights::NO_MISSING_IMPORTS;
        }
        if self.unused_imports.is_empty() {
            score += weights::NO_UNUSED_IMPORTS;
        }
        score
    }

    /// One gap per violated criterion.
    pub fn gaps(&self) -> Vec<Gap> {
        let mut gaps = Vec::new();
        let file = &self.file;

        if !self.has_props_interface {
            gaps.push(
                Gap::new(
                    format!("component-props:{}", file),
                    Severity::Medium,
                    "component",
                    format!("{} has no {}{} interface", self.component, self.component, PROPS_SUFFIX),
                    format!(
                        "Declare `interface {}{} {{ ... }}` and type the component's props with it",
                        self.component, PROPS_SUFFIX
                    ),
                )
                .with_files([file.clone()])
                .with_effort(Effort::Low),
            );
        }

        if !self.has_error_isolation {
            gaps.push(
                Gap::new(
                    format!("component-error-boundary:{}", file),
                    Severity::Low,
                    "component",
                    format!("{} is not wrapped in an error boundary", self.component),
                    format!(
                        "Wrap {} in an <ErrorBoundary> or handle render errors with componentDidCatch",
                        self.component
                    ),
                )
                .with_files([file.clone()])
                .with_effort(Effort::Low),
            );
        }

        let a11y = self.accessibility_score();
        if a11y < ACCESSIBILITY_THRESHOLD {
            let problems = self.accessibility.describe();
            gaps.push(
                Gap::new(
                    format!("component-accessibility:{}", file),
                    Severity::High,
                    "accessibility",
                    format!(
                        "{} scores {:.0}/100 on accessibility: {}",
                        self.component,
                        a11y,
                        problems.join("; ")
                    ),
                    "Give every interactive element an aria-label, aria-labelledby, id with a \
                     matching <label htmlFor>, or visible text; add alt to images; add role and \
                     keyboard handlers to clickable non-interactive elements"
                        .to_string(),
                )
                .with_files([file.clone()])
                .with_effort(Effort::Medium),
            );
        }

        if !self.missing_imports.is_empty() {
            gaps.push(
                Gap::new(
                    format!("component-missing-import:{}", file),
                    Severity::Critical,
                    "component",
                    format!(
                        "{} imports components that do not exist: {}",
                        self.component,
                        self.missing_imports.join(", ")
                    ),
                    format!(
                        "Create the missing component file(s) or fix the import path(s): {}",
                        self.missing_imports.join(", ")
                    ),
                )
                .with_files([file.clone()])
                .with_effort(Effort::High),
            );
        }

        if !self.unused_imports.is_empty() {
            gaps.push(
                Gap::new(
                    format!("component-unused-import:{}", file),
                    Severity::Low,
                    "component",
                    format!(
                        "{} has unused imports: {}",
                        self.component,
                        self.unused_imports.join(", ")
                    ),
                    format!("Remove the unused import(s): {}", self.unused_imports.join(", ")),
                )
                .with_files([file.clone()])
                .with_effort(Effort::Low),
            );
        }

        gaps
    }
}

/// Scores UI component files.
pub struct ComponentAnalyzer {
    project: Arc<Project>,
}

impl ComponentAnalyzer {
    pub fn new(project: Arc<Project>) -> Self {
        Self { project }
    }
}

#[async_trait]
impl Analyzer for ComponentAnalyzer {
    fn name(&self) -> &str {
        COMPONENTS
    }

    async fn analyze(&self) -> anyhow::Result<AnalyzerResult> {
        let project = Arc::clone(&self.project);
        let reports = blocking(move || Ok(inspect_all(&project))).await?;
        Ok(summarize(reports))
    }
}

/// Inspect every component file of the project.
pub fn inspect_all(project: &Project) -> Vec<ComponentReport> {
    let paths = project.walk(&project.config().layout.components_dir, Walk::components());
    tracing::debug!(count = paths.len(), "inspecting component files");

    paths
        .par_iter()
        .filter_map(|path| {
            let source = files::read_text(path)?;
            Some(inspect(project, path, &source))
        })
        .collect()
}

fn summarize(reports: Vec<ComponentReport>) -> AnalyzerResult {
    let scores: Vec<f64> = reports.iter().map(ComponentReport::completeness).collect();
    let score = if scores.is_empty() {
        0.0
    } else {
        round2(scores.iter().sum::<f64>() / scores.len() as f64)
    };
    let average_a11y = if reports.is_empty() {
        0.0
    } else {
        round2(reports.iter().map(|r| r.accessibility_score()).sum::<f64>() / reports.len() as f64)
    };

    let gaps: Vec<Gap> = reports.iter().flat_map(ComponentReport::gaps).collect();

    AnalyzerResult::new(COMPONENTS)
        .with_score(score)
        .with_meta("componentCount", reports.len())
        .with_meta(
            "withPropsInterface",
            reports.iter().filter(|r| r.has_props_interface).count(),
        )
        .with_meta(
            "withErrorIsolation",
            reports.iter().filter(|r| r.has_error_isolation).count(),
        )
        .with_meta("averageAccessibility", average_a11y)
        .with_meta(
            "missingImports",
            reports.iter().map(|r| r.missing_imports.len()).sum::<usize>(),
        )
        .with_meta(
            "unusedImports",
            reports.iter().map(|r| r.unused_imports.len()).sum::<usize>(),
        )
        .with_gaps(gaps)
}

/// Inspect one component file.
pub fn inspect(project: &Project, path: &Path, source: &str) -> ComponentReport {
    let facts = match parser::parse_source(path, source.as_bytes()) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "cannot parse component");
            SourceFacts::default()
        }
    };

    let component = facts
        .primary_component()
        .map(str::to_string)
        .unwrap_or_else(|| files::base_name(path));
    let has_props = facts.has_type_with_suffix(PROPS_SUFFIX);

    let resolver = Resolver::new(project);
    let mut missing_imports = Vec::new();
    let mut unused_imports = Vec::new();

    for import in &facts.imports {
        let Some(target) = resolver.component_target(path, &import.source) else {
            continue;
        };
        if !resolver.is_external(&import.source) && !resolves(&target) {
            missing_imports.push(import.source.clone());
        }
        unused_imports.extend(unused_bindings(source, import));
    }

    ComponentReport {
        file: project.rel(path),
        component,
        has_props_interface: has_props,
        has_prop_validation: has_props,
        has_error_isolation: ERROR_ISOLATION_MARKERS.iter().any(|m| source.contains(m)),
        accessibility: accessibility::assess(&facts.jsx),
        missing_imports,
        unused_imports,
    }
}

/// Maps import specifiers to paths on disk.
struct Resolver<'a> {
    project: &'a Project,
    components_dir: PathBuf,
}

impl<'a> Resolver<'a> {
    fn new(project: &'a Project) -> Self {
        Self {
            project,
            components_dir: normalize(&project.path(&project.config().layout.components_dir)),
        }
    }

    fn is_external(&self, specifier: &str) -> bool {
        EXTERNAL_ALLOWLIST.iter().any(|p| specifier.starts_with(p))
    }

    /// The unresolved target of an import that points into the component
    /// directory, or None for anything else.
    fn component_target(&self, importer: &Path, specifier: &str) -> Option<PathBuf> {
        if is_framework_source(specifier) {
            return None;
        }
        let layout = &self.project.config().layout;
        let target = if specifier.starts_with('.') {
            importer.parent()?.join(specifier)
        } else if let Some(rest) = specifier.strip_prefix(layout.alias_prefix.as_str()) {
            self.project.path(&layout.alias_root).join(rest)
        } else {
            return None;
        };
        let target = normalize(&target);
        target.starts_with(&self.components_dir).then_some(target)
    }
}

/// Whether `target` exists as written, with a known extension, or as a
/// directory index.
fn resolves(target: &Path) -> bool {
    if target.is_file() {
        return true;
    }
    let as_string = target.to_string_lossy();
    if RESOLVE_EXTENSIONS
        .iter()
        .any(|ext| Path::new(&format!("{}.{}", as_string, ext)).is_file())
    {
        return true;
    }
    RESOLVE_EXTENSIONS
        .iter()
        .any(|ext| target.join(format!("index.{}", ext)).is_file())
}

/// Lexically resolve `.` and `..` components.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn is_framework_source(specifier: &str) -> bool {
    specifier == "react"
        || specifier == "react-dom"
        || specifier.starts_with("react/")
        || specifier.starts_with("react-dom/")
}

/// Bindings of `import` that never appear in `source` outside the statement.
fn unused_bindings(source: &str, import: &ImportDecl) -> Vec<String> {
    let start = import.start_byte.min(source.len());
    let end = import.end_byte.clamp(start, source.len());
    let body = format!("{}\n{}", &source[..start], &source[end..]);

    import
        .names
        .iter()
        .filter(|name| !EXEMPT_HOOKS.contains(&name.as_str()))
        .filter(|name| !identifier_used(&body, name))
        .cloned()
        .collect()
}

fn identifier_used(body: &str, name: &str) -> bool {
    // `$` is an identifier character in JS.
    let is_ident = |c: char| c.is_alphanumeric() || c == '_' || c == '$';
    body.match_indices(name).any(|(at, _)| {
        let before = body[..at].chars().next_back();
        let after = body[at + name.len()..].chars().next();
        !before.is_some_and(is_ident) && !after.is_some_and(is_ident)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) -> PathBuf {
        let p = root.join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(&p, content).unwrap();
        p
    }

    fn project(temp: &TempDir) -> Project {
        Project::new(temp.path(), Config::default())
    }

    #[test]
    fn test_complete_component() {
        let temp = TempDir::new().unwrap();
        let src = r#"
import { ErrorBoundary } from "react-error-boundary";

export interface SaveButtonProps { onSave: () => void }

export function SaveButton({ onSave }: SaveButtonProps) {
  return (
    <ErrorBoundary fallback={<p>Oops</p>}>
      <button onClick={() => onSave()}>Save</button>
    </ErrorBoundary>
  );
}
"#;
        let path = write(temp.path(), "src/components/SaveButton.tsx", src);
        let report = inspect(&project(&temp), &path, src);
        assert_eq!(report.file, "src/components/SaveButton.tsx");
        assert!(report.has_props_interface);
        assert!(report.has_prop_validation);
        assert!(report.has_error_isolation);
        assert_eq!(report.accessibility_score(), 100.0);
        assert_eq!(report.completeness(), 100.0);
        assert!(report.gaps().is_empty());
    }

    #[test]
    fn test_component_defaults_to_file_name() {
        let temp = TempDir::new().unwrap();
        let src = "const x = () => <input />;\nexport default x;\n";
        let path = write(temp.path(), "src/components/Search.tsx", src);
        let report = inspect(&project(&temp), &path, src);
        assert_eq!(report.component, "Search");
        // props 0, validation 0, isolation 0, a11y 65 * 0.3, imports 5 + 5
        assert!((report.completeness() - 29.5).abs() < 1e-9);

        let gaps = report.gaps();
        let severities: Vec<Severity> = gaps.iter().map(|g| g.severity).collect();
        assert_eq!(
            severities,
            vec![Severity::Medium, Severity::Low, Severity::High]
        );
        assert_eq!(gaps[2].category, "accessibility");
        assert_eq!(gaps[2].affected_files, vec!["src/components/Search.tsx"]);
    }

    #[test]
    fn test_controlled_input_with_block_handler() {
        let temp = TempDir::new().unwrap();
        let src = r#"
export interface NameFieldProps { form: Form; setForm: (f: Form) => void }

export function NameField({ form, setForm }: NameFieldProps) {
  return (
    <input
      value={form.name}
      onChange={(e) => { setForm({ ...form, name: e.target.value }); }}
    />
  );
}
"#;
        let path = write(temp.path(), "src/components/NameField.tsx", src);
        let report = inspect(&project(&temp), &path, src);
        assert_eq!(report.accessibility.unlabelled_controls, 1);
        assert!(report
            .gaps()
            .iter()
            .any(|g| g.severity == Severity::High && g.category == "accessibility"));
    }

    #[test]
    fn test_identifier_used_respects_boundaries() {
        assert!(identifier_used("<Card />", "Card"));
        assert!(identifier_used("x = $Card + Card", "Card"));
        assert!(!identifier_used("CardList; myCard; Card_x; $Card", "Card"));
    }

    #[test]
    fn test_missing_local_import() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/components/Avatar.tsx", "export const Avatar = 1;");
        write(temp.path(), "src/components/cards/index.ts", "export {};");
        let src = r#"
import { Avatar } from "./Avatar";
import { Card } from "./cards";
import { Ghost } from "@/components/Ghost";
import { Button } from "@/components/ui/button";
import { formatDate } from "@/lib/date";
import { Icon } from "lucide-react";

export const Profile = () => <div><Avatar /><Card /><Ghost /><Button>Go</Button><Icon />{formatDate()}</div>;
"#;
        let path = write(temp.path(), "src/components/Profile.tsx", src);
        let report = inspect(&project(&temp), &path, src);
        assert_eq!(report.missing_imports, vec!["@/components/Ghost"]);
        assert!(report.unused_imports.is_empty());
        assert!(report
            .gaps()
            .iter()
            .any(|g| g.severity == Severity::Critical && g.description.contains("Ghost")));
    }

    #[test]
    fn test_unused_import_detection() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "src/components/Badge.tsx", "export const Badge = 1;");
        write(temp.path(), "src/components/Chip.tsx", "export const Chip = 1;");
        let src = r#"
import React, { useState } from "react";
import { Badge } from "./Badge";
import { Chip } from "./Chip";

export function Tag() {
  return <Badge>tag</Badge>;
}
"#;
        let path = write(temp.path(), "src/components/Tag.tsx", src);
        let report = inspect(&project(&temp), &path, src);
        // Badge is used in the body; React/useState are framework imports
        assert_eq!(report.unused_imports, vec!["Chip"]);
    }

    #[test]
    fn test_used_once_is_not_unused() {
        let import = ImportDecl {
            source: "./Thing".to_string(),
            names: vec!["Thing".to_string()],
            start_byte: 0,
            end_byte: 33,
        };
        let src = "import { Thing } from \"./Thing\";\nconst t = Thing;";
        assert!(unused_bindings(src, &import).is_empty());
        let only_import = "import { Thing } from \"./Thing\";\nconst t = Things;";
        assert_eq!(unused_bindings(only_import, &import), vec!["Thing"]);
    }

    #[test]
    fn test_normalize() {
        assert_eq!(
            normalize(Path::new("/p/src/components/forms/../Button")),
            PathBuf::from("/p/src/components/Button")
        );
    }

    #[tokio::test]
    async fn test_empty_component_dir_scores_zero() {
        let temp = TempDir::new().unwrap();
        let analyzer = ComponentAnalyzer::new(Arc::new(project(&temp)));
        let result = analyzer.analyze().await.unwrap();
        assert_eq!(result.score, 0.0);
        assert!(result.gaps.is_empty());
    }
}
