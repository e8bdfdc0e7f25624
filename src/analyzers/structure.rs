//! Structure analyzer: project skeleton, route coverage, service typing.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::files::{self, Walk};
use super::{blocking, summarize_names, Project, STRUCTURE};
use crate::analyzer::Analyzer;
use crate::model::{AnalyzerResult, Effort, Gap, Severity};
use crate::parser::{self, SourceFacts};

/// Score deductions.
pub mod penalty {
    pub const MISSING_DIRECTORY: f64 = 15.0;
    pub const MISSING_FILE: f64 = 15.0;
    /// Applied in full at 0% route coverage, proportionally above.
    pub const ROUTE_SHORTFALL: f64 = 20.0;
    pub const UNPAIRED_SERVICE: f64 = 5.0;
}

/// Route coverage below which the routing gap is critical / high.
pub const ROUTES_CRITICAL_BELOW: f64 = 50.0;
pub const ROUTES_HIGH_BELOW: f64 = 80.0;

lazy_static! {
    static ref LAZY_RE: Regex =
        Regex::new(r"\b(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*=\s*(?:React\.)?lazy\s*\(").unwrap();
    static ref SERVICE_SUFFIX_RE: Regex = Regex::new(r"(?i)[._-]?(service|api)s?$").unwrap();
}

/// Route wiring of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRoute {
    pub name: String,
    pub file: String,
    pub imported: bool,
    pub instantiated: bool,
}

impl PageRoute {
    pub fn is_routed(&self) -> bool {
        self.imported && self.instantiated
    }
}

/// Route coverage over the pages that need a route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteCoverage {
    /// Route paths declared in the application root.
    pub declared_paths: Vec<String>,
    pub pages: Vec<PageRoute>,
    /// Percentage of pages both imported and instantiated, rounded.
    pub coverage: f64,
}

impl RouteCoverage {
    pub fn unrouted(&self) -> impl Iterator<Item = &PageRoute> {
        self.pages.iter().filter(|p| !p.is_routed())
    }
}

/// Validates project layout.
pub struct StructureAnalyzer {
    project: Arc<Project>,
}

impl StructureAnalyzer {
    pub fn new(project: Arc<Project>) -> Self {
        Self { project }
    }
}

#[async_trait]
impl Analyzer for StructureAnalyzer {
    fn name(&self) -> &str {
        STRUCTURE
    }

    async fn analyze(&self) -> anyhow::Result<AnalyzerResult> {
        let project = Arc::clone(&self.project);
        blocking(move || Ok(analyze_structure(&project))).await
    }
}

fn analyze_structure(project: &Project) -> AnalyzerResult {
    let structure = &project.config().structure;
    let mut gaps = Vec::new();

    let missing_dirs: Vec<String> = structure
        .required_directories
        .iter()
        .filter(|d| !project.path(d).is_dir())
        .cloned()
        .collect();
    for dir in &missing_dirs {
        gaps.push(
            Gap::new(
                format!("structure-missing-directory:{}", dir),
                Severity::Critical,
                "structure",
                format!("Required directory {} is missing", dir),
                format!("Create the {}/ directory", dir),
            )
            .with_files([dir.clone()])
            .with_effort(Effort::Low),
        );
    }

    let missing_files: Vec<String> = structure
        .required_files
        .iter()
        .filter(|f| !project.path(f).is_file())
        .cloned()
        .collect();
    for file in &missing_files {
        gaps.push(
            Gap::new(
                format!("structure-missing-file:{}", file),
                Severity::Critical,
                "structure",
                format!("Required file {} is missing", file),
                format!("Add {} to the project", file),
            )
            .with_files([file.clone()])
            .with_effort(Effort::Low),
        );
    }

    let routes = route_coverage(project);
    if let Some(gap) = route_gap(project, &routes) {
        gaps.push(gap);
    }

    let unpaired = unpaired_services(project);
    if !unpaired.is_empty() {
        let names: Vec<String> = unpaired.iter().map(|p| files::stem(p)).collect();
        let rels: Vec<String> = unpaired.iter().map(|p| project.rel(p)).collect();
        gaps.push(
            Gap::new(
                "structure-untyped-services",
                Severity::High,
                "structure",
                format!(
                    "{} service(s) have no matching type definitions: {}",
                    unpaired.len(),
                    summarize_names(&names, 10)
                ),
                format!(
                    "Add a type file under {} for each service (e.g. {}/{}.ts) or declare its \
                     request/response interfaces inline",
                    project.config().layout.types_dir,
                    project.config().layout.types_dir,
                    service_base(&names[0])
                ),
            )
            .with_files(rels)
            .with_effort(Effort::Medium),
        );
    }

    let shortfall = (100.0 - routes.coverage) / 100.0 * penalty::ROUTE_SHORTFALL;
    let score = 100.0
        - missing_dirs.len() as f64 * penalty::MISSING_DIRECTORY
        - missing_files.len() as f64 * penalty::MISSING_FILE
        - shortfall
        - unpaired.len() as f64 * penalty::UNPAIRED_SERVICE;

    let unrouted: Vec<String> = routes.unrouted().map(|p| p.name.clone()).collect();
    AnalyzerResult::new(STRUCTURE)
        .with_score(score.max(0.0))
        .with_meta("missingDirectories", missing_dirs)
        .with_meta("missingFiles", missing_files)
        .with_meta("routeCoverage", routes.coverage)
        .with_meta("declaredRoutes", routes.declared_paths.clone())
        .with_meta("pagesNeedingRoutes", routes.pages.len())
        .with_meta("unroutedPages", unrouted)
        .with_meta("untypedServices", unpaired.len())
        .with_gaps(gaps)
}

/// Compute route coverage for the project's pages.
pub fn route_coverage(project: &Project) -> RouteCoverage {
    let layout = &project.config().layout;
    let exclusions = &project.config().structure.route_exclusions;

    let pages: Vec<(String, PathBuf)> = project
        .walk(&layout.pages_dir, Walk::components())
        .into_iter()
        .map(|p| (files::base_name(&p), p))
        .filter(|(name, _)| !exclusions.iter().any(|e| e == name))
        .collect();

    let app_path = project.path(&layout.app_root);
    let app_source = if app_path.is_file() {
        files::read_text(&app_path).unwrap_or_default()
    } else {
        String::new()
    };
    let facts = if app_source.is_empty() {
        SourceFacts::default()
    } else {
        parser::parse_source(&app_path, app_source.as_bytes()).unwrap_or_else(|e| {
            tracing::warn!(file = %app_path.display(), error = %e, "cannot parse application root");
            SourceFacts::default()
        })
    };
    let body = strip_imports(&app_source, &facts);

    let pages: Vec<PageRoute> = pages
        .into_iter()
        .map(|(name, path)| PageRoute {
            imported: is_imported(&name, &facts, &app_source),
            instantiated: is_instantiated(&name, &facts, &body),
            file: project.rel(&path),
            name,
        })
        .collect();

    let coverage = if pages.is_empty() {
        100.0
    } else {
        let routed = pages.iter().filter(|p| p.is_routed()).count();
        (routed as f64 / pages.len() as f64 * 100.0).round()
    };

    RouteCoverage {
        declared_paths: facts
            .jsx
            .iter()
            .filter(|e| e.tag == "Route")
            .filter_map(|e| e.attr_value("path"))
            .map(str::to_string)
            .collect(),
        pages,
        coverage,
    }
}

fn route_gap(project: &Project, routes: &RouteCoverage) -> Option<Gap> {
    let unrouted: Vec<&PageRoute> = routes.unrouted().collect();
    if unrouted.is_empty() {
        return None;
    }
    let severity = if routes.coverage < ROUTES_CRITICAL_BELOW {
        Severity::Critical
    } else if routes.coverage < ROUTES_HIGH_BELOW {
        Severity::High
    } else {
        Severity::Medium
    };
    let names: Vec<String> = unrouted.iter().map(|p| p.name.clone()).collect();
    let snippets: Vec<String> = unrouted.iter().map(|p| route_snippet(&p.name)).collect();

    Some(
        Gap::new(
            "structure-route-coverage",
            severity,
            "structure",
            format!(
                "Route coverage is {:.0}%: {} page(s) are not imported and routed in {}: {}",
                routes.coverage,
                unrouted.len(),
                project.config().layout.app_root,
                names.join(", ")
            ),
            format!(
                "Import each page in {} and add: {}",
                project.config().layout.app_root,
                snippets.join(" ")
            ),
        )
        .with_files(unrouted.iter().map(|p| p.file.clone()))
        .with_effort(Effort::Low),
    )
}

/// `<Route path="/project-detail" element={<ProjectDetail />} />`
pub fn route_snippet(page: &str) -> String {
    format!(r#"<Route path="/{}" element={{<{} />}} />"#, kebab_case(page), page)
}

/// `ProjectDetail` -> `project-detail`.
pub fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c == '_' || c == ' ' {
            out.push('-');
            prev_lower = false;
        } else if c.is_ascii_uppercase() {
            if prev_lower {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

fn strip_imports(source: &str, facts: &SourceFacts) -> String {
    let mut body = String::with_capacity(source.len());
    let mut pos = 0;
    for import in &facts.imports {
        let start = import.start_byte.clamp(pos, source.len());
        body.push_str(&source[pos..start]);
        pos = import.end_byte.clamp(start, source.len());
    }
    body.push_str(&source[pos..]);
    body
}

fn is_imported(name: &str, facts: &SourceFacts, source: &str) -> bool {
    facts.imports.iter().any(|i| i.names.iter().any(|n| n == name))
        || LAZY_RE.captures_iter(source).any(|c| &c[1] == name)
}

/// `<Name ...>` or a `{Name}` reference (e.g. `component={Name}`).
fn is_instantiated(name: &str, facts: &SourceFacts, body: &str) -> bool {
    if facts.jsx.iter().any(|e| e.tag == name) {
        return true;
    }
    let escaped = regex::escape(name);
    let pattern = format!(r"<{n}[\s/>]|\{{\s*{n}\s*\}}", n = escaped);
    Regex::new(&pattern)
        .map(|re| re.is_match(body))
        .unwrap_or(false)
}

/// `authService` -> `auth`, `user-api` -> `user`.
fn service_base(stem: &str) -> String {
    let base = SERVICE_SUFFIX_RE.replace(stem, "").to_string();
    if base.is_empty() {
        stem.to_string()
    } else {
        base
    }
}

/// Whether a type file stem loosely matches a service base name.
fn names_match(service: &str, type_stem: &str) -> bool {
    let s = service.to_lowercase();
    let t = type_stem.to_lowercase();
    let t = t.strip_suffix(".types").or_else(|| t.strip_suffix(".d")).unwrap_or(&t);
    s == t
        || format!("{}s", s) == t
        || format!("{}s", t) == s
        || (!t.is_empty() && (s.contains(t) || t.contains(s.as_str())))
}

/// Service files with neither a matching type file nor inline declarations.
fn unpaired_services(project: &Project) -> Vec<PathBuf> {
    let layout = &project.config().layout;
    let type_stems: Vec<String> = project
        .walk(&layout.types_dir, Walk::sources())
        .iter()
        .map(|p| files::stem(p))
        .collect();

    project
        .walk(&layout.services_dir, Walk::sources())
        .into_iter()
        .filter(|path| files::base_name(path) != "index")
        .filter(|path| {
            let base = service_base(&files::stem(path));
            if type_stems.iter().any(|t| names_match(&base, t)) {
                return false;
            }
            !has_inline_types(path)
        })
        .collect()
}

fn has_inline_types(path: &Path) -> bool {
    let Some(source) = files::read_text(path) else {
        return false;
    };
    parser::parse_source(path, source.as_bytes())
        .map(|f| !f.type_declarations.is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let p = root.join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, content).unwrap();
    }

    const REQUIRED_DIRS: [&str; 6] = [
        "src",
        "src/components",
        "src/pages",
        "src/services",
        "src/types",
        "src/hooks",
    ];

    fn skeleton(root: &Path) {
        for dir in REQUIRED_DIRS {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
        for file in ["package.json", "tsconfig.json", "index.html", "src/main.tsx"] {
            write(root, file, "{}");
        }
    }

    const APP: &str = r#"
import { BrowserRouter, Routes, Route } from "react-router-dom";
import Dashboard from "./pages/Dashboard";
import Settings from "./pages/Settings";
import NotFound from "./pages/NotFound";
const Projects = lazy(() => import("./pages/Projects"));

export default function App() {
  return (
    <BrowserRouter>
      <Routes>
        <Route path="/" element={<Dashboard />} />
        <Route path="/projects" element={<Projects />} />
        <Route path="*" element={<NotFound />} />
      </Routes>
    </BrowserRouter>
  );
}
"#;

    #[test]
    fn test_route_coverage() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(root, "src/App.tsx", APP);
        for page in ["Dashboard", "Settings", "Projects", "Profile", "NotFound"] {
            write(root, &format!("src/pages/{}.tsx", page), "export default () => null;");
        }

        let project = Project::new(root, Config::default());
        let routes = route_coverage(&project);
        assert_eq!(routes.declared_paths, vec!["/", "/projects", "*"]);
        // NotFound is excluded; Settings imported but not routed; Profile neither
        assert_eq!(routes.pages.len(), 4);
        assert_eq!(routes.coverage, 50.0);
        let unrouted: Vec<&str> = routes.unrouted().map(|p| p.name.as_str()).collect();
        assert_eq!(unrouted, vec!["Profile", "Settings"]);

        let gap = route_gap(&project, &routes).unwrap();
        assert_eq!(gap.severity, Severity::High);
        assert!(gap
            .recommendation
            .contains(r#"<Route path="/profile" element={<Profile />} />"#));
    }

    #[test]
    fn test_route_path_after_element() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        write(
            root,
            "src/App.tsx",
            r#"
import { Routes, Route } from "react-router-dom";
import Dashboard from "./pages/Dashboard";
import Reports from "./pages/Reports";

export default function App() {
  return (
    <Routes>
      <Route element={<Dashboard />} path="/dash" />
      <Route
        element={
          <Suspense fallback={<p>Loading</p>}>
            <Reports />
          </Suspense>
        }
        path={"/reports"}
      />
    </Routes>
  );
}
"#,
        );
        for page in ["Dashboard", "Reports"] {
            write(root, &format!("src/pages/{}.tsx", page), "export default () => null;");
        }

        let routes = route_coverage(&Project::new(root, Config::default()));
        assert_eq!(routes.declared_paths, vec!["/dash", "/reports"]);
        assert_eq!(routes.coverage, 100.0);
    }

    #[test]
    fn test_full_score() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        skeleton(root);
        write(root, "src/App.tsx", APP);
        write(root, "src/pages/Dashboard.tsx", "export default () => null;");
        write(root, "src/services/authService.ts", "export const login = () => {};");
        write(root, "src/types/auth.ts", "export interface User { id: string }");
        write(
            root,
            "src/services/projectService.ts",
            "export interface ProjectInput { name: string }\nexport const create = () => {};",
        );

        let result = analyze_structure(&Project::new(root, Config::default()));
        assert_eq!(result.score, 100.0);
        assert!(result.gaps.is_empty());
    }

    #[test]
    fn test_deductions() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        std::fs::create_dir_all(root.join("src/components")).unwrap();
        write(root, "package.json", "{}");
        write(root, "src/services/billingService.ts", "export const pay = () => {};");

        let result = analyze_structure(&Project::new(root, Config::default()));
        // 3 missing directories, 4 missing files, one untyped service: clamped
        assert_eq!(result.score, 0.0);
        assert_eq!(result.count_by_severity(Severity::Critical), 7);
        assert_eq!(result.count_by_severity(Severity::High), 1);
    }

    #[test]
    fn test_names() {
        assert_eq!(kebab_case("ProjectDetail"), "project-detail");
        assert_eq!(kebab_case("Dashboard"), "dashboard");
        assert_eq!(service_base("authService"), "auth");
        assert_eq!(service_base("user-api"), "user");
        assert!(names_match("project", "projects"));
        assert!(names_match("projects", "project"));
        assert!(names_match("auth", "auth.types"));
        assert!(names_match("notification", "notifications"));
        assert!(!names_match("billing", "user"));
    }
}
