//! Integration tests running the built-in analyzers against real project trees.
//!
//! Small scenarios are built in temporary directories; the full run uses the
//! sample React app under testdata/.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use gapcheck::cli::build_engine;
use gapcheck::{
    ComponentAnalyzer, Config, DependencyAnalyzer, Engine, MetadataValue, Project, Severity,
    ANALYZER_NAMES,
};

fn testdata_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("testdata")
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn project(root: &Path) -> Arc<Project> {
    let mut config = Config::default();
    config.typecheck.enabled = false;
    Arc::new(Project::new(root, config))
}

#[tokio::test]
async fn test_unlabelled_input_is_flagged() {
    let temp = TempDir::new().unwrap();
    write(
        temp.path(),
        "src/components/SaveBar.tsx",
        r#"export interface SaveBarProps { onSave: () => void }

export function SaveBar({ onSave }: SaveBarProps) {
  return <button onClick={onSave}>Save</button>;
}
"#,
    );
    write(
        temp.path(),
        "src/components/Search.tsx",
        r#"export function Search() {
  return <input />;
}
"#,
    );

    let mut engine = Engine::new(temp.path());
    engine
        .register(Arc::new(ComponentAnalyzer::new(project(temp.path()))))
        .unwrap();
    let report = engine.analyze().await.expect("analysis should run");

    assert!(report.overall_score < 100.0);

    let high: Vec<_> = report
        .gaps()
        .filter(|(_, g)| g.severity == Severity::High)
        .collect();
    assert_eq!(high.len(), 1, "expected one high gap, got {:?}", high);
    let (analyzer, gap) = high[0];
    assert_eq!(analyzer, "components");
    assert_eq!(gap.category, "accessibility");
    assert_eq!(gap.affected_files, vec!["src/components/Search.tsx"]);
}

#[tokio::test]
async fn test_undeclared_import_costs_ten_points() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "package.json", "{}");
    write(
        temp.path(),
        "src/index.ts",
        "import leftPad from \"left-pad\";\n\nexport const padded = leftPad(\"1\", 3, \"0\");\n",
    );

    let mut engine = Engine::new(temp.path());
    engine
        .register(Arc::new(DependencyAnalyzer::new(project(temp.path()))))
        .unwrap();
    let report = engine.analyze().await.unwrap();

    let result = &report.analyzer_results["dependencies"];
    assert_eq!(result.score, 90.0);
    assert_eq!(result.gaps.len(), 1);
    assert_eq!(result.gaps[0].id, "dependency-missing:left-pad");
    assert_eq!(result.gaps[0].severity, Severity::High);
}

#[tokio::test]
async fn test_broken_manifest_fails_only_its_analyzer() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "package.json", "{ not json");
    write(
        temp.path(),
        "src/components/Title.tsx",
        "export interface TitleProps { text: string }\nexport function Title({ text }: TitleProps) { return <h1>{text}</h1>; }\n",
    );

    let project = project(temp.path());
    let mut engine = Engine::new(temp.path());
    engine
        .register(Arc::new(ComponentAnalyzer::new(Arc::clone(&project))))
        .unwrap();
    engine
        .register(Arc::new(DependencyAnalyzer::new(project)))
        .unwrap();
    let report = engine.analyze().await.unwrap();

    assert!(report.analyzer_results["dependencies"].is_failed());
    assert!(!report.analyzer_results["components"].is_failed());
    assert_eq!(report.summary.failed_analyzers, 1);
    assert_eq!(
        report.overall_score,
        report.analyzer_results["components"].score
    );
}

fn sample_app_report() -> gapcheck::VerificationReport {
    let root = testdata_path().join("sample-app");
    let config = Config::load(&root, None).expect("fixture config should parse");
    assert!(!config.typecheck.enabled);
    let engine = build_engine(&root, config).expect("engine should build");

    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime
        .block_on(engine.analyze())
        .expect("analysis should run")
}

#[test]
fn test_sample_app_full_run() {
    let report = sample_app_report();

    let keys: Vec<&str> = report.analyzer_results.keys().map(|k| k.as_str()).collect();
    let mut expected: Vec<&str> = ANALYZER_NAMES.to_vec();
    expected.sort();
    assert_eq!(keys, expected);
    assert_eq!(report.summary.failed_analyzers, 0);
    assert!(report.overall_score > 0.0 && report.overall_score < 100.0);

    let per_analyzer: usize = report.analyzer_results.values().map(|r| r.gaps.len()).sum();
    assert_eq!(report.summary.total_gaps, per_analyzer);
    assert!(!report.recommendations.is_empty());
}

#[test]
fn test_sample_app_structure() {
    let report = sample_app_report();
    let structure = &report.analyzer_results["structure"];

    // One of three routable pages (Settings) is never routed.
    assert!((structure.score - 93.4).abs() < 0.01);
    assert_eq!(
        structure.metadata["unroutedPages"],
        MetadataValue::List(vec!["Settings".to_string()])
    );
    let route_gap = structure
        .gaps
        .iter()
        .find(|g| g.id == "structure-route-coverage")
        .expect("route coverage gap");
    assert_eq!(route_gap.severity, Severity::High);
    assert!(!structure.gaps.iter().any(|g| g.id.starts_with("structure-missing")));
}

#[test]
fn test_sample_app_dependencies() {
    let report = sample_app_report();
    let deps = &report.analyzer_results["dependencies"];

    assert_eq!(deps.score, 88.0);
    let ids: Vec<&str> = deps.gaps.iter().map(|g| g.id.as_str()).collect();
    assert_eq!(ids, vec!["dependency-missing:axios", "dependency-removable"]);
    assert!(deps.gaps[1].description.contains("moment"));
}

#[test]
fn test_sample_app_components() {
    let report = sample_app_report();
    let components = &report.analyzer_results["components"];

    let missing = components
        .gaps
        .iter()
        .find(|g| g.id == "component-missing-import:src/components/LegacyWidget.tsx")
        .expect("missing import gap");
    assert_eq!(missing.severity, Severity::Critical);
    assert!(missing.description.contains("./charts/Sparkline"));

    assert!(components
        .gaps
        .iter()
        .any(|g| g.id == "component-unused-import:src/components/LegacyWidget.tsx"));
    // The alias import of the UI kit resolves and is used.
    assert!(!components
        .gaps
        .iter()
        .any(|g| g.id.starts_with("component-missing-import:src/components/LoginForm")));
}

#[test]
fn test_sample_app_features() {
    let report = sample_app_report();
    let features = &report.analyzer_results["features"];

    // Authentication has 5 of 8 artifacts, Dashboard 4 of 5.
    assert!((features.score - 71.25).abs() < 0.01);
    assert!(features
        .gaps
        .iter()
        .any(|g| g.id == "feature-incomplete:authentication" && g.severity == Severity::Medium));
    assert!(!features
        .gaps
        .iter()
        .any(|g| g.id == "feature-incomplete:dashboard"));
    assert_eq!(
        features.metadata["orphanComponents"],
        MetadataValue::List(vec!["LegacyWidget".to_string()])
    );
}

#[test]
fn test_sample_app_quality_without_typecheck() {
    let report = sample_app_report();
    let quality = &report.analyzer_results["quality"];

    assert_eq!(quality.metadata["typecheckSkipped"], MetadataValue::Bool(true));
    // LoginForm is the only tested component of three; ui/button.tsx is exempt.
    assert_eq!(quality.metadata["testCoverage"], MetadataValue::Float(33.33));
    let naming = quality.gaps.iter().find(|g| g.id == "quality-naming");
    assert!(naming.map_or(true, |g| !g
        .affected_files
        .iter()
        .any(|f| f.starts_with("src/components/ui/"))));
}
