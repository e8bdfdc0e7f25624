//! Output formatting for verification reports.
//!
//! Supports three output formats:
//! - Pretty: colored terminal summary for human readability
//! - JSON: lossless structured output for programmatic consumption
//! - Markdown: a shareable document with summary, score table and issues
//!
//! `write_outputs` persists the JSON and Markdown renderings to disk.

use anyhow::Context;
use colored::*;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::{Gap, Severity, VerificationReport};
use crate::score;

/// Prefix of every output file name.
pub const REPORT_PREFIX: &str = "gap-report";

/// Output format selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Format {
    Pretty,
    Json,
    Markdown,
}

// =============================================================================
// JSON
// =============================================================================

/// Serialize the report to pretty-printed JSON.
pub fn to_json(report: &VerificationReport) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

/// Parse a report previously written by `to_json`.
pub fn from_json(json: &str) -> anyhow::Result<VerificationReport> {
    Ok(serde_json::from_str(json)?)
}

// =============================================================================
// Markdown
// =============================================================================

/// Human severity badge.
pub fn severity_badge(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "🔴 CRITICAL",
        Severity::High => "🟠 HIGH",
        Severity::Medium => "🟡 MEDIUM",
        Severity::Low => "🟢 LOW",
    }
}

/// Gaps grouped by category. Categories are ordered by their worst gap, then
/// name; gaps inside a category worst first, ties in report order.
pub fn group_by_category(report: &VerificationReport) -> Vec<(String, Vec<(&str, &Gap)>)> {
    let mut groups: BTreeMap<&str, Vec<(&str, &Gap)>> = BTreeMap::new();
    for (analyzer, gap) in report.gaps() {
        groups
            .entry(gap.category.as_str())
            .or_default()
            .push((analyzer, gap));
    }

    let mut out: Vec<(String, Vec<(&str, &Gap)>)> = groups
        .into_iter()
        .map(|(category, mut gaps)| {
            gaps.sort_by(|a, b| b.1.severity.cmp(&a.1.severity));
            (category.to_string(), gaps)
        })
        .collect();
    // stable: equal worst severities keep alphabetical order
    out.sort_by(|a, b| worst(&b.1).cmp(&worst(&a.1)));
    out
}

fn worst(gaps: &[(&str, &Gap)]) -> Severity {
    gaps.iter()
        .map(|(_, g)| g.severity)
        .max()
        .unwrap_or(Severity::Low)
}

/// Markdown rendering of a report.
pub struct Markdown<'a>(pub &'a VerificationReport);

impl fmt::Display for Markdown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_markdown(f, self.0)
    }
}

/// Render the report as a Markdown document.
pub fn render_markdown(report: &VerificationReport) -> String {
    Markdown(report).to_string()
}

fn write_markdown(md: &mut fmt::Formatter<'_>, report: &VerificationReport) -> fmt::Result {
    let summary = &report.summary;
    let hist = &summary.gaps_by_severity;

    writeln!(md, "# Gap Analysis Report")?;
    writeln!(md)?;
    writeln!(md, "**Project:** `{}`  ", report.project_path)?;
    writeln!(
        md,
        "**Generated:** {}",
        report.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(md)?;

    writeln!(md, "## Executive Summary")?;
    writeln!(md)?;
    writeln!(
        md,
        "**Overall Score:** {:.2}/100 ({})",
        report.overall_score,
        score::status_label(report.overall_score)
    )?;
    writeln!(md)?;
    writeln!(md, "- Total issues: {}", summary.total_gaps)?;
    for severity in Severity::ALL {
        writeln!(md, "  - {}: {}", severity_badge(severity), hist.get(severity))?;
    }
    writeln!(
        md,
        "- Analyzers: {} ({} failed)",
        summary.total_analyzers, summary.failed_analyzers
    )?;
    writeln!(md, "- Estimated work remaining: {}", summary.estimated_work)?;
    writeln!(md)?;

    writeln!(md, "## Analyzer Scores")?;
    writeln!(md)?;
    writeln!(md, "| Analyzer | Score | Status | Issues | Time (ms) |")?;
    writeln!(md, "|----------|-------|--------|--------|-----------|")?;
    for (name, result) in &report.analyzer_results {
        let status = if result.is_failed() {
            "Failed"
        } else {
            score::status_label(result.score)
        };
        writeln!(
            md,
            "| {} | {:.1} | {} | {} | {} |",
            name,
            result.score,
            status,
            result.gaps.len(),
            result.execution_time
        )?;
    }
    writeln!(md)?;

    writeln!(md, "## Issues by Category")?;
    writeln!(md)?;
    let groups = group_by_category(report);
    if groups.is_empty() {
        writeln!(md, "No issues found.")?;
        writeln!(md)?;
    }
    for (category, gaps) in &groups {
        writeln!(md, "### {} ({})", title_case(category), gaps.len())?;
        writeln!(md)?;
        for (analyzer, gap) in gaps {
            writeln!(md, "#### {} {}", severity_badge(gap.severity), gap.description)?;
            writeln!(md)?;
            writeln!(md, "- **Analyzer:** {}", analyzer)?;
            writeln!(md, "- **Recommendation:** {}", gap.recommendation)?;
            if let Some(effort) = gap.estimated_effort {
                writeln!(md, "- **Effort:** {:?}", effort)?;
            }
            if !gap.affected_files.is_empty() {
                let files: Vec<String> =
                    gap.affected_files.iter().map(|f| format!("`{}`", f)).collect();
                writeln!(md, "- **Files:** {}", files.join(", "))?;
            }
            writeln!(md)?;
        }
    }

    writeln!(md, "## Recommendations")?;
    writeln!(md)?;
    for (i, rec) in report.recommendations.iter().enumerate() {
        writeln!(md, "{}. {}", i + 1, rec)?;
    }
    Ok(())
}

fn title_case(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// =============================================================================
// Pretty Format
// =============================================================================

/// Colored terminal rendering of a report. `threshold` decides PASS/FAIL.
pub struct Pretty<'a> {
    pub report: &'a VerificationReport,
    pub threshold: f64,
}

impl fmt::Display for Pretty<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_pretty_to(f, self.report, self.threshold)
    }
}

/// Render a colored terminal summary. `threshold` decides PASS/FAIL.
pub fn render_pretty(report: &VerificationReport, threshold: f64) -> String {
    Pretty { report, threshold }.to_string()
}

fn write_pretty_to(
    out: &mut fmt::Formatter<'_>,
    report: &VerificationReport,
    threshold: f64,
) -> fmt::Result {
    let passed = report.overall_score >= threshold;

    writeln!(out)?;
    writeln!(
        out,
        "  {} v{}",
        "gapcheck".cyan().bold(),
        env!("CARGO_PKG_VERSION")
    )?;
    writeln!(out)?;
    writeln!(out, "  {}{}", "Project: ".dimmed(), report.project_path)?;
    writeln!(out)?;

    let verdict = if passed {
        "✓ PASS".green()
    } else {
        "✗ FAIL".red()
    };
    writeln!(
        out,
        "  {}  Completion: {}  {}",
        verdict,
        colored_score(report.overall_score),
        score::status_label(report.overall_score).bold()
    )?;
    writeln!(out)?;

    writeln!(out, "  {}", "Analyzers:".bold())?;
    for (name, result) in &report.analyzer_results {
        let score = if result.is_failed() {
            "FAILED".red().to_string()
        } else {
            colored_score(result.score)
        };
        writeln!(
            out,
            "    {:<14} {:>8}  {} issue(s)  {}",
            name,
            score,
            result.gaps.len(),
            format!("{}ms", result.execution_time).dimmed()
        )?;
    }
    writeln!(out)?;

    let groups = group_by_category(report);
    if !groups.is_empty() {
        writeln!(out, "  {} ({}):", "Issues".bold(), report.summary.total_gaps)?;
        writeln!(out)?;
        for (category, gaps) in &groups {
            writeln!(out, "  {}", category.bold())?;
            for (_, gap) in gaps {
                writeln!(out, "    {} {}", severity_tag(gap.severity), gap.description)?;
                if let Some(first) = gap.affected_files.first() {
                    let more = gap.affected_files.len() - 1;
                    if more > 0 {
                        writeln!(
                            out,
                            "             {} {}",
                            first.blue(),
                            format!("(+{} more)", more).dimmed()
                        )?;
                    } else {
                        writeln!(out, "             {}", first.blue())?;
                    }
                }
            }
            writeln!(out)?;
        }
    }

    writeln!(out, "  {}", "Recommendations:".bold())?;
    for rec in &report.recommendations {
        writeln!(out, "    {}", rec)?;
    }
    writeln!(out)?;

    writeln!(
        out,
        "  {}  Estimated work: {}  {}",
        format!("Threshold: {:.0}", threshold).dimmed(),
        report.summary.estimated_work,
        if passed { "PASSED".green() } else { "FAILED".red() }
    )
}

/// Print the colored terminal summary to stdout.
pub fn write_pretty(report: &VerificationReport, threshold: f64) {
    print!("{}", render_pretty(report, threshold));
}

fn colored_score(s: f64) -> String {
    let text = format!("{:.1}", s);
    match s {
        s if s >= score::status::NEARLY_COMPLETE_MAX => text.green().bold().to_string(),
        s if s >= score::status::NEEDS_WORK_MAX => text.green().to_string(),
        s if s >= score::status::CRITICAL_MAX => text.yellow().to_string(),
        _ => text.red().to_string(),
    }
}

fn severity_tag(severity: Severity) -> ColoredString {
    match severity {
        Severity::Critical => "CRIT  ".red().bold(),
        Severity::High => "HIGH  ".red(),
        Severity::Medium => "MEDIUM".yellow(),
        Severity::Low => "LOW   ".blue(),
    }
}

// =============================================================================
// Output files
// =============================================================================

/// Paths written by `write_outputs`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFiles {
    pub json: PathBuf,
    pub markdown: PathBuf,
    pub latest_json: PathBuf,
    pub latest_markdown: PathBuf,
}

/// Write timestamped and "latest" JSON and Markdown reports into `dir`.
pub fn write_outputs(dir: &Path, report: &VerificationReport) -> anyhow::Result<OutputFiles> {
    fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;

    let stamp = report.timestamp.format("%Y%m%d-%H%M%S");
    let files = OutputFiles {
        json: dir.join(format!("{}-{}.json", REPORT_PREFIX, stamp)),
        markdown: dir.join(format!("{}-{}.md", REPORT_PREFIX, stamp)),
        latest_json: dir.join(format!("{}-latest.json", REPORT_PREFIX)),
        latest_markdown: dir.join(format!("{}-latest.md", REPORT_PREFIX)),
    };

    let json = to_json(report)?;
    let markdown = render_markdown(report);
    for (path, content) in [
        (&files.json, &json),
        (&files.latest_json, &json),
        (&files.markdown, &markdown),
        (&files.latest_markdown, &markdown),
    ] {
        fs::write(path, content).with_context(|| format!("writing {}", path.display()))?;
    }
    tracing::info!(dir = %dir.display(), "wrote report files");
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AnalyzerResult, Gap, SeverityHistogram, Summary};
    use chrono::{TimeZone, Utc};

    fn sample() -> VerificationReport {
        let components = AnalyzerResult::new("components")
            .with_score(62.5)
            .with_gaps(vec![
                Gap::new("c1", Severity::Low, "component", "No error boundary", "Add one")
                    .with_files(["src/components/A.tsx"]),
                Gap::new("c2", Severity::High, "accessibility", "Unlabelled input", "Label it")
                    .with_files(["src/components/B.tsx"]),
            ]);
        let deps = AnalyzerResult::new("dependencies")
            .with_score(90.0)
            .with_gaps(vec![Gap::new(
                "d1",
                Severity::High,
                "dependency",
                "left-pad is not declared",
                "npm install left-pad",
            )]);

        let mut hist = SeverityHistogram::default();
        hist.record(Severity::Low);
        hist.record(Severity::High);
        hist.record(Severity::High);

        VerificationReport {
            timestamp: Utc.with_ymd_and_hms(2026, 3, 4, 5, 6, 7).unwrap(),
            project_path: "/work/app".to_string(),
            overall_score: 76.25,
            analyzer_results: [components, deps]
                .into_iter()
                .map(|r| (r.analyzer_name.clone(), r))
                .collect(),
            summary: Summary {
                total_gaps: 3,
                gaps_by_severity: hist,
                total_analyzers: 2,
                failed_analyzers: 0,
                estimated_work: "1-2 days".to_string(),
            },
            recommendations: vec![
                "Resolve 2 high-priority issue(s) before release".to_string(),
                "Overall completion is 76.2%".to_string(),
            ],
        }
    }

    #[test]
    fn test_json_is_lossless() {
        let report = sample();
        let json = to_json(&report).unwrap();
        assert!(json.contains("\"overallScore\": 76.25"));
        assert!(json.contains("\"gapsBySeverity\""));
        assert!(json.contains("\"affectedFiles\""));
        assert_eq!(from_json(&json).unwrap(), report);
    }

    #[test]
    fn test_grouping_worst_first() {
        let report = sample();
        let groups = group_by_category(&report);
        let names: Vec<&str> = groups.iter().map(|(c, _)| c.as_str()).collect();
        // two high categories alphabetically, then the low one
        assert_eq!(names, vec!["accessibility", "dependency", "component"]);
    }

    #[test]
    fn test_markdown_sections() {
        let md = render_markdown(&sample());
        assert!(md.contains("**Project:** `/work/app`"));
        assert!(md.contains("**Generated:** 2026-03-04 05:06:07 UTC"));
        assert!(md.contains("**Overall Score:** 76.25/100 (Nearly Complete)"));
        assert!(md.contains("| components | 62.5 | Needs Work | 2 |"));
        assert!(md.contains("#### 🟠 HIGH Unlabelled input"));
        assert!(md.contains("1. Resolve 2 high-priority issue(s) before release"));
        let access = md.find("### Accessibility").unwrap();
        let component = md.find("### Component").unwrap();
        assert!(access < component);
    }

    #[test]
    fn test_markdown_for_clean_report() {
        let mut report = sample();
        for result in report.analyzer_results.values_mut() {
            result.gaps.clear();
        }
        let md = Markdown(&report).to_string();
        assert_eq!(md, render_markdown(&report));
        assert!(md.contains("## Issues by Category\n\nNo issues found.\n"));
        assert!(md.ends_with("2. Overall completion is 76.2%\n"));
    }

    #[test]
    fn test_pretty_contains_verdict() {
        colored::control::set_override(false);
        let out = render_pretty(&sample(), 80.0);
        assert!(out.contains("✗ FAIL"));
        assert!(out.contains("Nearly Complete"));
        assert!(out.contains("src/components/B.tsx"));
        let out = render_pretty(&sample(), 70.0);
        assert!(out.contains("✓ PASS"));
    }

    #[test]
    fn test_write_outputs() {
        let temp = tempfile::TempDir::new().unwrap();
        let files = write_outputs(&temp.path().join("reports"), &sample()).unwrap();
        assert!(files.json.ends_with("gap-report-20260304-050607.json"));
        assert!(files.markdown.ends_with("gap-report-20260304-050607.md"));
        let latest = std::fs::read_to_string(&files.latest_json).unwrap();
        assert_eq!(from_json(&latest).unwrap(), sample());
        assert!(files.latest_markdown.is_file());
    }
}
