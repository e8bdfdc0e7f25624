//! Runs the project's type checker and counts its diagnostics.

use lazy_static::lazy_static;
use regex::Regex;
use std::path::Path;
use tokio::process::Command;

lazy_static! {
    // src/App.tsx(12,5): error TS2322: Type 'string' is not assignable ...
    static ref DIAGNOSTIC_RE: Regex =
        Regex::new(r"^(.+?)\((\d+),(\d+)\):\s+(error|warning|message)\s+TS(\d+):\s*(.*)$").unwrap();
    // src/App.tsx:12:5 - error TS2322: ... (pretty output)
    static ref PRETTY_DIAGNOSTIC_RE: Regex =
        Regex::new(r"^(.+?):(\d+):(\d+)\s+-\s+(error|warning|message)\s+TS(\d+):\s*(.*)$").unwrap();
}

/// One diagnostic reported by the type checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    pub line: usize,
    pub category: String,
    pub code: String,
    pub message: String,
}

impl Diagnostic {
    /// Informational diagnostics do not count as problems.
    pub fn is_informational(&self) -> bool {
        self.category == "message"
    }
}

/// Outcome of a type-check run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypecheckOutcome {
    /// True when the checker was not run (disabled, no tsconfig, not installed).
    pub skipped: bool,
    pub reason: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl TypecheckOutcome {
    fn skipped(reason: impl Into<String>) -> Self {
        Self {
            skipped: true,
            reason: Some(reason.into()),
            diagnostics: Vec::new(),
        }
    }

    /// Non-informational diagnostics outside vendor paths.
    pub fn problem_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| !d.is_informational() && !d.file.contains("node_modules"))
            .count()
    }
}

/// Parse checker output into diagnostics, ignoring unrelated lines.
pub fn parse_output(output: &str) -> Vec<Diagnostic> {
    output
        .lines()
        .filter_map(|line| {
            let line = line.trim_end();
            let caps = DIAGNOSTIC_RE
                .captures(line)
                .or_else(|| PRETTY_DIAGNOSTIC_RE.captures(line))?;
            Some(Diagnostic {
                file: caps[1].trim().to_string(),
                line: caps[2].parse().unwrap_or(0),
                category: caps[4].to_string(),
                code: format!("TS{}", &caps[5]),
                message: caps[6].to_string(),
            })
        })
        .collect()
}

/// Run `command` in `project_root` when a `tsconfig.json` is present.
///
/// A checker that cannot be started is reported as skipped, not as an error:
/// missing tooling degrades the analysis instead of invalidating it.
pub async fn run(project_root: &Path, command: &[String]) -> TypecheckOutcome {
    if !project_root.join("tsconfig.json").is_file() {
        return TypecheckOutcome::skipped("no tsconfig.json");
    }
    let Some((program, args)) = command.split_first() else {
        return TypecheckOutcome::skipped("no typecheck command configured");
    };

    tracing::debug!(program = %program, ?args, "running type checker");
    let output = match Command::new(program)
        .args(args)
        .current_dir(project_root)
        .kill_on_drop(true)
        .output()
        .await
    {
        Ok(o) => o,
        Err(e) => {
            tracing::warn!(program = %program, error = %e, "type checker could not be started");
            return TypecheckOutcome::skipped(format!("{} could not be started: {}", program, e));
        }
    };

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push('\n');
    text.push_str(&String::from_utf8_lossy(&output.stderr));

    TypecheckOutcome {
        skipped: false,
        reason: None,
        diagnostics: parse_output(&text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_output() {
        let out = "\
src/App.tsx(12,5): error TS2322: Type 'string' is not assignable to type 'number'.
src/lib/api.ts:3:1 - warning TS6133: 'x' is declared but its value is never read.
node_modules/foo/index.d.ts(1,1): error TS1005: ';' expected.
src/a.ts(1,1): message TS6194: Found 1 error.
Found 3 errors in 2 files.
";
        let diags = parse_output(out);
        assert_eq!(diags.len(), 4);
        assert_eq!(diags[0].file, "src/App.tsx");
        assert_eq!(diags[0].line, 12);
        assert_eq!(diags[0].code, "TS2322");
        assert_eq!(diags[1].category, "warning");

        let outcome = TypecheckOutcome {
            skipped: false,
            reason: None,
            diagnostics: diags,
        };
        // node_modules and informational diagnostics are excluded
        assert_eq!(outcome.problem_count(), 2);
    }

    #[tokio::test]
    async fn test_skipped_without_tsconfig() {
        let temp = tempfile::TempDir::new().unwrap();
        let outcome = run(temp.path(), &["tsc".to_string()]).await;
        assert!(outcome.skipped);
        assert_eq!(outcome.problem_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_program_is_skipped() {
        let temp = tempfile::TempDir::new().unwrap();
        std::fs::write(temp.path().join("tsconfig.json"), "{}").unwrap();
        let outcome = run(
            temp.path(),
            &["gapcheck-no-such-type-checker-binary".to_string()],
        )
        .await;
        assert!(outcome.skipped);
        assert!(outcome.reason.unwrap().contains("could not be started"));
    }
}
