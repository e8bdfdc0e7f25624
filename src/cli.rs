//! Command-line interface for gapcheck.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::analyzers::{self, Project};
use crate::config::Config;
use crate::engine::Engine;
use crate::report::{self, Format};

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILED: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Implementation gap analysis for React/TypeScript projects.
///
/// gapcheck runs a set of independent analyzers over a project tree
/// (components, structure, feature completeness, code quality and
/// dependencies) and merges their findings into one severity-ranked
/// report with a completion score and a remaining-work estimate.
#[derive(Parser)]
#[command(name = "gapcheck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging (overrides GAPCHECK_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze a project and report its gaps
    #[command(visible_alias = "check")]
    Verify(VerifyArgs),
    /// Create a gapcheck configuration from a template
    Init(InitArgs),
}

/// Arguments for the verify command.
#[derive(Parser)]
pub struct VerifyArgs {
    /// Project root to analyze
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Path to configuration YAML file (default: auto-discover in the project root)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Pretty)]
    pub format: Format,

    /// Also write timestamped and latest JSON/Markdown reports to this directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Minimum overall score to pass (default: scoring.readiness_threshold)
    #[arg(short, long)]
    pub threshold: Option<f64>,

    /// Do not run the external type checker
    #[arg(long)]
    pub skip_typecheck: bool,

    /// Run only these analyzers (comma separated)
    #[arg(short, long, value_delimiter = ',')]
    pub analyzers: Vec<String>,
}

/// Arguments for the init command.
#[derive(Parser)]
pub struct InitArgs {
    /// Output file path
    #[arg(short, long, default_value = "gapcheck.yaml")]
    pub output: PathBuf,

    /// Template to use
    #[arg(short, long, default_value = "default")]
    pub template: String,

    /// Overwrite an existing file
    #[arg(long)]
    pub force: bool,

    /// List available templates
    #[arg(short, long)]
    pub list: bool,
}

/// Available configuration templates.
struct Template {
    name: &'static str,
    description: &'static str,
    content: &'static str,
}

static TEMPLATES: &[Template] = &[
    Template {
        name: "default",
        description: "Every section with the built-in defaults, ready to edit",
        content: include_str!("templates/default.yaml"),
    },
    Template {
        name: "minimal",
        description: "Layout and features only; everything else uses defaults",
        content: include_str!("templates/minimal.yaml"),
    },
];

/// Resolve the configuration for a verify run, applying command-line overrides.
pub fn resolve_config(root: &Path, args: &VerifyArgs) -> anyhow::Result<Config> {
    let mut config = Config::load(root, args.config.as_deref())?;
    if args.skip_typecheck {
        config.typecheck.enabled = false;
    }
    if !args.analyzers.is_empty() {
        config.analyzers = args.analyzers.iter().map(|a| a.trim().to_string()).collect();
    }
    config.validate()?;
    Ok(config)
}

/// Build an engine with every analyzer the configuration enables.
pub fn build_engine(root: &Path, config: Config) -> anyhow::Result<Engine> {
    let mut engine = Engine::new(root)
        .with_weights(config.scoring.work_weights)
        .with_readiness_threshold(config.scoring.readiness_threshold);
    let project = Arc::new(Project::new(root, config));
    for analyzer in analyzers::build(project) {
        engine.register(analyzer)?;
    }
    Ok(engine)
}

/// Run the verify command.
pub fn run_verify(args: &VerifyArgs) -> anyhow::Result<i32> {
    // Resolve path
    let root = match args.path.canonicalize() {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Error: cannot access path {:?}: {}", args.path, e);
            return Ok(EXIT_ERROR);
        }
    };
    if !root.is_dir() {
        eprintln!("Error: {} is not a directory", root.display());
        return Ok(EXIT_ERROR);
    }

    let config = match resolve_config(&root, args) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: invalid configuration: {:#}", e);
            return Ok(EXIT_ERROR);
        }
    };
    let threshold = args.threshold.unwrap_or(config.scoring.readiness_threshold);
    let engine = build_engine(&root, config)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let report = runtime.block_on(engine.analyze())?;

    match args.format {
        Format::Json => println!("{}", report::to_json(&report)?),
        Format::Markdown => print!("{}", report::render_markdown(&report)),
        Format::Pretty => report::write_pretty(&report, threshold),
    }

    if let Some(dir) = &args.output_dir {
        let files = report::write_outputs(dir, &report)?;
        if args.format == Format::Pretty {
            println!("  Reports written to {}", files.latest_markdown.display());
        }
    }

    if report.overall_score >= threshold {
        Ok(EXIT_SUCCESS)
    } else {
        Ok(EXIT_FAILED)
    }
}

/// Run the init command.
pub fn run_init(args: &InitArgs) -> anyhow::Result<i32> {
    if args.list {
        return list_templates();
    }

    let template = match TEMPLATES.iter().find(|t| t.name == args.template) {
        Some(t) => t,
        None => {
            eprintln!("Error: unknown template {:?}", args.template);
            eprintln!("Run 'gapcheck init --list' to see available templates");
            return Ok(EXIT_ERROR);
        }
    };

    if args.output.exists() && !args.force {
        eprintln!("Error: file already exists: {}", args.output.display());
        eprintln!("Use --force to overwrite or --output to choose a different path");
        return Ok(EXIT_ERROR);
    }

    if let Some(parent) = args.output.parent() {
        if !parent.as_os_str().is_empty() && parent != Path::new(".") {
            if let Err(e) = std::fs::create_dir_all(parent) {
                eprintln!("Error: failed to create directory: {}", e);
                return Ok(EXIT_ERROR);
            }
        }
    }

    if let Err(e) = std::fs::write(&args.output, template.content) {
        eprintln!("Error: failed to write configuration: {}", e);
        return Ok(EXIT_ERROR);
    }

    println!("Created {} from template '{}'", args.output.display(), template.name);
    println!();
    println!("Next steps:");
    println!("  1. Edit {} to describe your project's features", args.output.display());
    println!("  2. Run: gapcheck verify . --config {}", args.output.display());

    Ok(EXIT_SUCCESS)
}

fn list_templates() -> anyhow::Result<i32> {
    println!("Available templates:");
    println!();
    for template in TEMPLATES {
        let name = if template.name == "default" {
            format!("{} (default)", template.name)
        } else {
            template.name.to_string()
        };
        println!("  {:<20} {}", name, template.description);
    }
    println!();
    println!("Usage:");
    println!("  gapcheck init --template <name>");
    Ok(EXIT_SUCCESS)
}
