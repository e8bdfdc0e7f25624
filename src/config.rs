//! Configuration schema for gapcheck.
//!
//! A configuration describes the expected project layout, the product
//! features that must exist, and the knobs used by the scoring. Every field
//! has a default, so an empty file (or no file at all) is a valid config.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analyzers::ANALYZER_NAMES;
use crate::score::{WorkWeights, READINESS_THRESHOLD};

/// Default configuration file names to search for in the project root.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["gapcheck.yaml", ".gapcheck.yaml", "gapcheck.yml"];

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub layout: Layout,
    pub structure: StructureConfig,
    pub features: Vec<FeatureDescriptor>,
    /// Shared UI-kit primitives that never count as orphans.
    pub orphan_allowlist: Vec<String>,
    pub typecheck: TypecheckConfig,
    pub scoring: ScoringConfig,
    /// Glob patterns for paths to skip everywhere (e.g. "**/generated/**").
    pub excluded_paths: Vec<String>,
    /// Analyzers to run (default: all).
    pub analyzers: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            layout: Layout::default(),
            structure: StructureConfig::default(),
            features: default_features(),
            orphan_allowlist: strings(&[
                "Accordion", "Alert", "AlertDialog", "AspectRatio", "Avatar", "Badge",
                "Breadcrumb", "Button", "Calendar", "Card", "Carousel", "Chart", "Checkbox",
                "Collapsible", "Command", "ContextMenu", "Dialog", "Drawer", "DropdownMenu",
                "ErrorBoundary", "Form", "HoverCard", "Input", "InputOtp", "Label", "Layout",
                "Menubar", "NavigationMenu", "Pagination", "Popover", "Progress", "RadioGroup",
                "Resizable", "ScrollArea", "Select", "Separator", "Sheet", "Sidebar", "Skeleton",
                "Slider", "Sonner", "Switch", "Table", "Tabs", "Textarea", "Toast", "Toaster",
                "Toggle", "ToggleGroup", "Tooltip",
            ]),
            typecheck: TypecheckConfig::default(),
            scoring: ScoringConfig::default(),
            excluded_paths: Vec::new(),
            analyzers: strings(ANALYZER_NAMES),
        }
    }
}

impl Config {
    /// Parse a configuration from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::parse_str(&content)
    }

    /// Parse a configuration from YAML text. Empty text yields the defaults.
    pub fn parse_str(content: &str) -> anyhow::Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Find a configuration file in `root`, if any.
    pub fn discover(root: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| root.join(name))
            .find(|p| p.is_file())
    }

    /// Load the configuration for a project: explicit path, discovered file, or defaults.
    pub fn load(root: &Path, explicit: Option<&Path>) -> anyhow::Result<Self> {
        let path = match explicit {
            Some(p) => Some(p.to_path_buf()),
            None => Self::discover(root),
        };
        match path {
            Some(p) => {
                tracing::debug!(path = %p.display(), "loading configuration");
                Self::parse_file(&p)
                    .map_err(|e| anyhow::anyhow!("parsing config {}: {}", p.display(), e))
            }
            None => Ok(Self::default()),
        }
    }

    /// Check if a project-relative path is excluded by `excluded_paths`.
    pub fn is_path_excluded(&self, rel_path: &str) -> bool {
        self.excluded_paths.iter().any(|pattern| {
            globset::Glob::new(pattern)
                .map(|g| g.compile_matcher().is_match(rel_path))
                .unwrap_or(false)
        })
    }

    /// Whether the named analyzer is enabled.
    pub fn is_enabled(&self, analyzer: &str) -> bool {
        self.analyzers.iter().any(|a| a == analyzer)
    }

    /// Validate the configuration for correctness.
    pub fn validate(&self) -> anyhow::Result<()> {
        for name in &self.analyzers {
            if !ANALYZER_NAMES.contains(&name.as_str()) {
                anyhow::bail!(
                    "unknown analyzer {:?}, expected one of: {}",
                    name,
                    ANALYZER_NAMES.join(", ")
                );
            }
        }

        if self.typecheck.enabled && self.typecheck.command.is_empty() {
            anyhow::bail!("typecheck.command must not be empty when typecheck is enabled");
        }

        let mut seen = HashSet::new();
        for feature in &self.features {
            if feature.name.trim().is_empty() {
                anyhow::bail!("feature names must not be empty");
            }
            if !seen.insert(feature.name.to_lowercase()) {
                anyhow::bail!("duplicate feature {:?}", feature.name);
            }
        }

        for pattern in &self.excluded_paths {
            globset::Glob::new(pattern)
                .map_err(|e| anyhow::anyhow!("invalid excluded_paths pattern {:?}: {}", pattern, e))?;
        }

        if !(0.0..=100.0).contains(&self.scoring.readiness_threshold) {
            anyhow::bail!(
                "scoring.readiness_threshold must be within 0-100, got {}",
                self.scoring.readiness_threshold
            );
        }

        Ok(())
    }
}

/// Where things live in the project, relative to the project root.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Layout {
    pub source_root: String,
    pub components_dir: String,
    /// Generated UI primitives (lowercase names, no tests expected).
    pub ui_kit_dir: String,
    pub pages_dir: String,
    pub services_dir: String,
    pub types_dir: String,
    /// Directories holding utilities/hooks (camelCase or kebab-case file names).
    pub utility_dirs: Vec<String>,
    /// File declaring the application routes.
    pub app_root: String,
    pub manifest: String,
    /// Import prefix aliasing `alias_root` (e.g. `@/components/Foo`).
    pub alias_prefix: String,
    pub alias_root: String,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            source_root: "src".to_string(),
            components_dir: "src/components".to_string(),
            ui_kit_dir: "src/components/ui".to_string(),
            pages_dir: "src/pages".to_string(),
            services_dir: "src/services".to_string(),
            types_dir: "src/types".to_string(),
            utility_dirs: strings(&["src/lib", "src/utils", "src/hooks"]),
            app_root: "src/App.tsx".to_string(),
            manifest: "package.json".to_string(),
            alias_prefix: "@/".to_string(),
            alias_root: "src".to_string(),
        }
    }
}

/// Required project skeleton.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StructureConfig {
    pub required_directories: Vec<String>,
    pub required_files: Vec<String>,
    /// Page names that never need a route.
    pub route_exclusions: Vec<String>,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            required_directories: strings(&[
                "src",
                "src/components",
                "src/pages",
                "src/services",
                "src/types",
                "src/hooks",
            ]),
            required_files: strings(&[
                "package.json",
                "tsconfig.json",
                "index.html",
                "src/App.tsx",
                "src/main.tsx",
            ]),
            route_exclusions: strings(&["NotFound", "Index", "Layout"]),
        }
    }
}

/// A named bundle of artifacts one product feature needs.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FeatureDescriptor {
    pub name: String,
    pub description: String,
    pub components: Vec<String>,
    pub services: Vec<String>,
    pub types: Vec<String>,
    pub pages: Vec<String>,
}

impl FeatureDescriptor {
    /// Total number of required artifacts.
    pub fn required_count(&self) -> usize {
        self.components.len() + self.services.len() + self.types.len() + self.pages.len()
    }
}

/// External type-diagnostics engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TypecheckConfig {
    pub enabled: bool,
    /// Program and arguments, run from the project root.
    pub command: Vec<String>,
}

impl Default for TypecheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: strings(&["npx", "tsc", "--noEmit", "--pretty", "false"]),
        }
    }
}

/// Scoring knobs.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub work_weights: WorkWeights,
    pub readiness_threshold: f64,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            work_weights: WorkWeights::default(),
            readiness_threshold: READINESS_THRESHOLD,
        }
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn feature(
    name: &str,
    description: &str,
    components: &[&str],
    services: &[&str],
    types: &[&str],
    pages: &[&str],
) -> FeatureDescriptor {
    FeatureDescriptor {
        name: name.to_string(),
        description: description.to_string(),
        components: strings(components),
        services: strings(services),
        types: strings(types),
        pages: strings(pages),
    }
}

/// Built-in feature list used when the config does not declare one.
pub fn default_features() -> Vec<FeatureDescriptor> {
    vec![
        feature(
            "Authentication",
            "Sign in, sign up and session handling",
            &["LoginForm", "SignupForm", "ProtectedRoute"],
            &["authService"],
            &["User", "AuthState"],
            &["Login", "Signup"],
        ),
        feature(
            "Dashboard",
            "Overview of key metrics and recent activity",
            &["DashboardStats", "RecentActivity"],
            &["dashboardService"],
            &["DashboardMetrics"],
            &["Dashboard"],
        ),
        feature(
            "Projects",
            "Create, list and edit projects",
            &["ProjectCard", "ProjectList", "ProjectForm"],
            &["projectService"],
            &["Project"],
            &["Projects", "ProjectDetail"],
        ),
        feature(
            "Settings",
            "User profile and preferences",
            &["ProfileForm", "PreferencesForm"],
            &["settingsService"],
            &["UserSettings"],
            &["Settings"],
        ),
        feature(
            "Notifications",
            "In-app notification center",
            &["NotificationList", "NotificationItem"],
            &["notificationService"],
            &["Notification"],
            &[],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let yaml = r#"
layout:
  components_dir: app/components
features:
  - name: Billing
    components: [InvoiceTable]
    services: [billingService]
analyzers: [components, dependencies]
"#;
        let config = Config::parse_str(yaml).unwrap();
        assert_eq!(config.layout.components_dir, "app/components");
        // untouched fields keep their defaults
        assert_eq!(config.layout.pages_dir, "src/pages");
        assert_eq!(config.features.len(), 1);
        assert_eq!(config.features[0].required_count(), 2);
        assert!(config.is_enabled("components"));
        assert!(!config.is_enabled("quality"));
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_config_is_default() {
        let config = Config::parse_str("  \n").unwrap();
        assert_eq!(config.features, default_features());
        assert_eq!(config.analyzers.len(), ANALYZER_NAMES.len());
    }

    #[test]
    fn test_validate_rejects_unknown_analyzer() {
        let config = Config {
            analyzers: vec!["security".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_duplicate_features() {
        let mut config = Config::default();
        config.features.push(FeatureDescriptor {
            name: "dashboard".to_string(),
            ..Default::default()
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("duplicate feature"));
    }

    #[test]
    fn test_validate_rejects_empty_typecheck_command() {
        let mut config = Config::default();
        config.typecheck.command.clear();
        assert!(config.validate().is_err());
        config.typecheck.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_path_exclusion() {
        let config = Config {
            excluded_paths: vec!["**/generated/**".to_string()],
            ..Default::default()
        };
        assert!(config.is_path_excluded("src/generated/api.ts"));
        assert!(!config.is_path_excluded("src/services/api.ts"));
    }

    #[test]
    fn test_discover() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(Config::discover(temp.path()).is_none());
        std::fs::write(temp.path().join(".gapcheck.yaml"), "analyzers: [quality]\n").unwrap();
        let found = Config::discover(temp.path()).unwrap();
        let config = Config::load(temp.path(), Some(&found)).unwrap();
        assert_eq!(config.analyzers, vec!["quality".to_string()]);
    }
}
