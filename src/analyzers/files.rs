//! Project tree walking shared by the analyzers.

use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Directories holding third-party or generated code.
pub const VENDOR_DIRS: &[&str] = &[
    "node_modules",
    "vendor",
    "dist",
    "build",
    ".next",
    "out",
    "coverage",
];

/// Directories holding tests.
pub const TEST_DIRS: &[&str] = &["__tests__", "__test__", "test", "tests", "__mocks__"];

/// Directories holding test fixtures.
pub const FIXTURE_DIRS: &[&str] = &["__fixtures__", "fixtures", "testdata"];

/// Extensions of UI component files.
pub const COMPONENT_EXTENSIONS: &[&str] = &["tsx", "jsx"];

/// Extensions of any script source.
pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs"];

/// Options for a walk.
#[derive(Debug, Clone, Copy)]
pub struct Walk<'a> {
    pub extensions: &'a [&'a str],
    pub skip_dirs: &'a [&'a [&'a str]],
    pub skip_test_files: bool,
}

impl<'a> Walk<'a> {
    /// Component-style walk: skips vendor and test directories and test files.
    pub fn components() -> Walk<'static> {
        Walk {
            extensions: COMPONENT_EXTENSIONS,
            skip_dirs: &[VENDOR_DIRS, TEST_DIRS],
            skip_test_files: true,
        }
    }

    /// Source walk: skips vendor, test and fixture directories and test files.
    pub fn sources() -> Walk<'static> {
        Walk {
            extensions: SOURCE_EXTENSIONS,
            skip_dirs: &[VENDOR_DIRS, TEST_DIRS, FIXTURE_DIRS],
            skip_test_files: true,
        }
    }

    /// Test-file walk: only vendor directories are skipped.
    pub fn tests() -> Walk<'static> {
        Walk {
            extensions: SOURCE_EXTENSIONS,
            skip_dirs: &[VENDOR_DIRS],
            skip_test_files: false,
        }
    }

    fn skips_dir(&self, name: &str) -> bool {
        self.skip_dirs.iter().any(|group| group.contains(&name))
    }

    /// Collect matching files under `root`, sorted. A missing root yields nothing.
    pub fn collect(&self, root: &Path) -> Vec<PathBuf> {
        if !root.is_dir() {
            tracing::debug!(root = %root.display(), "walk root does not exist");
            return Vec::new();
        }

        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_entry(|e| {
                if e.depth() == 0 || !e.file_type().is_dir() {
                    return true;
                }
                let name = e.file_name().to_string_lossy();
                !name.starts_with('.') && !self.skips_dir(&name)
            });

        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !self.extensions.contains(&ext) {
                continue;
            }
            if self.skip_test_files && is_test_file(path) {
                continue;
            }
            files.push(path.to_path_buf());
        }

        files.sort();
        files
    }
}

/// Whether a file name marks a test, spec or story file.
pub fn is_test_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.contains(".test.") || name.contains(".spec.") || name.contains(".stories.")
}

/// Whether a path lies under a test directory.
pub fn in_test_dir(path: &Path) -> bool {
    path.components().any(|c| {
        let s = c.as_os_str().to_string_lossy();
        TEST_DIRS.contains(&s.as_ref())
    })
}

/// File name up to the first dot (`Button.test.tsx` -> `Button`).
pub fn base_name(path: &Path) -> String {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    name.split('.').next().unwrap_or(name).to_string()
}

/// File stem (`api.types.ts` -> `api.types`).
pub fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Path relative to `base`, with forward slashes.
pub fn relative(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .map(|p| p.to_string_lossy().replace('\\', "/"))
        .unwrap_or_else(|_| path.to_string_lossy().to_string())
}

/// Read a file as text, logging and returning None on failure.
pub fn read_text(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(s) => Some(s),
        Err(e) => {
            tracing::warn!(file = %path.display(), error = %e, "cannot read file");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let p = root.join(rel);
        std::fs::create_dir_all(p.parent().unwrap()).unwrap();
        std::fs::write(p, "").unwrap();
    }

    #[test]
    fn test_component_walk() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(root, "Button.tsx");
        touch(root, "forms/Input.jsx");
        touch(root, "Button.test.tsx");
        touch(root, "__tests__/Card.tsx");
        touch(root, "node_modules/pkg/Thing.tsx");
        touch(root, "util.ts");

        let files: Vec<String> = Walk::components()
            .collect(root)
            .iter()
            .map(|p| relative(p, root))
            .collect();
        assert_eq!(files, vec!["Button.tsx", "forms/Input.jsx"]);
    }

    #[test]
    fn test_missing_root() {
        assert!(Walk::sources().collect(Path::new("/definitely/not/here")).is_empty());
    }

    #[test]
    fn test_names() {
        assert_eq!(base_name(Path::new("src/Button.test.tsx")), "Button");
        assert_eq!(stem(Path::new("src/api.types.ts")), "api.types");
        assert!(is_test_file(Path::new("a/b.spec.ts")));
        assert!(!is_test_file(Path::new("a/b.ts")));
        assert!(in_test_dir(Path::new("src/__tests__/b.ts")));
    }
}
