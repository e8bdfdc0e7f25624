//! Import specifier extraction for JavaScript/TypeScript sources.
//!
//! Regex based, run after comments are stripped, so it also works for
//! config files the tree-sitter grammar may not handle (`.cjs`, `.mjs`).

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;

/// Node.js built-in modules, never expected in a manifest.
pub const NODE_BUILTINS: &[&str] = &[
    "assert", "async_hooks", "buffer", "child_process", "cluster", "console", "constants",
    "crypto", "dgram", "diagnostics_channel", "dns", "domain", "events", "fs", "http", "http2",
    "https", "inspector", "module", "net", "os", "path", "perf_hooks", "process", "punycode",
    "querystring", "readline", "repl", "stream", "string_decoder", "sys", "timers", "tls",
    "trace_events", "tty", "url", "util", "v8", "vm", "wasi", "worker_threads", "zlib",
];

/// Import prefixes that point back into the project.
pub const ALIAS_PREFIXES: &[&str] = &["@/", "~/", "#/", "src/"];

lazy_static! {
    static ref BLOCK_COMMENT_RE: Regex = Regex::new(r"(?s)/\*.*?\*/").unwrap();
    // Line comments not preceded by ':' (keeps "https://...") or a quote
    static ref LINE_COMMENT_RE: Regex = Regex::new(r#"(?m)(^|[^:"'\\])//.*$"#).unwrap();
    // import x from 'pkg', import { a } from "pkg", import 'pkg', export * from 'pkg'
    static ref STATIC_RE: Regex =
        Regex::new(r#"\b(?:import|export)\s+(?:[\w*{}\s,$]+?\s+from\s+)?["']([^"'\n]+)["']"#)
            .unwrap();
    static ref DYNAMIC_RE: Regex = Regex::new(r#"\bimport\s*\(\s*["']([^"'\n]+)["']\s*\)"#).unwrap();
    static ref REQUIRE_RE: Regex =
        Regex::new(r#"\brequire\s*\(\s*["']([^"'\n]+)["']\s*\)"#).unwrap();
}

/// Remove block and line comments.
pub fn strip_comments(content: &str) -> String {
    let without_blocks = BLOCK_COMMENT_RE.replace_all(content, "");
    LINE_COMMENT_RE
        .replace_all(&without_blocks, "$1")
        .into_owned()
}

/// Every import, dynamic import and require specifier in `content`.
pub fn extract_specifiers(content: &str) -> Vec<String> {
    let stripped = strip_comments(content);
    let mut specifiers = Vec::new();
    for re in [&*STATIC_RE, &*DYNAMIC_RE, &*REQUIRE_RE] {
        for caps in re.captures_iter(&stripped) {
            if let Some(m) = caps.get(1) {
                specifiers.push(m.as_str().to_string());
            }
        }
    }
    specifiers
}

/// Package names imported by `content`, relative and aliased paths removed.
pub fn extract_packages(content: &str) -> BTreeSet<String> {
    extract_specifiers(content)
        .iter()
        .filter_map(|s| package_name(s))
        .collect()
}

/// Normalise a specifier to its package name.
///
/// For scoped packages (`@org/pkg/sub`) returns `@org/pkg`; for regular
/// packages (`pkg/sub`) returns `pkg`. Relative and aliased paths give None.
pub fn package_name(specifier: &str) -> Option<String> {
    if specifier.starts_with('.') || specifier.starts_with('/') {
        return None;
    }
    if ALIAS_PREFIXES.iter().any(|p| specifier.starts_with(p)) {
        return None;
    }
    if let Some(rest) = specifier.strip_prefix("node:") {
        return Some(rest.split('/').next().unwrap_or(rest).to_string());
    }
    if specifier.contains(':') {
        // virtual:, data:, https: and similar loaders
        return None;
    }

    if specifier.starts_with('@') {
        let parts: Vec<&str> = specifier.splitn(3, '/').collect();
        if parts.len() >= 2 && !parts[1].is_empty() {
            Some(format!("{}/{}", parts[0], parts[1]))
        } else {
            None
        }
    } else {
        specifier.split('/').next().map(str::to_string)
    }
}

/// Whether a package name is a Node.js built-in.
pub fn is_builtin(name: &str) -> bool {
    let name = name.strip_prefix("node:").unwrap_or(name);
    NODE_BUILTINS.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_name() {
        assert_eq!(package_name("react"), Some("react".to_string()));
        assert_eq!(package_name("react-dom/client"), Some("react-dom".to_string()));
        assert_eq!(
            package_name("@tanstack/react-query/devtools"),
            Some("@tanstack/react-query".to_string())
        );
        assert_eq!(package_name("./Button"), None);
        assert_eq!(package_name("../lib/utils"), None);
        assert_eq!(package_name("@/components/ui/button"), None);
        assert_eq!(package_name("node:fs"), Some("fs".to_string()));
        assert_eq!(package_name("virtual:pwa-register"), None);
    }

    #[test]
    fn test_extract_packages() {
        let src = r#"
import React, { useState } from "react";
import {
  Card,
  CardContent,
} from "@/components/ui/card";
import type { User } from '../types';
import "./index.css";
export * from "zod";
const mod = await import("lodash/debounce");
const fs = require('node:fs');
// import ignored from "commented-out";
/* require("also-ignored") */
const url = "https://example.org"; import x from "after-url";
"#;
        let packages: Vec<String> = extract_packages(src).into_iter().collect();
        assert_eq!(packages, vec!["after-url", "fs", "lodash", "react", "zod"]);
    }

    #[test]
    fn test_builtins() {
        assert!(is_builtin("fs"));
        assert!(is_builtin("node:path"));
        assert!(!is_builtin("express"));
    }
}
