//! TypeScript/TSX fact extraction using tree-sitter.

use std::path::Path;

use anyhow::Context;
use once_cell::sync::OnceCell;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor};

use super::{ImportDecl, JsxAttribute, JsxElement, ParsedFile, SourceFacts};

/// Tree-sitter query for type declarations.
const TYPE_DECLARATION_QUERY: &str = r#"
(interface_declaration
  name: (type_identifier) @type_name
)

(type_alias_declaration
  name: (type_identifier) @type_name
)
"#;

// Compiled once per grammar.
static TYPESCRIPT_TYPE_QUERY: OnceCell<Query> = OnceCell::new();
static TSX_TYPE_QUERY: OnceCell<Query> = OnceCell::new();

/// Which grammar a file needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Plain TypeScript (`.ts`, `.mts`, `.cts`): angle-bracket casts, no JSX.
    TypeScript,
    /// Anything that may contain JSX (`.tsx`, `.jsx`, `.js`).
    Tsx,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("ts") | Some("mts") | Some("cts") => SourceKind::TypeScript,
            _ => SourceKind::Tsx,
        }
    }

    fn language(&self) -> Language {
        match self {
            SourceKind::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            SourceKind::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    fn type_query(&self) -> anyhow::Result<&'static Query> {
        let cell = match self {
            SourceKind::TypeScript => &TYPESCRIPT_TYPE_QUERY,
            SourceKind::Tsx => &TSX_TYPE_QUERY,
        };
        let query = cell.get_or_try_init(|| Query::new(&self.language(), TYPE_DECLARATION_QUERY))?;
        Ok(query)
    }
}

/// Parse a source file and extract its facts.
pub fn parse_source(path: &Path, source: &[u8]) -> anyhow::Result<SourceFacts> {
    let kind = SourceKind::from_path(path);
    let parsed = parse(&kind.language(), source)
        .with_context(|| format!("failed to parse {}", path.display()))?;

    Ok(SourceFacts {
        exports: extract_exports(&parsed),
        type_declarations: extract_type_declarations(kind.type_query()?, &parsed),
        imports: extract_imports(&parsed),
        jsx: extract_jsx(&parsed),
    })
}

/// Parse TSX source and return only its JSX elements.
pub fn parse_jsx(source: &[u8]) -> anyhow::Result<Vec<JsxElement>> {
    let parsed = parse(&SourceKind::Tsx.language(), source)?;
    Ok(extract_jsx(&parsed))
}

fn parse(language: &Language, source: &[u8]) -> anyhow::Result<ParsedFile> {
    let mut parser = Parser::new();
    parser.set_language(language)?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| anyhow::anyhow!("tree-sitter produced no tree"))?;
    Ok(ParsedFile {
        tree,
        source: source.to_vec(),
    })
}

fn extract_type_declarations(query: &Query, parsed: &ParsedFile) -> Vec<String> {
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(query, parsed.tree.root_node(), &parsed.source[..]);

    let mut names = Vec::new();
    while let Some(m) = matches.next() {
        for capture in m.captures {
            let name = parsed.node_text(capture.node);
            if !name.is_empty() {
                names.push(name.to_string());
            }
        }
    }
    names
}

/// Collect names exported from the top level of the program.
fn extract_exports(parsed: &ParsedFile) -> Vec<String> {
    let root = parsed.tree.root_node();
    let mut exports = Vec::new();
    let mut cursor = root.walk();

    for stmt in root.named_children(&mut cursor) {
        if stmt.kind() != "export_statement" {
            continue;
        }

        if let Some(decl) = stmt.child_by_field_name("declaration") {
            declaration_names(parsed, decl, &mut exports);
            continue;
        }

        // export default Foo;
        if let Some(value) = stmt.child_by_field_name("value") {
            if value.kind() == "identifier" {
                exports.push(parsed.node_text(value).to_string());
            }
            continue;
        }

        // export { Foo, Bar as Baz }
        let mut inner = stmt.walk();
        for child in stmt.named_children(&mut inner) {
            if child.kind() != "export_clause" {
                continue;
            }
            let mut spec_cursor = child.walk();
            for spec in child.named_children(&mut spec_cursor) {
                if spec.kind() != "export_specifier" {
                    continue;
                }
                let alias = spec
                    .child_by_field_name("alias")
                    .map(|n| parsed.node_text(n))
                    .filter(|a| *a != "default");
                let name = alias.or_else(|| spec.child_by_field_name("name").map(|n| parsed.node_text(n)));
                if let Some(name) = name {
                    exports.push(name.to_string());
                }
            }
        }
    }

    exports
}

fn declaration_names(parsed: &ParsedFile, decl: Node, out: &mut Vec<String>) {
    match decl.kind() {
        "lexical_declaration" | "variable_declaration" => {
            let mut cursor = decl.walk();
            for declarator in decl.named_children(&mut cursor) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                if let Some(name) = declarator.child_by_field_name("name") {
                    if name.kind() == "identifier" {
                        out.push(parsed.node_text(name).to_string());
                    }
                }
            }
        }
        _ => {
            if let Some(name) = decl.child_by_field_name("name") {
                out.push(parsed.node_text(name).to_string());
            }
        }
    }
}

fn extract_imports(parsed: &ParsedFile) -> Vec<ImportDecl> {
    let root = parsed.tree.root_node();
    let mut imports = Vec::new();
    let mut cursor = root.walk();

    for stmt in root.named_children(&mut cursor) {
        if stmt.kind() != "import_statement" {
            continue;
        }
        let Some(source_node) = stmt.child_by_field_name("source") else {
            continue;
        };
        let source = strip_quotes(parsed.node_text(source_node));

        let mut names = Vec::new();
        let mut inner = stmt.walk();
        for child in stmt.named_children(&mut inner) {
            if child.kind() == "import_clause" {
                clause_bindings(parsed, child, &mut names);
            }
        }

        imports.push(ImportDecl {
            source,
            names,
            start_byte: stmt.start_byte(),
            end_byte: stmt.end_byte(),
        });
    }

    imports
}

/// Local bindings of an import clause: default, namespace and named imports.
fn clause_bindings(parsed: &ParsedFile, clause: Node, out: &mut Vec<String>) {
    let mut cursor = clause.walk();
    for child in clause.named_children(&mut cursor) {
        match child.kind() {
            "identifier" => out.push(parsed.node_text(child).to_string()),
            "namespace_import" => {
                let mut ns = child.walk();
                for id in child.named_children(&mut ns) {
                    if id.kind() == "identifier" {
                        out.push(parsed.node_text(id).to_string());
                    }
                }
            }
            "named_imports" => {
                let mut named = child.walk();
                for spec in child.named_children(&mut named) {
                    if spec.kind() != "import_specifier" {
                        continue;
                    }
                    let local = spec
                        .child_by_field_name("alias")
                        .or_else(|| spec.child_by_field_name("name"));
                    if let Some(local) = local {
                        out.push(parsed.node_text(local).to_string());
                    }
                }
            }
            _ => {}
        }
    }
}

/// Every JSX element of the file in document order.
fn extract_jsx(parsed: &ParsedFile) -> Vec<JsxElement> {
    let mut elements = Vec::new();
    let mut cursor = parsed.tree.walk();
    loop {
        let node = cursor.node();
        let element = match node.kind() {
            "jsx_element" => opening_tag(node).and_then(|open| {
                jsx_tag(parsed, open, false).map(|mut el| {
                    el.has_content = has_content(parsed, node);
                    el
                })
            }),
            "jsx_self_closing_element" => jsx_tag(parsed, node, true),
            _ => None,
        };
        elements.extend(element);

        if cursor.goto_first_child() {
            continue;
        }
        loop {
            if cursor.goto_next_sibling() {
                break;
            }
            if !cursor.goto_parent() {
                return elements;
            }
        }
    }
}

fn opening_tag(element: Node) -> Option<Node> {
    let mut cursor = element.walk();
    let open = element
        .named_children(&mut cursor)
        .find(|c| c.kind() == "jsx_opening_element");
    open
}

/// Name and attributes of an opening or self-closing tag. Fragments have no name.
fn jsx_tag(parsed: &ParsedFile, tag: Node, self_closing: bool) -> Option<JsxElement> {
    let mut cursor = tag.walk();
    let mut name = tag.child_by_field_name("name").map(|n| parsed.node_text(n).to_string());
    let mut attributes = Vec::new();

    for child in tag.named_children(&mut cursor) {
        match child.kind() {
            "jsx_attribute" => attributes.extend(jsx_attribute(parsed, child)),
            "jsx_expression" | "comment" | "type_arguments" => {}
            _ if name.is_none() => name = Some(parsed.node_text(child).to_string()),
            _ => {}
        }
    }

    name.map(|tag| JsxElement {
        tag,
        attributes,
        self_closing,
        has_content: false,
    })
}

fn jsx_attribute(parsed: &ParsedFile, attribute: Node) -> Option<JsxAttribute> {
    let mut cursor = attribute.walk();
    let mut parts = attribute.named_children(&mut cursor);
    let name = parts.next()?;
    let value = parts.next().map(|v| attribute_value(parsed, v));
    Some(JsxAttribute {
        name: parsed.node_text(name).to_string(),
        value,
    })
}

/// `"x"` and `{"x"}` give `x`; other values are kept as written.
fn attribute_value(parsed: &ParsedFile, value: Node) -> String {
    match value.kind() {
        "string" => strip_quotes(parsed.node_text(value)),
        "jsx_expression" => {
            let mut cursor = value.walk();
            let inner: Vec<Node> = value.named_children(&mut cursor).collect();
            match inner.as_slice() {
                [only] if matches!(only.kind(), "string" | "template_string") => {
                    strip_quotes(parsed.node_text(*only))
                }
                _ => parsed.node_text(value).to_string(),
            }
        }
        _ => parsed.node_text(value).to_string(),
    }
}

/// Whether an element body holds non-blank text or a non-empty expression,
/// looking through nested elements.
fn has_content(parsed: &ParsedFile, element: Node) -> bool {
    let mut cursor = element.walk();
    let children: Vec<Node> = element.named_children(&mut cursor).collect();
    children.into_iter().any(|child| match child.kind() {
        "jsx_text" => !parsed.node_text(child).trim().is_empty(),
        "html_character_reference" => true,
        "jsx_expression" => {
            let mut inner = child.walk();
            let has_value = child
                .named_children(&mut inner)
                .any(|n| n.kind() != "comment");
            has_value
        }
        "jsx_element" => has_content(parsed, child),
        _ => false,
    })
}

fn strip_quotes(text: &str) -> String {
    text.trim_matches(|c| c == '"' || c == '\'' || c == '`').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn facts(name: &str, src: &str) -> SourceFacts {
        parse_source(Path::new(name), src.as_bytes()).unwrap()
    }

    #[test]
    fn test_exports_and_props() {
        let f = facts(
            "Button.tsx",
            r#"
import React from "react";
import { cn } from "@/lib/utils";

export interface ButtonProps {
  label: string;
}

const helper = 1;

export function Button({ label }: ButtonProps) {
  return <button className={cn("btn")}>{label}</button>;
}

export const buttonVariants = {};
"#,
        );
        assert_eq!(f.exports, vec!["ButtonProps", "Button", "buttonVariants"]);
        assert_eq!(f.primary_component(), Some("ButtonProps"));
        assert!(f.has_type_with_suffix("Props"));
        assert_eq!(f.imports.len(), 2);
        assert_eq!(f.imports[0].source, "react");
        assert_eq!(f.imports[0].names, vec!["React"]);
        assert_eq!(f.imports[1].names, vec!["cn"]);
    }

    #[test]
    fn test_export_clause_and_default() {
        let f = facts(
            "Card.jsx",
            r#"
function Card() { return <div />; }
function footer() { return null; }
export { footer, Card as Panel };
export default Card;
"#,
        );
        assert_eq!(f.exports, vec!["footer", "Panel", "Card"]);
        assert_eq!(f.primary_component(), Some("Panel"));
    }

    #[test]
    fn test_import_bindings() {
        let f = facts(
            "x.ts",
            r#"
import Default, { a, b as c } from "./mod";
import * as ns from "lib";
import "./side-effect.css";
type Local = string;
"#,
        );
        assert_eq!(f.imports[0].names, vec!["Default", "a", "c"]);
        assert_eq!(f.imports[1].names, vec!["ns"]);
        assert!(f.imports[2].names.is_empty());
        assert_eq!(f.imports[2].source, "./side-effect.css");
        assert_eq!(f.type_declarations, vec!["Local"]);
        assert!(f.exports.is_empty());
        assert_eq!(f.primary_component(), None);
    }

    #[test]
    fn test_jsx_elements() {
        let f = facts(
            "Form.tsx",
            r#"
export function Form() {
  return (
    <form>
      <label htmlFor="name">Name</label>
      <input id="name" onChange={(e) => { setForm({ ...form, name: e.target.value }); }} />
      <Route element={<Dashboard />} path={"/dash"} />
      <button disabled><Icon /></button>
      <button>{label}</button>
    </form>
  );
}
"#,
        );
        let tags: Vec<&str> = f.jsx.iter().map(|e| e.tag.as_str()).collect();
        assert_eq!(
            tags,
            vec!["form", "label", "input", "Route", "Dashboard", "button", "Icon", "button"]
        );
        assert_eq!(f.jsx[1].attr_value("htmlFor"), Some("name"));
        assert!(f.jsx[2].self_closing);
        assert_eq!(f.jsx[2].attr_value("id"), Some("name"));
        assert!(f.jsx[2].has_attr("onChange"));
        assert_eq!(f.jsx[3].attr_value("path"), Some("/dash"));
        assert!(f.jsx[5].has_attr("disabled"));
        assert_eq!(f.jsx[5].attr_value("disabled"), None);
        assert!(!f.jsx[5].has_content);
        assert!(f.jsx[7].has_content);
    }

    #[test]
    fn test_source_kind() {
        assert_eq!(SourceKind::from_path(Path::new("a.ts")), SourceKind::TypeScript);
        assert_eq!(SourceKind::from_path(Path::new("a.tsx")), SourceKind::Tsx);
        assert_eq!(SourceKind::from_path(Path::new("a.jsx")), SourceKind::Tsx);
    }
}
