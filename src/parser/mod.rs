//! Tree-sitter based parsing of TypeScript/JavaScript sources into facts.
//!
//! The analyzers only need a handful of facts per file: what it exports,
//! which type declarations it contains, what it imports and which JSX
//! elements it renders. Everything is extracted in one parse.

mod typescript;

pub use typescript::{parse_jsx, parse_source, SourceKind};

/// Holds a parsed tree-sitter tree and the source it came from.
pub struct ParsedFile {
    /// The tree-sitter parse tree.
    pub tree: tree_sitter::Tree,
    /// The original source code (kept for node text extraction).
    pub source: Vec<u8>,
}

impl ParsedFile {
    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: tree_sitter::Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }
}

/// One `import` statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDecl {
    /// Module specifier without quotes.
    pub source: String,
    /// Local bindings introduced by the statement.
    pub names: Vec<String>,
    /// Byte range of the whole statement.
    pub start_byte: usize,
    pub end_byte: usize,
}

/// One `name` or `name=value` attribute. Spread attributes are not recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsxAttribute {
    pub name: String,
    /// String literals without quotes; any other expression verbatim, braces included.
    pub value: Option<String>,
}

/// One JSX element, from its opening or self-closing tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsxElement {
    /// Tag name as written (`input`, `Route`, `motion.div`).
    pub tag: String,
    pub attributes: Vec<JsxAttribute>,
    pub self_closing: bool,
    /// Text or an expression somewhere between the opening and closing tags.
    pub has_content: bool,
}

impl JsxElement {
    pub fn has_attr(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a.name == name)
    }

    pub fn attr_value(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .and_then(|a| a.value.as_deref())
    }
}

/// Facts extracted from one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceFacts {
    /// Top-level exported identifiers, in source order.
    pub exports: Vec<String>,
    /// Names of interface and type alias declarations.
    pub type_declarations: Vec<String>,
    pub imports: Vec<ImportDecl>,
    /// JSX elements in document order, including those nested in attributes.
    pub jsx: Vec<JsxElement>,
}

impl SourceFacts {
    /// First exported identifier starting with an uppercase letter.
    pub fn primary_component(&self) -> Option<&str> {
        self.exports
            .iter()
            .map(String::as_str)
            .find(|name| name.chars().next().is_some_and(|c| c.is_ascii_uppercase()))
    }

    /// Whether any type declaration name ends with `suffix`.
    pub fn has_type_with_suffix(&self, suffix: &str) -> bool {
        self.type_declarations.iter().any(|t| t.ends_with(suffix))
    }
}
