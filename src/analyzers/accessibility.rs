//! JSX accessibility heuristics.
//!
//! Works on the JSX elements the parser extracts from a component. The
//! result is a set of counts that the component analyzer turns into a score
//! and the quality analyzer turns into a yes/no per file.

use std::collections::HashSet;

use crate::parser::{self, JsxElement};

/// Score deductions and bonuses.
pub mod points {
    pub const UNLABELLED_CONTROL: f64 = 35.0;
    pub const MISSING_ALT: f64 = 20.0;
    pub const CLICK_WITHOUT_KEYBOARD: f64 = 15.0;
    pub const HIDDEN_CONTROL: f64 = 40.0;
    pub const HEADING_BONUS: f64 = 2.0;
    pub const HEADING_BONUS_CAP: f64 = 10.0;
    pub const LABEL_BONUS: f64 = 2.0;
    pub const LABEL_BONUS_CAP: f64 = 10.0;
}

/// Elements that need an accessible name.
const CONTROL_TAGS: &[&str] = &["button", "input", "select", "textarea"];

/// Controls a `<label htmlFor>` can point at.
const FIELD_TAGS: &[&str] = &["input", "select", "textarea"];

/// Non-interactive elements that should not carry a bare click handler.
const CLICKABLE_TAGS: &[&str] = &["div", "span", "li", "p", "section", "article", "td", "tr", "img"];

const HEADING_TAGS: &[&str] = &["h1", "h2", "h3", "h4", "h5", "h6"];

const KEY_HANDLERS: &[&str] = &["onKeyDown", "onKeyUp", "onKeyPress"];

/// Counts of accessibility findings in one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Findings {
    pub unlabelled_controls: usize,
    pub images_without_alt: usize,
    pub clicks_without_keyboard: usize,
    pub hidden_controls: usize,
    pub headings: usize,
    pub labelled_fields: usize,
}

impl Findings {
    /// Number of anti-pattern occurrences.
    pub fn issue_count(&self) -> usize {
        self.unlabelled_controls
            + self.images_without_alt
            + self.clicks_without_keyboard
            + self.hidden_controls
    }

    /// Heuristic score in [0, 100].
    pub fn score(&self) -> f64 {
        let mut score = 100.0;
        score -= self.unlabelled_controls as f64 * points::UNLABELLED_CONTROL;
        score -= self.images_without_alt as f64 * points::MISSING_ALT;
        score -= self.clicks_without_keyboard as f64 * points::CLICK_WITHOUT_KEYBOARD;
        score -= self.hidden_controls as f64 * points::HIDDEN_CONTROL;
        score += (self.headings as f64 * points::HEADING_BONUS).min(points::HEADING_BONUS_CAP);
        score += (self.labelled_fields as f64 * points::LABEL_BONUS).min(points::LABEL_BONUS_CAP);
        score.clamp(0.0, 100.0)
    }

    /// Human-readable list of the problems found.
    pub fn describe(&self) -> Vec<String> {
        let mut out = Vec::new();
        if self.unlabelled_controls > 0 {
            out.push(format!("{} unlabelled interactive element(s)", self.unlabelled_controls));
        }
        if self.images_without_alt > 0 {
            out.push(format!("{} image(s) without alt text", self.images_without_alt));
        }
        if self.clicks_without_keyboard > 0 {
            out.push(format!(
                "{} click handler(s) on non-interactive elements without role or keyboard support",
                self.clicks_without_keyboard
            ));
        }
        if self.hidden_controls > 0 {
            out.push(format!(
                "{} interactive element(s) hidden from assistive technology",
                self.hidden_controls
            ));
        }
        out
    }
}

/// Parse component source and scan it.
pub fn scan(source: &str) -> Findings {
    match parser::parse_jsx(source.as_bytes()) {
        Ok(elements) => assess(&elements),
        Err(e) => {
            tracing::warn!(error = %e, "cannot parse JSX for accessibility scan");
            Findings::default()
        }
    }
}

/// Scan already extracted JSX elements.
pub fn assess(elements: &[JsxElement]) -> Findings {
    let mut findings = Findings::default();

    let field_ids: HashSet<&str> = elements
        .iter()
        .filter(|e| FIELD_TAGS.contains(&e.tag.as_str()))
        .filter_map(|e| e.attr_value("id"))
        .collect();

    for element in elements {
        let tag = element.tag.as_str();

        if CONTROL_TAGS.contains(&tag) {
            if is_hidden(element) {
                findings.hidden_controls += 1;
            }
            let labelled = element.has_attr("aria-label")
                || element.has_attr("aria-labelledby")
                || if tag == "button" {
                    element.has_content
                } else {
                    element.has_attr("id")
                };
            if !labelled {
                findings.unlabelled_controls += 1;
            }
        }

        if tag == "img" && !element.has_attr("alt") {
            findings.images_without_alt += 1;
        }

        if CLICKABLE_TAGS.contains(&tag)
            && element.has_attr("onClick")
            && !element.has_attr("role")
            && !KEY_HANDLERS.iter().any(|h| element.has_attr(h))
        {
            findings.clicks_without_keyboard += 1;
        }

        if HEADING_TAGS.contains(&tag) {
            findings.headings += 1;
        }

        if tag == "label"
            && element
                .attr_value("htmlFor")
                .is_some_and(|target| field_ids.contains(target))
        {
            findings.labelled_fields += 1;
        }
    }

    findings
}

/// `aria-hidden="true"` or `aria-hidden={true}`.
fn is_hidden(element: &JsxElement) -> bool {
    element.attr_value("aria-hidden").is_some_and(|v| {
        v.trim_start_matches('{').trim_end_matches('}').trim() == "true"
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Wrap JSX in a component so it parses as a whole file.
    fn view(body: &str) -> Findings {
        scan(&format!(
            "export function View() {{\n  return (\n    <>\n{}\n    </>\n  );\n}}\n",
            body
        ))
    }

    #[test]
    fn test_accessible_button() {
        let f = view(r#"<button onClick={save}>Save</button>"#);
        assert_eq!(f.issue_count(), 0);
        assert_eq!(f.score(), 100.0);
    }

    #[test]
    fn test_icon_button_needs_label() {
        let f = view(r#"<button onClick={close}><XIcon /></button>"#);
        assert_eq!(f.unlabelled_controls, 1);
        let labelled = view(r#"<button aria-label="Close" onClick={close}><XIcon /></button>"#);
        assert_eq!(labelled.unlabelled_controls, 0);
        let nested_text = view(r#"<button><span>Close</span></button>"#);
        assert_eq!(nested_text.unlabelled_controls, 0);
    }

    #[test]
    fn test_bare_input() {
        let f = view("<input />");
        assert_eq!(f.unlabelled_controls, 1);
        assert!(f.score() < 70.0);
        let with_id = view(r#"<label htmlFor="email">Email</label><input id="email" />"#);
        assert_eq!(with_id.unlabelled_controls, 0);
        assert_eq!(with_id.labelled_fields, 1);
    }

    #[test]
    fn test_deeply_nested_handlers_are_scanned() {
        let input = view(
            r#"<input onChange={(e) => { setForm({ ...form, name: e.target.value }); }} />"#,
        );
        assert_eq!(input.unlabelled_controls, 1);
        assert!(input.score() < 100.0);

        let div = view(r#"<div onClick={() => { track({ id }); }}>Go</div>"#);
        assert_eq!(div.clicks_without_keyboard, 1);

        let quoted = view(r#"<input placeholder="a > b" />"#);
        assert_eq!(quoted.unlabelled_controls, 1);
    }

    #[test]
    fn test_only_matched_labels_earn_bonus() {
        let dangling = view(r#"<label htmlFor="nowhere">X</label><button>Go</button>"#);
        assert_eq!(dangling.labelled_fields, 0);

        let mixed = view(
            r#"<label htmlFor="nowhere">X</label>
<label htmlFor="name">Name</label>
<input id="name" />"#,
        );
        assert_eq!(mixed.labelled_fields, 1);
        assert_eq!(mixed.score(), 100.0);
    }

    #[test]
    fn test_images_and_clicks() {
        let f = view(
            r#"
<img src="a.png" />
<img src="b.png" alt="" />
<div onClick={go}>Go</div>
<div role="button" onClick={go}>Go</div>
<span onClick={go} onKeyDown={key}>Go</span>
"#,
        );
        assert_eq!(f.images_without_alt, 1);
        assert_eq!(f.clicks_without_keyboard, 1);
        assert_eq!(f.score(), 100.0 - 20.0 - 15.0);
    }

    #[test]
    fn test_hidden_control() {
        let f = view(r#"<button aria-hidden="true">Menu</button>"#);
        assert_eq!(f.hidden_controls, 1);
        assert_eq!(f.score(), 60.0);
        let expr = view(r#"<button aria-hidden={true}>Menu</button>"#);
        assert_eq!(expr.hidden_controls, 1);
    }

    #[test]
    fn test_bonuses_capped() {
        let f = view("<h1>a</h1><h2>b</h2><h2>c</h2><h3>d</h3><h3>e</h3><h4>f</h4><img />");
        assert_eq!(f.headings, 6);
        assert_eq!(f.score(), 90.0);
    }

    #[test]
    fn test_scoring_is_idempotent() {
        let src = r#"<div onClick={x}><img src="y" /><input /></div>"#;
        assert_eq!(view(src).score(), view(src).score());
        assert_eq!(view(src), view(src));
    }
}
