//! Reference parser for `$name`, `[[name:fmt]]` and `${name.path:fmt}` syntax
//!
//! All three syntaxes are matched by one regex in a single pass. The capture slot
//! that matched decides which syntax was used, and slots are always consulted in
//! the fixed order `$name`, `[[name]]`, `${name}`.

use std::ops::Range;
use std::sync::LazyLock;

use regex::{Captures, Regex};

/// The reference pattern. Capture slots:
/// 1 `$name`; 2 `[[name`, 3 `:fmt]]`; 4 `${name`, 5 `.fieldPath`, 6 `:fmt}`.
#[allow(clippy::expect_used)]
pub static VARIABLE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(\w+)|\[\[(\w+?)(?::(\w+))?\]\]|\$\{(\w+)(?:\.([^:^\}]+))?(?::([^\}]+))?\}")
        .expect("valid regex")
});

/// Which syntax a reference was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceSyntax {
    /// `$name`
    Dollar,
    /// `[[name]]` or `[[name:fmt]]`
    Brackets,
    /// `${name}`, `${name:fmt}` or `${name.path:fmt}`
    Braces,
}

/// One reference found in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableReference {
    /// Referenced variable name.
    pub name: String,

    /// Dotted field path, `${name.path}` only.
    pub field_path: Option<String>,

    /// Inline format, including its `:`-separated arguments.
    pub format: Option<String>,

    /// Syntax used.
    pub syntax: ReferenceSyntax,

    /// Byte range of the whole reference.
    pub span: Range<usize>,
}

impl VariableReference {
    fn from_captures(caps: &Captures<'_>) -> Option<Self> {
        let whole = caps.get(0)?;
        let text = |i: usize| caps.get(i).map(|m| m.as_str().to_string());
        let (name, field_path, format, syntax) = if let Some(name) = text(1) {
            (name, None, None, ReferenceSyntax::Dollar)
        } else if let Some(name) = text(2) {
            (name, None, text(3), ReferenceSyntax::Brackets)
        } else {
            (text(4)?, text(5), text(6), ReferenceSyntax::Braces)
        };
        Some(Self {
            name,
            field_path,
            format,
            syntax,
            span: whole.range(),
        })
    }
}

/// Parses every reference in `input`, left to right.
#[must_use]
pub fn parse_references(input: &str) -> Vec<VariableReference> {
    VARIABLE_REGEX
        .captures_iter(input)
        .filter_map(|caps| VariableReference::from_captures(&caps))
        .collect()
}

/// Returns the name of the first reference in `expression`.
#[must_use]
pub fn get_variable_name(expression: &str) -> Option<String> {
    VARIABLE_REGEX
        .captures(expression)
        .and_then(|caps| VariableReference::from_captures(&caps))
        .map(|r| r.name)
}

/// Returns true if any of `parts` references `name`.
///
/// This is a purely textual test; the parts are joined with spaces and scanned.
#[must_use]
pub fn contains_variable(parts: &[&str], name: &str) -> bool {
    let joined = parts.join(" ");
    parse_references(&joined).iter().any(|r| r.name == name)
}

/// Returns true if `input` contains at least one reference.
#[must_use]
pub fn has_references(input: &str) -> bool {
    VARIABLE_REGEX.is_match(input)
}

/// Extracts the referenced names, in order of appearance.
#[must_use]
pub fn extract_variable_names(input: &str) -> Vec<String> {
    parse_references(input).into_iter().map(|r| r.name).collect()
}
