//! Expression resolution.
//!
//! Templates embed `{{ ... }}` markers. A marker holds a key path, optionally
//! preceded by a helper:
//!
//! ```text
//! "Hello {{user.name}}"                -> "Hello Ada"
//! "{{ uppercase data.title }}"         -> "SPRING SALE"
//! "https://api.test/{{url.category}}"  -> "https://api.test/shoes"
//! ```
//!
//! Resolution is all-or-nothing: if any marker fails, the whole template is
//! absent. It never performs I/O.

mod path;

pub use path::{render_value, KeyPath, PathRoot, Segment};

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::scope::DataScope;

lazy_static! {
    // Non-greedy so adjacent markers stay separate
    static ref MARKER_REGEX: Regex = Regex::new(r"\{\{(.*?)\}\}").unwrap();
}

/// Transformations available inside a marker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Helper {
    /// Lowercase the rendered value
    Lowercase,
    /// Uppercase the rendered value
    Uppercase,
    /// Uppercase the first character of the rendered value
    Capitalize,
}

impl Helper {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "lowercase" => Some(Helper::Lowercase),
            "uppercase" => Some(Helper::Uppercase),
            "capitalize" => Some(Helper::Capitalize),
            _ => None,
        }
    }

    fn apply(&self, input: String) -> String {
        match self {
            Helper::Lowercase => input.to_lowercase(),
            Helper::Uppercase => input.to_uppercase(),
            Helper::Capitalize => {
                let mut chars = input.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => input,
                }
            }
        }
    }
}

/// Whether a template contains at least one expression marker
pub fn has_markers(template: &str) -> bool {
    MARKER_REGEX.is_match(template)
}

/// Resolve every marker of a template against a scope.
///
/// Returns `None` if any marker does not resolve; a template without
/// markers is returned unchanged.
pub fn resolve(template: &str, scope: &DataScope) -> Option<String> {
    if !template.contains("{{") {
        return Some(template.to_string());
    }

    let mut output = String::with_capacity(template.len());
    let mut last = 0;

    for captures in MARKER_REGEX.captures_iter(template) {
        let marker = captures.get(0)?;
        let expression = captures.get(1)?.as_str();

        output.push_str(&template[last..marker.start()]);
        output.push_str(&evaluate_marker(expression, scope)?);
        last = marker.end();
    }

    output.push_str(&template[last..]);
    Some(output)
}

/// Evaluate a bare key path (no braces) to a structured value
pub fn resolve_value(path: &str, scope: &DataScope) -> Option<Value> {
    KeyPath::parse(path)?.lookup(scope)
}

fn evaluate_marker(expression: &str, scope: &DataScope) -> Option<String> {
    let tokens = tokenize(expression)?;

    match tokens.as_slice() {
        [path] => render_value(&resolve_value(path, scope)?),
        [helper, path] => {
            let helper = Helper::from_name(helper)?;
            let rendered = render_value(&resolve_value(path, scope)?)?;
            Some(helper.apply(rendered))
        }
        _ => None,
    }
}

/// Split a marker body on whitespace that is outside quotes.
/// `None` on an unterminated quote.
fn tokenize(expression: &str) -> Option<Vec<String>> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for c in expression.chars() {
        match quote {
            Some(q) => {
                current.push(c);
                if c == q {
                    quote = None;
                }
            }
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                current.push(c);
            }
            None if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(c),
        }
    }

    if quote.is_some() {
        return None;
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Some(tokens)
}
