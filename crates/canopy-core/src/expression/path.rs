//! Key paths into the three parts of a data scope.
//!
//! ```text
//! data                    the whole payload
//! data.items[0].name      dot keys and bracket indexes
//! data["display name"]    quoted keys
//! url.category            a deep-link parameter
//! user.profile.city       a user info entry, then into it
//! ```

use serde_json::{Number, Value};

use crate::scope::DataScope;

/// Which part of the scope a path starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRoot {
    /// `scope.data`
    Data,
    /// `scope.url_parameters`
    Url,
    /// `scope.user_info`
    User,
}

/// One step of a key path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Object member
    Key(String),
    /// Array element
    Index(usize),
}

/// A parsed key path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    /// Scope part the path starts from
    pub root: PathRoot,
    /// Steps below the root
    pub segments: Vec<Segment>,
}

impl KeyPath {
    /// Parse a key path; `None` when the syntax is invalid or the root unknown
    pub fn parse(input: &str) -> Option<Self> {
        let mut parser = PathParser { chars: input.trim().chars().collect(), pos: 0 };

        let root = match parser.identifier()?.as_str() {
            "data" => PathRoot::Data,
            "url" => PathRoot::Url,
            "user" => PathRoot::User,
            _ => return None,
        };

        let mut segments = Vec::new();
        while let Some(c) = parser.peek() {
            match c {
                '.' => {
                    parser.pos += 1;
                    segments.push(Segment::Key(parser.identifier()?));
                }
                '[' => {
                    parser.pos += 1;
                    segments.push(parser.bracket()?);
                }
                _ => return None,
            }
        }

        Some(KeyPath { root, segments })
    }

    /// Look the path up in a scope. Missing keys, out-of-range indexes and
    /// stepping into a scalar all yield `None`.
    pub fn lookup(&self, scope: &DataScope) -> Option<Value> {
        match self.root {
            PathRoot::Data => walk(&scope.data, &self.segments).cloned(),
            PathRoot::Url => match self.segments.as_slice() {
                [Segment::Key(name)] => scope
                    .url_parameters
                    .get(name)
                    .map(|v| Value::String(v.clone())),
                _ => None,
            },
            PathRoot::User => match self.segments.split_first() {
                Some((Segment::Key(name), rest)) => {
                    scope.user_info.get(name).and_then(|v| walk(v, rest)).cloned()
                }
                _ => None,
            },
        }
    }
}

fn walk<'a>(mut current: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    for segment in segments {
        current = match (segment, current) {
            (Segment::Key(key), Value::Object(map)) => map.get(key)?,
            (Segment::Index(i), Value::Array(items)) => items.get(*i)?,
            _ => return None,
        };
    }
    Some(current)
}

struct PathParser {
    chars: Vec<char>,
    pos: usize,
}

impl PathParser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn identifier(&mut self) -> Option<String> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '.' || c == '[' || c == ']' || c == '"' || c == '\'' || c.is_whitespace() {
                break;
            }
            self.pos += 1;
        }
        if self.pos == start {
            return None;
        }
        Some(self.chars[start..self.pos].iter().collect())
    }

    /// Parse the inside of `[...]`, consuming the closing bracket
    fn bracket(&mut self) -> Option<Segment> {
        let segment = match self.peek()? {
            quote @ ('"' | '\'') => {
                self.pos += 1;
                let start = self.pos;
                while self.peek()? != quote {
                    self.pos += 1;
                }
                let key: String = self.chars[start..self.pos].iter().collect();
                self.pos += 1;
                Segment::Key(key)
            }
            _ => {
                let start = self.pos;
                while self.peek()?.is_ascii_digit() {
                    self.pos += 1;
                }
                let digits: String = self.chars[start..self.pos].iter().collect();
                Segment::Index(digits.parse().ok()?)
            }
        };

        if self.peek()? != ']' {
            return None;
        }
        self.pos += 1;
        Some(segment)
    }
}

/// Canonical string form of a scalar value.
///
/// Strings render verbatim, integral numbers without a fraction, other
/// numbers in shortest round-trip form, booleans as `true`/`false`. Null,
/// arrays and objects have no string form.
pub fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(render_number(n)),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn render_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}
